//! Per-request access to the suspension registry.

use std::sync::Arc;
use std::time::Duration;

use meridian_core::{ResourceResponse, SuspendError, SuspensionRegistry};

/// Handle a resource method uses to park its request.
///
/// The dispatcher places one in the [`RequestContext`](meridian_core::RequestContext)
/// extensions when it was built with a suspension registry. Requests are
/// keyed by the matched template and a caller-chosen correlation id.
///
/// ```no_run
/// use meridian_core::{Arguments, HandlerResult, RequestContext, WebApplicationFault};
/// use meridian_pipeline::Suspender;
/// use std::sync::Arc;
///
/// struct Orders;
///
/// async fn await_shipment(_: Arc<Orders>, args: Arguments, ctx: Arc<RequestContext>) -> HandlerResult {
///     let id: String = args.value("id")?;
///     let suspender = ctx
///         .extension::<Suspender>()
///         .ok_or_else(WebApplicationFault::not_found)?;
///     Ok(suspender.suspend(&id).await?)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Suspender {
    registry: Arc<SuspensionRegistry>,
    timeout: Duration,
    route: String,
}

impl Suspender {
    pub(crate) fn new(registry: Arc<SuspensionRegistry>, timeout: Duration, route: String) -> Self {
        Self {
            registry,
            timeout,
            route,
        }
    }

    /// The route this request is parked under.
    #[must_use]
    pub fn route(&self) -> &str {
        &self.route
    }

    /// How long [`suspend`](Self::suspend) waits.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Parks this request until resumed.
    ///
    /// # Errors
    ///
    /// Returns [`SuspendError::AlreadySuspended`] if the correlation id is
    /// taken, and [`SuspendError::TimedOut`] (answered with `503`) if
    /// nobody resumes in time.
    pub async fn suspend(&self, correlation: &str) -> Result<ResourceResponse, SuspendError> {
        self.registry
            .suspend(&self.route, correlation, self.timeout)
            .await
    }

    /// Completes a request parked on `route`.
    ///
    /// # Errors
    ///
    /// Returns [`SuspendError::NotSuspended`] if nothing waits there.
    pub fn resume(
        &self,
        route: &str,
        correlation: &str,
        response: ResourceResponse,
    ) -> Result<(), SuspendError> {
        self.registry.resume(route, correlation, response)
    }
}
