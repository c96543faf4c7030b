//! Suspended requests.
//!
//! A resource method can park its request under a correlation id and wait
//! for another request (or any other task) to resume it with a response.
//! Waiting is bounded; a request that is not resumed in time is answered
//! with `503 Service Unavailable`.
//!
//! # Example
//!
//! ```
//! use meridian_core::{Entity, ResourceResponse, SuspensionRegistry};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # tokio_test::block_on(async {
//! let registry = Arc::new(SuspensionRegistry::new());
//!
//! let waiter = {
//!     let registry = Arc::clone(&registry);
//!     tokio::spawn(async move {
//!         registry.suspend("/orders", "42", Duration::from_secs(5)).await
//!     })
//! };
//! while !registry.is_suspended("/orders", "42") {
//!     tokio::task::yield_now().await;
//! }
//!
//! registry
//!     .resume("/orders", "42", ResourceResponse::ok(Entity::text("shipped")))
//!     .unwrap();
//! let response = waiter.await.unwrap().unwrap();
//! assert_eq!(response.entity(), Some(&Entity::text("shipped")));
//! # });
//! ```

use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use http::StatusCode;
use thiserror::Error;
use tokio::sync::oneshot;

use crate::fault::Fault;
use crate::response::ResourceResponse;

/// Route plus correlation id.
type SuspensionKey = (String, String);

/// Suspension failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SuspendError {
    /// A request is already parked under this key.
    #[error("request {correlation} on {route} is already suspended")]
    AlreadySuspended {
        /// The route.
        route: String,
        /// The correlation id.
        correlation: String,
    },
    /// Nothing is parked under this key.
    #[error("no suspended request {correlation} on {route}")]
    NotSuspended {
        /// The route.
        route: String,
        /// The correlation id.
        correlation: String,
    },
    /// The request was not resumed in time.
    #[error("request {correlation} on {route} timed out after {timeout:?}")]
    TimedOut {
        /// The route.
        route: String,
        /// The correlation id.
        correlation: String,
        /// How long it waited.
        timeout: Duration,
    },
}

impl Fault for SuspendError {
    fn response(&self) -> Option<ResourceResponse> {
        match self {
            Self::TimedOut { .. } => {
                Some(ResourceResponse::status(StatusCode::SERVICE_UNAVAILABLE))
            }
            Self::AlreadySuspended { .. } => Some(ResourceResponse::status(StatusCode::CONFLICT)),
            Self::NotSuspended { .. } => None,
        }
    }
}

/// Parked requests keyed by route and correlation id.
#[derive(Debug, Default)]
pub struct SuspensionRegistry {
    waiting: DashMap<SuspensionKey, oneshot::Sender<ResourceResponse>>,
}

impl SuspensionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parks until resumed or until `timeout` elapses.
    ///
    /// # Errors
    ///
    /// Returns [`SuspendError::AlreadySuspended`] if the key is taken, and
    /// [`SuspendError::TimedOut`] if nobody resumes in time.
    pub async fn suspend(
        &self,
        route: &str,
        correlation: &str,
        timeout: Duration,
    ) -> Result<ResourceResponse, SuspendError> {
        let key = (route.to_string(), correlation.to_string());
        let (tx, rx) = oneshot::channel();
        match self.waiting.entry(key.clone()) {
            Entry::Occupied(_) => {
                return Err(SuspendError::AlreadySuspended {
                    route: key.0,
                    correlation: key.1,
                })
            }
            Entry::Vacant(slot) => {
                slot.insert(tx);
            }
        }
        tracing::debug!(route, correlation, ?timeout, "request suspended");

        let outcome = tokio::time::timeout(timeout, rx).await;
        self.waiting.remove_if(&key, |_, sender| sender.is_closed());
        match outcome {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(_)) | Err(_) => {
                tracing::warn!(route, correlation, ?timeout, "suspended request timed out");
                Err(SuspendError::TimedOut {
                    route: key.0,
                    correlation: key.1,
                    timeout,
                })
            }
        }
    }

    /// Completes a parked request.
    ///
    /// # Errors
    ///
    /// Returns [`SuspendError::NotSuspended`] if nothing is parked under the
    /// key, or the waiter already gave up.
    pub fn resume(
        &self,
        route: &str,
        correlation: &str,
        response: ResourceResponse,
    ) -> Result<(), SuspendError> {
        let key = (route.to_string(), correlation.to_string());
        let not_suspended = || SuspendError::NotSuspended {
            route: route.to_string(),
            correlation: correlation.to_string(),
        };
        let (_, sender) = self.waiting.remove(&key).ok_or_else(not_suspended)?;
        sender.send(response).map_err(|_| not_suspended())?;
        tracing::debug!(route, correlation, "request resumed");
        Ok(())
    }

    /// Returns true if a request is parked under the key.
    #[must_use]
    pub fn is_suspended(&self, route: &str, correlation: &str) -> bool {
        self.waiting
            .contains_key(&(route.to_string(), correlation.to_string()))
    }

    /// Number of parked requests.
    #[must_use]
    pub fn len(&self) -> usize {
        self.waiting.len()
    }

    /// Returns true if nothing is parked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.waiting.is_empty()
    }
}
