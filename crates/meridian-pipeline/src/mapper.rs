//! Exception mappers.
//!
//! A fault raised by a resource method or locator is turned into a response
//! by the first of:
//!
//! 1. a mapper registered for the fault's concrete type
//! 2. a mapper registered for one of its supertypes, nearest first
//! 3. the catch-all mapper
//! 4. the response the fault carries itself
//!
//! If none applies the fault is unmapped and the dispatcher answers with a
//! generic `500`.

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use meridian_core::{AppFault, Fault, FaultType, RequestContext, ResourceResponse};

/// Turns a fault into a response.
pub trait ExceptionMapper: Send + Sync + 'static {
    /// Builds the response for `fault`.
    fn to_response(&self, fault: &AppFault, ctx: &RequestContext) -> ResourceResponse;
}

struct FnMapper<F>(F);

impl<F> ExceptionMapper for FnMapper<F>
where
    F: Fn(&AppFault, &RequestContext) -> ResourceResponse + Send + Sync + 'static,
{
    fn to_response(&self, fault: &AppFault, ctx: &RequestContext) -> ResourceResponse {
        (self.0)(fault, ctx)
    }
}

/// How a fault was resolved.
#[derive(Debug)]
pub enum MappedFault {
    /// A registered mapper, or the catch-all, produced the response.
    Mapped {
        /// The fault type the mapper was registered for, `None` for the
        /// catch-all.
        mapper_for: Option<FaultType>,
        /// The response.
        response: ResourceResponse,
    },
    /// The fault carried its own response.
    Embedded(ResourceResponse),
    /// Nothing handled the fault.
    Unmapped,
}

impl MappedFault {
    /// The response, unless unmapped.
    #[must_use]
    pub fn into_response(self) -> Option<ResourceResponse> {
        match self {
            Self::Mapped { response, .. } | Self::Embedded(response) => Some(response),
            Self::Unmapped => None,
        }
    }
}

/// Exception mappers keyed by fault type.
///
/// # Example
///
/// ```
/// use meridian_core::{AppFault, Fault, RequestContext, ResourceResponse};
/// use meridian_pipeline::ExceptionMapperRegistry;
/// use http::StatusCode;
///
/// #[derive(Debug, thiserror::Error)]
/// #[error("book {0} not found")]
/// struct BookNotFoundFault(i64);
/// impl Fault for BookNotFoundFault {}
///
/// let mut mappers = ExceptionMapperRegistry::new();
/// mappers.register::<BookNotFoundFault, _>(|_, _| ResourceResponse::status(StatusCode::NOT_FOUND));
///
/// let fault = AppFault::from(BookNotFoundFault(9));
/// let response = mappers.map(&fault, &RequestContext::new()).into_response().unwrap();
/// assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
/// ```
#[derive(Clone, Default)]
pub struct ExceptionMapperRegistry {
    by_type: HashMap<TypeId, (FaultType, Arc<dyn ExceptionMapper>)>,
    catch_all: Option<Arc<dyn ExceptionMapper>>,
}

impl ExceptionMapperRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a closure for faults of type `F` and their subtypes.
    /// A later registration for the same type replaces the earlier one.
    pub fn register<F, M>(&mut self, mapper: M) -> &mut Self
    where
        F: Fault,
        M: Fn(&AppFault, &RequestContext) -> ResourceResponse + Send + Sync + 'static,
    {
        self.register_mapper::<F>(Arc::new(FnMapper(mapper)))
    }

    /// Registers a mapper for faults of type `F` and their subtypes.
    pub fn register_mapper<F: Fault>(&mut self, mapper: Arc<dyn ExceptionMapper>) -> &mut Self {
        let fault_type = FaultType::of::<F>();
        self.by_type.insert(fault_type.id(), (fault_type, mapper));
        self
    }

    /// Sets the mapper used when no typed mapper applies.
    pub fn catch_all<M>(&mut self, mapper: M) -> &mut Self
    where
        M: Fn(&AppFault, &RequestContext) -> ResourceResponse + Send + Sync + 'static,
    {
        self.catch_all = Some(Arc::new(FnMapper(mapper)));
        self
    }

    /// Number of typed mappers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_type.len()
    }

    /// Returns true if there are no typed mappers and no catch-all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_type.is_empty() && self.catch_all.is_none()
    }

    /// Resolves a fault.
    #[must_use]
    pub fn map(&self, fault: &AppFault, ctx: &RequestContext) -> MappedFault {
        for fault_type in fault.lineage() {
            if let Some((registered, mapper)) = self.by_type.get(&fault_type.id()) {
                tracing::debug!(
                    fault = fault.fault_type().name(),
                    mapper_for = registered.name(),
                    "fault mapped"
                );
                return MappedFault::Mapped {
                    mapper_for: Some(*registered),
                    response: mapper.to_response(fault, ctx),
                };
            }
        }
        if let Some(mapper) = &self.catch_all {
            return MappedFault::Mapped {
                mapper_for: None,
                response: mapper.to_response(fault, ctx),
            };
        }
        match fault.embedded_response() {
            Some(response) => MappedFault::Embedded(response.clone()),
            None => MappedFault::Unmapped,
        }
    }
}

impl fmt::Debug for ExceptionMapperRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut types: Vec<&str> = self.by_type.values().map(|(t, _)| t.name()).collect();
        types.sort_unstable();
        f.debug_struct("ExceptionMapperRegistry")
            .field("types", &types)
            .field("catch_all", &self.catch_all.is_some())
            .finish()
    }
}
