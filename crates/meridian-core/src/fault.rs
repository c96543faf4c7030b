//! Application faults.
//!
//! Resource methods fail with an [`AppFault`], which boxes any type that
//! implements [`Fault`] and remembers its concrete type. Exception mappers
//! are keyed by that type; a fault can also name its supertypes so a mapper
//! registered for a broader fault still applies.

use std::any::TypeId;
use std::collections::HashSet;
use std::fmt;

use http::StatusCode;

use crate::response::ResourceResponse;

/// An error raised by application code during invocation.
///
/// # Example
///
/// ```
/// use meridian_core::{AppFault, Fault, FaultType};
///
/// #[derive(Debug, thiserror::Error)]
/// #[error("lookup failed")]
/// struct LookupFault;
/// impl Fault for LookupFault {}
///
/// #[derive(Debug, thiserror::Error)]
/// #[error("book {0} not found")]
/// struct BookNotFoundFault(i64);
///
/// impl Fault for BookNotFoundFault {
///     fn supertypes() -> Vec<FaultType> {
///         vec![FaultType::of::<LookupFault>()]
///     }
/// }
///
/// let fault = AppFault::from(BookNotFoundFault(7));
/// let lineage: Vec<_> = fault.lineage().iter().map(|t| t.name()).collect();
/// assert_eq!(lineage.len(), 2);
/// assert!(fault.is::<BookNotFoundFault>());
/// ```
pub trait Fault: std::error::Error + Send + Sync + 'static {
    /// Broader fault types, nearest first.
    fn supertypes() -> Vec<FaultType>
    where
        Self: Sized,
    {
        Vec::new()
    }

    /// The response to use when no exception mapper handles this fault.
    fn response(&self) -> Option<ResourceResponse> {
        None
    }
}

impl Fault for serde_json::Error {}

/// Identity of a fault type, used as the exception mapper key.
#[derive(Clone, Copy)]
pub struct FaultType {
    id: TypeId,
    name: &'static str,
    supertypes: fn() -> Vec<FaultType>,
}

impl FaultType {
    /// The fault type of `F`.
    #[must_use]
    pub fn of<F: Fault>() -> Self {
        Self {
            id: TypeId::of::<F>(),
            name: std::any::type_name::<F>(),
            supertypes: F::supertypes,
        }
    }

    fn untyped<T: 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
            supertypes: Vec::new,
        }
    }

    /// The type id.
    #[must_use]
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// The full type name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Declared direct supertypes.
    #[must_use]
    pub fn supertypes(&self) -> Vec<FaultType> {
        (self.supertypes)()
    }
}

impl PartialEq for FaultType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for FaultType {}

impl fmt::Debug for FaultType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// A boxed application fault with its type identity.
pub struct AppFault {
    error: Box<dyn std::error::Error + Send + Sync>,
    fault_type: FaultType,
    response: Option<ResourceResponse>,
}

impl AppFault {
    /// The concrete fault type.
    #[must_use]
    pub fn fault_type(&self) -> FaultType {
        self.fault_type
    }

    /// The concrete type followed by every supertype, breadth first.
    /// Each type appears once.
    #[must_use]
    pub fn lineage(&self) -> Vec<FaultType> {
        let mut seen = HashSet::new();
        let mut out = vec![self.fault_type];
        seen.insert(self.fault_type.id);
        let mut cursor = 0;
        while cursor < out.len() {
            for parent in out[cursor].supertypes() {
                if seen.insert(parent.id) {
                    out.push(parent);
                }
            }
            cursor += 1;
        }
        out
    }

    /// Returns true if the concrete type is `F`.
    #[must_use]
    pub fn is<F: Fault>(&self) -> bool {
        self.fault_type.id == TypeId::of::<F>()
    }

    /// Borrows the fault as `F`.
    #[must_use]
    pub fn downcast_ref<F: Fault>(&self) -> Option<&F> {
        self.error.downcast_ref::<F>()
    }

    /// The response carried by the fault itself, if any.
    #[must_use]
    pub fn embedded_response(&self) -> Option<&ResourceResponse> {
        self.response.as_ref()
    }

    /// The underlying error.
    #[must_use]
    pub fn error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        self.error.as_ref()
    }
}

impl<F: Fault> From<F> for AppFault {
    fn from(fault: F) -> Self {
        let response = fault.response();
        Self {
            error: Box::new(fault),
            fault_type: FaultType::of::<F>(),
            response,
        }
    }
}

impl From<anyhow::Error> for AppFault {
    fn from(error: anyhow::Error) -> Self {
        Self {
            error: error.into(),
            fault_type: FaultType::untyped::<anyhow::Error>(),
            response: None,
        }
    }
}

impl fmt::Debug for AppFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppFault")
            .field("type", &self.fault_type)
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for AppFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.error, f)
    }
}

/// A fault that carries the response to send.
///
/// Used when application code wants a specific status without registering
/// an exception mapper. A registered mapper for this type still wins.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct WebApplicationFault {
    message: String,
    response: ResourceResponse,
}

impl WebApplicationFault {
    /// A fault answered with an empty response of the given status.
    #[must_use]
    pub fn new(status: StatusCode) -> Self {
        Self {
            message: status
                .canonical_reason()
                .unwrap_or("web application fault")
                .to_string(),
            response: ResourceResponse::status(status),
        }
    }

    /// A fault answered with a prepared response.
    #[must_use]
    pub fn with_response(response: ResourceResponse) -> Self {
        let mut fault = Self::new(response.status_code());
        fault.response = response;
        fault
    }

    /// Overrides the message used in logs.
    #[must_use]
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// `404 Not Found`.
    #[must_use]
    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND)
    }

    /// The status of the carried response.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.response.status_code()
    }
}

impl Fault for WebApplicationFault {
    fn response(&self) -> Option<ResourceResponse> {
        Some(self.response.clone())
    }
}
