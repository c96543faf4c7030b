//! Error types for Meridian.
//!
//! Two families live here:
//!
//! - [`RegistrationError`]: problems found while building the route table.
//!   These are fatal at startup.
//! - [`DispatchError`]: per-request failures. Each maps to a fixed status
//!   code and renders as an [`ErrorEnvelope`]; none escape the dispatcher.
//!
//! | `ErrorCategory` | Status |
//! |---|---|
//! | `NotFound` | 404 |
//! | `MethodNotAllowed` | 405 |
//! | `UnsupportedMediaType` | 415 |
//! | `NotAcceptable` | 406 |
//! | `BadRequest` | 400 |
//! | `UnmappedFault` | 500 |
//! | `Unavailable` | 503 |
//! | `Internal` | 500 |

use http::{Method, StatusCode};
use meridian_router::{MediaTypeError, MethodSet, TemplateError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using [`DispatchError`].
pub type DispatchResult<T> = Result<T, DispatchError>;

/// Categories of dispatch failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// No template matched the path.
    NotFound,
    /// The path matched but the verb did not.
    MethodNotAllowed,
    /// The request body's media type is not consumed.
    UnsupportedMediaType,
    /// No producible media type is acceptable.
    NotAcceptable,
    /// Parameter binding or body decoding failed.
    BadRequest,
    /// Application fault without a mapper.
    UnmappedFault,
    /// A suspended request timed out.
    Unavailable,
    /// Failure inside the dispatcher itself.
    Internal,
}

impl ErrorCategory {
    /// Returns the HTTP status code for this category.
    #[must_use]
    pub const fn default_status_code(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::NotAcceptable => StatusCode::NOT_ACCEPTABLE,
            Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::UnmappedFault | Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

/// Per-request dispatch failure.
///
/// # Example
///
/// ```
/// use meridian_core::{DispatchError, ErrorCategory};
/// use http::StatusCode;
///
/// let error = DispatchError::bad_request("query parameter 'limit' is not a number");
/// assert_eq!(error.category(), ErrorCategory::BadRequest);
/// assert_eq!(error.status_code(), StatusCode::BAD_REQUEST);
/// ```
#[derive(Debug, Error)]
pub enum DispatchError {
    /// No template matched the path.
    #[error("no resource matches path '{path}'")]
    NotFound {
        /// The request path.
        path: String,
    },

    /// The path matched but no method accepts the verb.
    #[error("method {method} not allowed")]
    MethodNotAllowed {
        /// The request method.
        method: Method,
        /// Methods the path does support.
        allowed: MethodSet,
    },

    /// No candidate consumes the request media type.
    #[error("unsupported media type '{content_type}'")]
    UnsupportedMediaType {
        /// The request `Content-Type`.
        content_type: String,
    },

    /// No candidate produces an acceptable media type.
    #[error("no acceptable representation for '{accept}'")]
    NotAcceptable {
        /// The request `Accept` header.
        accept: String,
    },

    /// A parameter or the body could not be bound.
    #[error("bad request: {message}")]
    BadRequest {
        /// What failed.
        message: String,
        /// The parameter involved, if known.
        parameter: Option<String>,
    },

    /// An application fault reached the dispatcher without a mapper.
    /// The message is logged, never sent.
    #[error("unmapped fault {fault_type}: {message}")]
    UnmappedFault {
        /// Fault type name.
        fault_type: String,
        /// Fault message.
        message: String,
    },

    /// A suspended request was not resumed in time.
    #[error("service unavailable: {message}")]
    ServiceUnavailable {
        /// What timed out.
        message: String,
    },

    /// Internal dispatcher failure.
    #[error("internal error: {message}")]
    Internal {
        /// Human-readable message, not sent to clients.
        message: String,
        /// The underlying error.
        #[source]
        source: Option<anyhow::Error>,
    },
}

impl DispatchError {
    /// Creates a not found error.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound { path: path.into() }
    }

    /// Creates a method not allowed error.
    #[must_use]
    pub fn method_not_allowed(method: Method, allowed: MethodSet) -> Self {
        Self::MethodNotAllowed { method, allowed }
    }

    /// Creates an unsupported media type error.
    pub fn unsupported_media_type(content_type: impl Into<String>) -> Self {
        Self::UnsupportedMediaType {
            content_type: content_type.into(),
        }
    }

    /// Creates a not acceptable error.
    pub fn not_acceptable(accept: impl Into<String>) -> Self {
        Self::NotAcceptable {
            accept: accept.into(),
        }
    }

    /// Creates a bad request error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
            parameter: None,
        }
    }

    /// Creates a bad request error for a named parameter.
    pub fn bad_parameter(parameter: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
            parameter: Some(parameter.into()),
        }
    }

    /// Creates an unmapped fault error.
    pub fn unmapped_fault(fault_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::UnmappedFault {
            fault_type: fault_type.into(),
            message: message.into(),
        }
    }

    /// Creates a service unavailable error.
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::ServiceUnavailable {
            message: message.into(),
        }
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an internal error with a source error.
    pub fn internal_with_source(
        message: impl Into<String>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self::Internal {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Returns the error category.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::MethodNotAllowed { .. } => ErrorCategory::MethodNotAllowed,
            Self::UnsupportedMediaType { .. } => ErrorCategory::UnsupportedMediaType,
            Self::NotAcceptable { .. } => ErrorCategory::NotAcceptable,
            Self::BadRequest { .. } => ErrorCategory::BadRequest,
            Self::UnmappedFault { .. } => ErrorCategory::UnmappedFault,
            Self::ServiceUnavailable { .. } => ErrorCategory::Unavailable,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        self.category().default_status_code()
    }

    /// The `Allow` header value for method not allowed errors.
    #[must_use]
    pub fn allow_header(&self) -> Option<String> {
        match self {
            Self::MethodNotAllowed { allowed, .. } => {
                Some(allowed.clone().with_implicit().allow_header())
            }
            _ => None,
        }
    }

    /// Converts this error to a serializable envelope.
    ///
    /// Server-side failures get a generic message so internals never reach
    /// the client.
    #[must_use]
    pub fn to_envelope(&self, request_id: Option<&str>) -> ErrorEnvelope {
        let message = match self {
            Self::UnmappedFault { .. } | Self::Internal { .. } => {
                "internal server error".to_string()
            }
            other => other.to_string(),
        };
        ErrorEnvelope {
            error: ErrorDetail {
                code: self.error_code().to_string(),
                message,
                category: self.category(),
                details: self.error_details(),
            },
            request_id: request_id.map(ToString::to_string),
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::MethodNotAllowed { .. } => "METHOD_NOT_ALLOWED",
            Self::UnsupportedMediaType { .. } => "UNSUPPORTED_MEDIA_TYPE",
            Self::NotAcceptable { .. } => "NOT_ACCEPTABLE",
            Self::BadRequest { .. } => "BAD_REQUEST",
            Self::UnmappedFault { .. } | Self::Internal { .. } => "INTERNAL_ERROR",
            Self::ServiceUnavailable { .. } => "SERVICE_UNAVAILABLE",
        }
    }

    fn error_details(&self) -> Option<serde_json::Value> {
        match self {
            Self::BadRequest {
                parameter: Some(parameter),
                ..
            } => Some(serde_json::json!({ "parameter": parameter })),
            Self::MethodNotAllowed { allowed, .. } => Some(serde_json::json!({
                "allowed": allowed.sorted().iter().map(Method::as_str).collect::<Vec<_>>()
            })),
            _ => None,
        }
    }
}

/// Problems found while registering resources.
#[derive(Debug, Error)]
pub enum RegistrationError {
    /// A method has neither a verb nor a locator target.
    #[error("{class}::{method} has no HTTP verb and is not a sub-resource locator")]
    MissingVerb {
        /// Resource class name.
        class: String,
        /// Method name.
        method: String,
    },

    /// Two methods of one class share verb, path, consumes and produces.
    #[error("{class}::{method} duplicates {existing}: {verb} {path}")]
    DuplicateMethod {
        /// Resource class name.
        class: String,
        /// The later method.
        method: String,
        /// The method registered first.
        existing: String,
        /// The shared verb, or `LOCATOR`.
        verb: String,
        /// The shared template.
        path: String,
    },

    /// A template failed to compile.
    #[error("{class}::{method} has a malformed path")]
    Template {
        /// Resource class name.
        class: String,
        /// Method name.
        method: String,
        /// Compiler error.
        #[source]
        source: TemplateError,
    },

    /// A consumes or produces entry is not a media type.
    #[error("{class}::{method} declares an invalid media type")]
    MediaType {
        /// Resource class name.
        class: String,
        /// Method name.
        method: String,
        /// Parse error.
        #[source]
        source: MediaTypeError,
    },

    /// A method was declared without a handler.
    #[error("{class}::{method} has no handler")]
    MissingHandler {
        /// Resource class name.
        class: String,
        /// Method name.
        method: String,
    },

    /// A method declares more than one body parameter.
    #[error("{class}::{method} declares more than one body parameter")]
    MultipleBodies {
        /// Resource class name.
        class: String,
        /// Method name.
        method: String,
    },

    /// A path parameter names a capture the template does not have.
    #[error("{class}::{method} binds path parameter '{name}' missing from its template")]
    UnknownPathParam {
        /// Resource class name.
        class: String,
        /// Method name.
        method: String,
        /// The parameter name.
        name: String,
    },

    /// A root resource class has no way to obtain instances.
    #[error("resource class {class} has no lifecycle")]
    MissingLifecycle {
        /// Resource class name.
        class: String,
    },

    /// A locator targets a type never registered as a sub-resource.
    #[error("{class}::{method} returns unregistered sub-resource {target}")]
    UnknownSubResource {
        /// Resource class name.
        class: String,
        /// Locator method name.
        method: String,
        /// Target type name.
        target: String,
    },

    /// A bean parameter names an unknown bean.
    #[error("unknown bean '{name}'")]
    UnknownBean {
        /// The bean name.
        name: String,
    },

    /// The bean graph has a cycle.
    #[error("cyclic bean graph: {}", .cycle.join(" -> "))]
    CyclicBean {
        /// Bean names along the cycle, first repeated at the end.
        cycle: Vec<String>,
    },

    /// A custom-typed parameter has no converter.
    #[error("no converter registered for type '{type_name}'")]
    MissingConverter {
        /// The custom type name.
        type_name: String,
    },
}

/// Serializable error envelope for HTTP responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// The error details.
    pub error: ErrorDetail,
    /// The request ID for correlation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

/// Error detail within an envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable error code.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Error category.
    pub category: ErrorCategory,
    /// Additional error details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}
