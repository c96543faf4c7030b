//! Binding errors.
//!
//! A [`BindingError`] names the parameter that could not be bound and where
//! it was read from, so the `400` body can point at the offending input.

use meridian_codec::CodecError;
use meridian_core::{DispatchError, ParamSource};
use thiserror::Error;

/// What went wrong with a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingErrorKind {
    /// A required value was absent and had no default.
    Missing,
    /// The value could not be coerced to the declared type.
    Invalid,
    /// No reader handles the request body.
    UnsupportedMediaType,
}

/// A parameter could not be bound.
///
/// # Example
///
/// ```rust
/// use meridian_core::{DispatchError, ErrorCategory, ParamSource};
/// use meridian_extract::{BindingError, BindingErrorKind};
///
/// let err = BindingError::invalid(ParamSource::Path, "id", "'abc' is not a i64");
/// assert_eq!(err.kind(), BindingErrorKind::Invalid);
/// assert_eq!(err.param_source(), ParamSource::Path);
///
/// let dispatch: DispatchError = err.into();
/// assert_eq!(dispatch.category(), ErrorCategory::BadRequest);
/// ```
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct BindingError {
    param_source: ParamSource,
    name: String,
    kind: BindingErrorKind,
    message: String,
}

impl BindingError {
    /// A required parameter is missing.
    pub fn missing(param_source: ParamSource, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            message: format!("missing required {} parameter '{name}'", param_source.as_str()),
            param_source,
            name,
            kind: BindingErrorKind::Missing,
        }
    }

    /// A parameter value has the wrong shape.
    pub fn invalid(
        param_source: ParamSource,
        name: impl Into<String>,
        details: impl AsRef<str>,
    ) -> Self {
        let name = name.into();
        Self {
            message: format!(
                "invalid {} parameter '{name}': {}",
                param_source.as_str(),
                details.as_ref()
            ),
            param_source,
            name,
            kind: BindingErrorKind::Invalid,
        }
    }

    /// The body media type has no reader.
    pub fn unsupported_media_type(media_type: impl Into<String>) -> Self {
        let media_type = media_type.into();
        Self {
            message: format!("unsupported media type '{media_type}'"),
            param_source: ParamSource::Body,
            name: media_type,
            kind: BindingErrorKind::UnsupportedMediaType,
        }
    }

    /// Where the parameter was read from.
    #[must_use]
    pub fn param_source(&self) -> ParamSource {
        self.param_source
    }

    /// The parameter name, or the media type for unsupported bodies.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The failure kind.
    #[must_use]
    pub fn kind(&self) -> BindingErrorKind {
        self.kind
    }

    pub(crate) fn from_codec(name: &str, error: CodecError) -> Self {
        match error {
            CodecError::UnsupportedMediaType { media_type, .. } => {
                Self::unsupported_media_type(media_type)
            }
            other => Self::invalid(ParamSource::Body, name, other.to_string()),
        }
    }
}

impl From<BindingError> for DispatchError {
    fn from(error: BindingError) -> Self {
        match error.kind {
            BindingErrorKind::UnsupportedMediaType => Self::unsupported_media_type(error.name),
            BindingErrorKind::Missing | BindingErrorKind::Invalid => {
                Self::bad_parameter(error.name, error.message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_core::ErrorCategory;

    #[test]
    fn test_missing_message() {
        let err = BindingError::missing(ParamSource::Query, "limit");
        assert_eq!(err.to_string(), "missing required query parameter 'limit'");
        assert_eq!(err.name(), "limit");
    }

    #[test]
    fn test_codec_errors() {
        let unsupported = BindingError::from_codec(
            "body",
            CodecError::UnsupportedMediaType {
                media_type: "text/xml".into(),
                type_name: "Book".into(),
            },
        );
        assert_eq!(
            DispatchError::from(unsupported).category(),
            ErrorCategory::UnsupportedMediaType
        );

        let decode =
            BindingError::from_codec("body", CodecError::decode("application/json", "EOF"));
        assert_eq!(decode.kind(), BindingErrorKind::Invalid);
        assert_eq!(DispatchError::from(decode).category(), ErrorCategory::BadRequest);
    }
}
