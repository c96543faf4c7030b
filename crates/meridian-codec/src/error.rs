//! Codec errors.

use meridian_core::DispatchError;
use thiserror::Error;

/// Failures selecting a codec or converting a body.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CodecError {
    /// No reader handles the request media type.
    #[error("no reader for {type_name} as '{media_type}'")]
    UnsupportedMediaType {
        /// The request media type.
        media_type: String,
        /// The target type.
        type_name: String,
    },

    /// No writer produces the response media type.
    #[error("no writer for {type_name} as '{media_type}'")]
    NotAcceptable {
        /// The response media type.
        media_type: String,
        /// The entity type.
        type_name: String,
    },

    /// A request body could not be read.
    #[error("cannot decode '{media_type}' body: {reason}")]
    Decode {
        /// The body media type.
        media_type: String,
        /// Why decoding failed.
        reason: String,
    },

    /// A response entity could not be written.
    #[error("cannot encode entity as '{media_type}': {reason}")]
    Encode {
        /// The response media type.
        media_type: String,
        /// Why encoding failed.
        reason: String,
    },
}

impl CodecError {
    /// Creates a decode error.
    pub fn decode(media_type: impl ToString, reason: impl ToString) -> Self {
        Self::Decode {
            media_type: media_type.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Creates an encode error.
    pub fn encode(media_type: impl ToString, reason: impl ToString) -> Self {
        Self::Encode {
            media_type: media_type.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl From<CodecError> for DispatchError {
    fn from(error: CodecError) -> Self {
        match error {
            CodecError::UnsupportedMediaType { media_type, .. } => {
                Self::unsupported_media_type(media_type)
            }
            CodecError::NotAcceptable { media_type, .. } => Self::not_acceptable(media_type),
            error @ CodecError::Decode { .. } => Self::bad_request(error.to_string()),
            error @ CodecError::Encode { .. } => {
                Self::internal_with_source("response entity could not be written", error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_core::ErrorCategory;

    #[test]
    fn test_dispatch_mapping() {
        let cases = [
            (
                CodecError::UnsupportedMediaType {
                    media_type: "text/xml".into(),
                    type_name: "Book".into(),
                },
                ErrorCategory::UnsupportedMediaType,
            ),
            (
                CodecError::NotAcceptable {
                    media_type: "image/png".into(),
                    type_name: "Book".into(),
                },
                ErrorCategory::NotAcceptable,
            ),
            (
                CodecError::decode("application/json", "EOF"),
                ErrorCategory::BadRequest,
            ),
            (
                CodecError::encode("application/json", "NaN"),
                ErrorCategory::Internal,
            ),
        ];
        for (error, category) in cases {
            assert_eq!(DispatchError::from(error).category(), category);
        }
    }
}
