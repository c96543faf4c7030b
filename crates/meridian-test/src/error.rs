//! Test error types.

use thiserror::Error;

/// Errors raised while building a request or reading a response.
#[derive(Debug, Error)]
pub enum TestError {
    /// The URI did not parse.
    #[error("invalid URI '{uri}': {reason}")]
    InvalidUri {
        /// The rejected URI.
        uri: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A header name or value was rejected.
    #[error("invalid header '{0}'")]
    InvalidHeader(String),

    /// A body could not be encoded.
    #[error("body encoding failed: {0}")]
    Encode(String),

    /// The response body is not UTF-8.
    #[error("response body is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// The response body is not the expected JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TestError {
    /// Creates an invalid URI error.
    pub fn invalid_uri(uri: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::InvalidUri {
            uri: uri.into(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let error = TestError::invalid_uri("http://[", "missing bracket");
        assert_eq!(error.to_string(), "invalid URI 'http://[': missing bracket");
        assert_eq!(
            TestError::InvalidHeader("x bad".into()).to_string(),
            "invalid header 'x bad'"
        );
    }

    #[test]
    fn test_from_json() {
        let json = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(matches!(TestError::from(json), TestError::Json(_)));
    }
}
