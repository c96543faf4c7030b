//! Telemetry error types.

use thiserror::Error;

/// Errors that can occur while installing telemetry.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The subscriber could not be installed, usually because one is
    /// already set for the process.
    #[error("failed to initialize logging: {0}")]
    LoggingInit(String),

    /// The logging configuration is unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TelemetryError::LoggingInit(
            "a global default trace dispatcher has already been set".to_string(),
        );
        assert!(err.to_string().starts_with("failed to initialize logging"));
        assert_eq!(
            TelemetryError::InvalidConfig("level".into()).to_string(),
            "invalid configuration: level"
        );
    }
}
