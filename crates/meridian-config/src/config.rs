//! Configuration schema.

use std::time::Duration;

use meridian_telemetry::{LogConfig, LogFormat as TelemetryFormat};
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Root configuration.
///
/// Every section is optional in a file; missing sections and fields take
/// their defaults. Unknown fields are rejected.
///
/// # Example
///
/// ```
/// use meridian_config::MeridianConfig;
///
/// let config = MeridianConfig::default();
/// assert_eq!(config.dispatch.request_id_header, "x-request-id");
/// assert!(!config.negotiation.wrap_collections);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MeridianConfig {
    /// Request dispatch.
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Content negotiation.
    #[serde(default)]
    pub negotiation: NegotiationConfig,

    /// Logging.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl MeridianConfig {
    /// Debug logging in pretty format.
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();
        config.logging.level = "debug".to_string();
        config.logging.format = LogFormat::Pretty;
        config.logging.span_events = true;
        config
    }

    /// Info logging in JSON format.
    #[must_use]
    pub fn production() -> Self {
        let mut config = Self::default();
        config.logging.level = "info".to_string();
        config.logging.format = LogFormat::Json;
        config.logging.span_events = false;
        config
    }

    /// Checks values that parse but make no sense.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let header = &self.dispatch.request_id_header;
        if header.is_empty()
            || !header
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
        {
            return Err(ConfigError::invalid_value(
                "dispatch.request_id_header",
                format!("'{header}' is not a valid header name"),
            ));
        }

        if self.dispatch.suspend_timeout_ms == 0 {
            return Err(ConfigError::invalid_value(
                "dispatch.suspend_timeout_ms",
                "must be greater than 0",
            ));
        }

        if self.logging.enabled {
            meridian_telemetry::create_env_filter(&self.logging.level)
                .map_err(|e| ConfigError::invalid_value("logging.level", e.to_string()))?;
        }

        Ok(())
    }
}

/// Dispatch settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DispatchConfig {
    /// Header carrying an inbound request ID.
    #[serde(default = "default_request_id_header")]
    pub request_id_header: String,

    /// Whether the request ID is echoed on responses.
    #[serde(default = "default_true")]
    pub propagate_request_id: bool,

    /// How long a suspended request waits to be resumed.
    #[serde(default = "default_suspend_timeout_ms")]
    pub suspend_timeout_ms: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            request_id_header: default_request_id_header(),
            propagate_request_id: true,
            suspend_timeout_ms: default_suspend_timeout_ms(),
        }
    }
}

impl DispatchConfig {
    /// The suspend timeout as a [`Duration`].
    #[must_use]
    pub const fn suspend_timeout(&self) -> Duration {
        Duration::from_millis(self.suspend_timeout_ms)
    }
}

/// Content negotiation settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NegotiationConfig {
    /// Wrap JSON collections as `{"<Element>": [...]}`.
    #[serde(default)]
    pub wrap_collections: bool,
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Whether logging is installed.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Filter directives.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Emit span open and close events.
    #[serde(default)]
    pub span_events: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_log_level(),
            format: LogFormat::default(),
            span_events: false,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON lines.
    #[default]
    Json,
    /// Human-readable.
    Pretty,
}

impl From<&LoggingConfig> for LogConfig {
    fn from(config: &LoggingConfig) -> Self {
        let base = match config.format {
            LogFormat::Json => Self::production(),
            LogFormat::Pretty => Self::development(),
        };
        Self {
            enabled: config.enabled,
            level: config.level.clone(),
            format: match config.format {
                LogFormat::Json => TelemetryFormat::Json,
                LogFormat::Pretty => TelemetryFormat::Pretty,
            },
            span_events: config.span_events,
            ..base
        }
    }
}

fn default_request_id_header() -> String {
    "x-request-id".to_string()
}

const fn default_true() -> bool {
    true
}

const fn default_suspend_timeout_ms() -> u64 {
    30_000
}

fn default_log_level() -> String {
    "info".to_string()
}
