//! Structured logging.
//!
//! Installs a `tracing-subscriber` registry with an [`EnvFilter`] and either
//! JSON or human-readable output. The dispatcher emits its spans and events
//! through `tracing`; nothing is printed until a subscriber is installed.
//!
//! # Example
//!
//! ```rust,no_run
//! use meridian_telemetry::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::development())?;
//! tracing::info!(route = "/bookstore/{id}", "dispatcher ready");
//! # Ok::<(), meridian_telemetry::TelemetryError>(())
//! ```

use crate::error::TelemetryError;
use crate::TelemetryResult;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// One JSON object per line.
    #[default]
    Json,
    /// Multi-line human-readable output.
    Pretty,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Whether logging is installed at all.
    pub enabled: bool,

    /// Filter directives, e.g. `info` or `meridian_core=debug,info`.
    pub level: String,

    /// Output format.
    pub format: LogFormat,

    /// Whether to emit span open and close events.
    pub span_events: bool,

    /// Whether to include file and line.
    pub file_line_info: bool,

    /// Whether to include the event target.
    pub include_target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::production()
    }
}

impl LogConfig {
    /// Debug level, pretty output, span events on.
    #[must_use]
    pub fn development() -> Self {
        Self {
            enabled: true,
            level: "debug".to_string(),
            format: LogFormat::Pretty,
            span_events: true,
            file_line_info: true,
            include_target: true,
        }
    }

    /// Info level, JSON output.
    #[must_use]
    pub fn production() -> Self {
        Self {
            enabled: true,
            level: "info".to_string(),
            format: LogFormat::Json,
            span_events: false,
            file_line_info: false,
            include_target: true,
        }
    }
}

/// Installs the global subscriber.
///
/// Returns `Ok(())` without installing anything when logging is disabled.
///
/// # Errors
///
/// Returns [`TelemetryError::InvalidConfig`] for bad filter directives and
/// [`TelemetryError::LoggingInit`] when a subscriber is already set.
pub fn init_logging(config: &LogConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let filter = create_env_filter(&config.level)?;
    let span_events = if config.span_events {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let layer = tracing_subscriber::fmt::layer()
        .with_span_events(span_events)
        .with_file(config.file_line_info)
        .with_line_number(config.file_line_info)
        .with_target(config.include_target);
    let layer = match config.format {
        LogFormat::Json => layer.json().with_filter(filter).boxed(),
        LogFormat::Pretty => layer.pretty().with_filter(filter).boxed(),
    };

    tracing_subscriber::registry()
        .with(layer)
        .try_init()
        .map_err(|e| TelemetryError::LoggingInit(e.to_string()))
}

/// Parses filter directives.
///
/// # Errors
///
/// Returns [`TelemetryError::InvalidConfig`] if the directives do not parse.
pub fn create_env_filter(directives: &str) -> TelemetryResult<EnvFilter> {
    EnvFilter::try_new(directives)
        .map_err(|e| TelemetryError::InvalidConfig(format!("log level '{directives}': {e}")))
}
