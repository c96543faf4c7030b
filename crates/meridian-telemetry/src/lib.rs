//! Logging and metrics for Meridian.
//!
//! - [`init_logging`] installs a `tracing-subscriber` registry from a
//!   [`LogConfig`]
//! - [`metrics`] holds the request counters and histograms the dispatcher
//!   records through the `metrics` facade
//!
//! # Standard Metrics
//!
//! | Metric | Type | Labels |
//! |--------|------|--------|
//! | `meridian_requests_total` | Counter | `method`, `status`, `outcome` |
//! | `meridian_request_duration_seconds` | Histogram | `method`, `outcome` |
//! | `meridian_in_flight_requests` | Gauge | - |

#![doc(html_root_url = "https://docs.rs/meridian-telemetry/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::TelemetryError;
pub use logging::{create_env_filter, init_logging, LogConfig, LogFormat};
pub use metrics::{describe_metrics, record_request, InFlightGuard};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
