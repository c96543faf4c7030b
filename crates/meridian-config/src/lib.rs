//! Typed configuration for Meridian.
//!
//! - TOML and JSON files
//! - Environment variable overrides
//! - Strict parsing that fails on unknown fields
//! - Layering: defaults, then file, then environment
//!
//! # Example
//!
//! ```no_run
//! use meridian_config::ConfigLoader;
//!
//! # fn main() -> Result<(), meridian_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_dotenv()
//!     .with_optional_file("meridian.toml")?
//!     .with_env_prefix("MERIDIAN")
//!     .load()?;
//!
//! meridian_telemetry::init_logging(&(&config.logging).into()).ok();
//! # Ok(())
//! # }
//! ```
//!
//! # File Format
//!
//! ```toml
//! [dispatch]
//! request_id_header = "x-request-id"
//! propagate_request_id = true
//! suspend_timeout_ms = 30000
//!
//! [negotiation]
//! wrap_collections = false
//!
//! [logging]
//! enabled = true
//! level = "info"
//! format = "json"
//! span_events = false
//! ```
//!
//! # Environment Overrides
//!
//! `PREFIX__SECTION__KEY`, e.g. `MERIDIAN__LOGGING__LEVEL=debug` or
//! `MERIDIAN__NEGOTIATION__WRAP_COLLECTIONS=true`.

#![doc(html_root_url = "https://docs.rs/meridian-config/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod loader;

pub use config::{DispatchConfig, LogFormat, LoggingConfig, MeridianConfig, NegotiationConfig};
pub use error::ConfigError;
pub use loader::ConfigLoader;
