//! Wiring a dispatcher from [`MeridianConfig`].

use std::sync::Arc;

use http::HeaderName;
use meridian_codec::CodecRegistry;
use meridian_config::{ConfigError, MeridianConfig};
use meridian_core::{RouteTable, SuspensionRegistry};
use meridian_pipeline::DispatcherBuilder;
use meridian_telemetry::{LogConfig, TelemetryResult};

/// Starts a dispatcher builder with the configured codecs, request id
/// handling and suspension timeout.
///
/// Filters and mappers are added to the returned builder as usual.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidValue`] if the configuration fails
/// validation or names an unusable request id header.
pub fn configure(
    table: Arc<RouteTable>,
    config: &MeridianConfig,
) -> Result<DispatcherBuilder, ConfigError> {
    config.validate()?;
    let header = HeaderName::from_bytes(config.dispatch.request_id_header.as_bytes())
        .map_err(|e| ConfigError::invalid_value("dispatch.request_id_header", e.to_string()))?;

    Ok(DispatcherBuilder::new(table)
        .codecs(CodecRegistry::with_defaults(
            config.negotiation.wrap_collections,
        ))
        .request_id_header(header)
        .propagate_request_id(config.dispatch.propagate_request_id)
        .suspension(
            Arc::new(SuspensionRegistry::new()),
            config.dispatch.suspend_timeout(),
        ))
}

/// Installs the global subscriber described by the `logging` section.
///
/// # Errors
///
/// Fails if a subscriber is already installed or the level is invalid.
pub fn init_telemetry(config: &MeridianConfig) -> TelemetryResult<()> {
    meridian_telemetry::describe_metrics();
    meridian_telemetry::init_logging(&LogConfig::from(&config.logging))
}
