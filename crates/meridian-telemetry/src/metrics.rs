//! Request metrics.
//!
//! Recorded through the `metrics` facade. No exporter is installed here;
//! the application installs whichever recorder it uses.
//!
//! | Metric | Type | Labels |
//! |--------|------|--------|
//! | `meridian_requests_total` | Counter | `method`, `status`, `outcome` |
//! | `meridian_request_duration_seconds` | Histogram | `method`, `outcome` |
//! | `meridian_in_flight_requests` | Gauge | - |

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use std::time::Duration;

/// Requests dispatched.
pub const REQUESTS_TOTAL: &str = "meridian_requests_total";

/// Time from receipt to written response.
pub const REQUEST_DURATION_SECONDS: &str = "meridian_request_duration_seconds";

/// Requests currently being dispatched.
pub const IN_FLIGHT_REQUESTS: &str = "meridian_in_flight_requests";

/// Registers metric descriptions with the installed recorder.
pub fn describe_metrics() {
    describe_counter!(REQUESTS_TOTAL, "Total number of requests dispatched");
    describe_histogram!(
        REQUEST_DURATION_SECONDS,
        metrics::Unit::Seconds,
        "Request dispatch duration in seconds"
    );
    describe_gauge!(IN_FLIGHT_REQUESTS, "Requests currently being dispatched");
}

/// Records a finished request.
///
/// `outcome` is the final dispatch state, `written` or `aborted`.
pub fn record_request(method: &str, status_code: u16, outcome: &'static str, duration: Duration) {
    counter!(
        REQUESTS_TOTAL,
        "method" => method.to_string(),
        "status" => status_code.to_string(),
        "outcome" => outcome
    )
    .increment(1);

    histogram!(
        REQUEST_DURATION_SECONDS,
        "method" => method.to_string(),
        "outcome" => outcome
    )
    .record(duration.as_secs_f64());
}

/// Keeps the in-flight gauge raised while alive.
#[derive(Debug)]
pub struct InFlightGuard {
    _private: (),
}

impl InFlightGuard {
    /// Raises the gauge.
    #[must_use]
    pub fn new() -> Self {
        gauge!(IN_FLIGHT_REQUESTS).increment(1.0);
        Self { _private: () }
    }
}

impl Default for InFlightGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        gauge!(IN_FLIGHT_REQUESTS).decrement(1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder() {
        describe_metrics();
        record_request("GET", 200, "written", Duration::from_millis(3));
        let guard = InFlightGuard::new();
        drop(guard);
    }
}
