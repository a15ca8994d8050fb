//! Legend service metrics.
//!
//! Thin wrappers around the `metrics` facade so metric names and labels live
//! in one place. The Prometheus recorder is installed by the binary; without
//! it (tests) every call is a no-op.

use metrics::{counter, histogram};
use std::time::Duration;

pub const REQUESTS_TOTAL: &str = "legend_requests_total";
pub const REQUEST_DURATION: &str = "legend_request_duration_seconds";
pub const BACKEND_REQUESTS_TOTAL: &str = "legend_backend_requests_total";
pub const FRAGMENTS_TOTAL: &str = "legend_fragments_total";
pub const CONFIG_RELOADS_TOTAL: &str = "legend_config_reloads_total";

/// Record a finished legend request. `outcome` is `ok` or an error kind.
pub fn record_request(outcome: &'static str, duration: Duration) {
    counter!(REQUESTS_TOTAL, "outcome" => outcome).increment(1);
    histogram!(REQUEST_DURATION).record(duration.as_secs_f64());
}

/// Record one GetLegendGraphic call to the backend.
pub fn record_backend_request(status: &'static str) {
    counter!(BACKEND_REQUESTS_TOTAL, "status" => status).increment(1);
}

/// Record one materialized fragment by source kind.
pub fn record_fragment(source: &'static str) {
    counter!(FRAGMENTS_TOTAL, "source" => source).increment(1);
}

/// Record a configuration reload attempt.
pub fn record_config_reload(success: bool) {
    let result = if success { "ok" } else { "error" };
    counter!(CONFIG_RELOADS_TOTAL, "result" => result).increment(1);
}
