//! Pipeline metrics
//!
//! Recorded through the `metrics` facade; a no-op until the server installs
//! the Prometheus recorder.

use std::time::Duration;

pub const REQUESTS_TOTAL: &str = "research_requests_total";
pub const CACHE_HITS_TOTAL: &str = "research_cache_hits_total";
pub const RATE_LIMITED_TOTAL: &str = "research_rate_limited_total";
pub const FALLBACKS_TOTAL: &str = "research_fallbacks_total";
pub const PIPELINE_DURATION_SECONDS: &str = "research_pipeline_duration_seconds";

pub fn record_request() {
    metrics::counter!(REQUESTS_TOTAL).increment(1);
}

pub fn record_cache_hit() {
    metrics::counter!(CACHE_HITS_TOTAL).increment(1);
}

pub fn record_rate_limited() {
    metrics::counter!(RATE_LIMITED_TOTAL).increment(1);
}

/// Count a degraded stage, labelled by component
pub fn record_fallback(component: &str) {
    metrics::counter!(FALLBACKS_TOTAL, "component" => component.to_string()).increment(1);
}

/// Request latency, labelled `cache="hit"` or `cache="miss"`
pub fn record_duration(elapsed: Duration, cache_hit: bool) {
    let cache = if cache_hit { "hit" } else { "miss" };
    metrics::histogram!(PIPELINE_DURATION_SECONDS, "cache" => cache).record(elapsed.as_secs_f64());
}
