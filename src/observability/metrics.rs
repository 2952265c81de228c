//! Metrics collection and exposition.
//!
//! # Metrics
//! - `guard_requests_total` (counter): requests by method and status
//! - `guard_request_duration_seconds` (histogram): handler latency
//! - `guard_rate_limited_total` (counter): denied requests by policy
//! - `guard_rate_limit_entries` (gauge): live windows in a limiter table
//! - `guard_integrity_failures_total` (counter): failed verifications by reason
//! - `guard_duplicates_detected_total` (counter): duplicates by match kind
//!
//! Recording is a no-op until a recorder is installed, so library users and
//! tests pay nothing unless they call [`init_metrics`].

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    metrics::counter!(
        "guard_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("guard_request_duration_seconds", "method" => method.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_rate_limited(policy: &'static str) {
    metrics::counter!("guard_rate_limited_total", "policy" => policy).increment(1);
}

pub fn record_rate_limit_entries(policy: &'static str, entries: usize) {
    metrics::gauge!("guard_rate_limit_entries", "policy" => policy).set(entries as f64);
}

pub fn record_integrity_failure(reason: &'static str) {
    metrics::counter!("guard_integrity_failures_total", "reason" => reason).increment(1);
}

pub fn record_duplicate(matched_by: &'static str) {
    metrics::counter!("guard_duplicates_detected_total", "matched_by" => matched_by).increment(1);
}
