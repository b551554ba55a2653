//! Metrics collection and exposition.
//!
//! # Metrics
//! - `rmh_requests_total` (counter): inbound requests by route, status
//! - `rmh_request_duration_seconds` (histogram): inbound latency by route
//! - `rmh_upstream_attempts_total` (counter): candidate attempts by upstream, outcome
//! - `rmh_upstream_duration_seconds` (histogram): candidate latency by upstream
//! - `rmh_fallback_total` (counter): exhausted requests by policy

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(route: &str, status: u16, start: Instant) {
    counter!(
        "rmh_requests_total",
        "route" => route.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("rmh_request_duration_seconds", "route" => route.to_string())
        .record(start.elapsed().as_secs_f64());
}

/// `outcome` is `ok`, `empty`, or a `FetchError::kind()`.
pub fn record_upstream_attempt(upstream: &'static str, outcome: &'static str, start: Instant) {
    counter!(
        "rmh_upstream_attempts_total",
        "upstream" => upstream,
        "outcome" => outcome
    )
    .increment(1);
    histogram!("rmh_upstream_duration_seconds", "upstream" => upstream)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_fallback(policy: &'static str) {
    counter!("rmh_fallback_total", "policy" => policy).increment(1);
}
