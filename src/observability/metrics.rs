//! Metrics collection and exposition.
//!
//! # Metrics
//! - `action_requests_total` (counter): dispatched actions by mode, outcome
//! - `action_request_duration_seconds` (histogram): decode-to-response latency by mode
//! - `action_redirect_probe_total` (counter): redirect probes by result
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed, so tests need no setup
//! - Labels are static strings only

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one dispatched action.
pub fn record_action(mode: &'static str, outcome: &'static str, start: Instant) {
    metrics::counter!("action_requests_total", "mode" => mode, "outcome" => outcome).increment(1);
    metrics::histogram!("action_request_duration_seconds", "mode" => mode)
        .record(start.elapsed().as_secs_f64());
}

/// Record the result of a redirect probe (`rendered` or a fallback reason).
pub fn record_probe(result: &'static str) {
    metrics::counter!("action_redirect_probe_total", "result" => result).increment(1);
}
