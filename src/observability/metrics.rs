//! Metrics collection and exposition.
//!
//! # Metrics
//! - `hash_submissions_total` (counter): secrets accepted
//! - `hash_digests_committed_total` (counter): digests written to the store
//! - `hash_outstanding` (gauge): submissions still waiting on their digest
//! - `http_requests_total` (counter): dispatched requests by method, status
//! - `http_request_duration_seconds` (histogram): dispatch latency
//!
//! Recording is a no-op until `init_metrics` installs the Prometheus recorder.

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_submission() {
    ::metrics::counter!("hash_submissions_total").increment(1);
}

pub fn record_commit() {
    ::metrics::counter!("hash_digests_committed_total").increment(1);
}

pub fn set_outstanding(count: usize) {
    ::metrics::gauge!("hash_outstanding").set(count as f64);
}

pub fn record_request(method: &str, status: u16, elapsed: Duration) {
    ::metrics::counter!(
        "http_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    ::metrics::histogram!("http_request_duration_seconds").record(elapsed.as_secs_f64());
}
