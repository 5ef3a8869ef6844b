//! Metrics collection and exposition.
//!
//! # Metrics
//! - `balancer_requests_total` (counter): requests by method, status, backend
//! - `balancer_request_duration_seconds` (histogram): latency distribution
//! - `balancer_rate_limited_total` (counter): admissions denied
//! - `balancer_backend_alive` (gauge): 1=alive, 0=dead, per backend
//! - `balancer_rate_limit_buckets` (gauge): tracked client buckets
//!
//! Recording is a no-op until [`init_metrics`] installs the Prometheus
//! exporter.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter with an HTTP scrape listener on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, backend: &str, start: Instant) {
    let labels = [
        ("method", method.to_string()),
        ("status", status.to_string()),
        ("backend", backend.to_string()),
    ];
    metrics::counter!("balancer_requests_total", &labels).increment(1);
    metrics::histogram!("balancer_request_duration_seconds", &labels)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_rate_limited() {
    metrics::counter!("balancer_rate_limited_total").increment(1);
}

pub fn record_backend_health(backend: &str, alive: bool) {
    metrics::gauge!("balancer_backend_alive", "backend" => backend.to_string())
        .set(if alive { 1.0 } else { 0.0 });
}

pub fn record_bucket_count(count: usize) {
    metrics::gauge!("balancer_rate_limit_buckets").set(count as f64);
}
