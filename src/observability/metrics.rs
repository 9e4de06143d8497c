//! Metrics collection and exposition.
//!
//! # Metrics
//! - `balancer_dispatch_total` (counter): dispatches by worker, status
//! - `balancer_dispatch_duration_seconds` (histogram): worker call latency
//! - `balancer_breaker_trips_total` (counter): breaker trips by worker
//! - `balancer_exhausted_total` (counter): requests rejected with no eligible worker

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

pub fn record_dispatch(worker: &str, status: u16, started: Instant) {
    metrics::counter!(
        "balancer_dispatch_total",
        "worker" => worker.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!(
        "balancer_dispatch_duration_seconds",
        "worker" => worker.to_string()
    )
    .record(started.elapsed().as_secs_f64());
}

pub fn record_breaker_trip(worker: &str) {
    metrics::counter!("balancer_breaker_trips_total", "worker" => worker.to_string()).increment(1);
}

pub fn record_exhausted() {
    metrics::counter!("balancer_exhausted_total").increment(1);
}
