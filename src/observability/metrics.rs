//! Metrics collection and exposition.
//!
//! # Metrics
//! - `node_requests_total` (counter): served requests by method, status
//! - `node_request_duration_seconds` (histogram): request latency
//! - `node_shutdowns_total` (counter): stops by reason
//! - `node_lifecycle_state` (gauge): 0=initializing … 4=failed
//!
//! Recording is always safe; without an installed exporter it is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    metrics::counter!(
        "node_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("node_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_shutdown(reason: &'static str) {
    metrics::counter!("node_shutdowns_total", "reason" => reason).increment(1);
}

pub fn record_lifecycle_state(state: f64) {
    metrics::gauge!("node_lifecycle_state").set(state);
}
