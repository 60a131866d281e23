//! Metrics collection and exposition.
//!
//! # Metrics
//! - `kfcore_requests_total` (counter): requests by route, status
//! - `kfcore_request_duration_seconds` (histogram): latency by route
//! - `kfcore_auth_rejections_total` (counter): rejected requests by auth stage
//! - `kfcore_sessions_purged_total` (counter): expired sessions removed by the sweeper

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus recorder and its scrape listener on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint started"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to start metrics endpoint"),
    }
}

pub fn record_request(route: &str, status: u16, started: Instant) {
    counter!(
        "kfcore_requests_total",
        "route" => route.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("kfcore_request_duration_seconds", "route" => route.to_string())
        .record(started.elapsed().as_secs_f64());
}

/// `stage` is `verify` or `session`.
pub fn record_auth_rejection(stage: &'static str) {
    counter!("kfcore_auth_rejections_total", "stage" => stage).increment(1);
}

pub fn record_sessions_purged(count: usize) {
    counter!("kfcore_sessions_purged_total").increment(count as u64);
}
