//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define gateway metrics (requests, latency, aborts, interceptor failures)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by route, status
//! - `gateway_request_duration_seconds` (histogram): latency by route
//! - `gateway_flow_aborts_total` (counter): exchanges that ended aborted, by route
//! - `gateway_interceptor_failures_total` (counter): errors/panics by interceptor, phase
//! - `gateway_config_reloads_total` (counter): reload attempts by result
//!
//! # Design Decisions
//! - Recording without an installed exporter is a no-op, so tests need no setup
//! - Labels for route, status code, interceptor

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Duration;

use crate::flow::Flow;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint started"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(route: &str, status: u16, elapsed: Duration) {
    metrics::counter!(
        "gateway_requests_total",
        "route" => route.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("gateway_request_duration_seconds", "route" => route.to_string())
        .record(elapsed.as_secs_f64());
}

pub fn record_abort(route: &str) {
    metrics::counter!("gateway_flow_aborts_total", "route" => route.to_string()).increment(1);
}

pub fn record_interceptor_failure(interceptor: &str, flow: Flow) {
    metrics::counter!(
        "gateway_interceptor_failures_total",
        "interceptor" => interceptor.to_string(),
        "flow" => flow.to_string()
    )
    .increment(1);
}

pub fn record_config_reload(success: bool) {
    let result = if success { "success" } else { "failure" };
    metrics::counter!("gateway_config_reloads_total", "result" => result).increment(1);
}
