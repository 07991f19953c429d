//! Metrics collection and exposition.
//!
//! # Metrics
//! - `listener_requests_total` (counter): requests handled
//! - `listener_in_flight_requests` (gauge): requests being served, by listener
//! - `listener_shutdowns_total` (counter): coordinator outcomes by listener, outcome
//! - `task_group_tasks_finished_total` (counter): task results by outcome
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape endpoint.
///
/// The exporter runs its own HTTP listener outside the task group.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_request() {
    metrics::counter!("listener_requests_total").increment(1);
}

pub fn set_in_flight(listener: &str, count: u64) {
    metrics::gauge!("listener_in_flight_requests", "listener" => listener.to_string())
        .set(count as f64);
}

pub fn record_shutdown(address: &str, outcome: &'static str) {
    metrics::counter!(
        "listener_shutdowns_total",
        "listener" => address.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_task_finished(ok: bool) {
    let outcome = if ok { "ok" } else { "error" };
    metrics::counter!("task_group_tasks_finished_total", "outcome" => outcome).increment(1);
}
