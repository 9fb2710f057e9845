// SPDX-FileCopyrightText: 2026 Chronobot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric registration and recording helpers.
//!
//! Uses the metrics-rs facade. `serve` installs the Prometheus exporter when
//! `[metrics] enabled = true`; otherwise every call is a no-op.

use std::net::SocketAddr;

use chronobot_core::ChronobotError;
use metrics::{describe_counter, describe_gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::info;

/// Installs the Prometheus recorder globally and serves `/metrics` on `listen`.
///
/// Only one recorder can be installed per process. Must be called from
/// within a Tokio runtime.
pub fn install_prometheus(listen: SocketAddr) -> Result<(), ChronobotError> {
    PrometheusBuilder::new()
        .with_http_listener(listen)
        .install()
        .map_err(|e| {
            ChronobotError::Internal(format!("failed to install Prometheus exporter: {e}"))
        })?;
    register_metrics();
    info!(listen = %listen, "prometheus metrics exporter listening");
    Ok(())
}

/// Register all Chronobot metric descriptions.
///
/// Called once at startup.
pub fn register_metrics() {
    describe_counter!("chronobot_polls_total", "Update fetches by outcome");
    describe_counter!("chronobot_events_total", "Inbound events dispatched by kind");
    describe_counter!("chronobot_sends_total", "Outbound sends by result");
    describe_counter!("chronobot_jobs_total", "Scheduled job firings by result");
    describe_counter!("chronobot_iterations_total", "Run loop iterations by result");
    describe_gauge!(
        "chronobot_consecutive_failures",
        "Consecutive failed run loop iterations"
    );
}

/// Record the outcome of one poll.
pub fn record_poll(outcome: &'static str) {
    metrics::counter!("chronobot_polls_total", "outcome" => outcome).increment(1);
}

/// Record a dispatched event.
pub fn record_event(kind: &'static str) {
    metrics::counter!("chronobot_events_total", "kind" => kind).increment(1);
}

/// Record an outbound send.
pub fn record_send(result: &'static str) {
    metrics::counter!("chronobot_sends_total", "result" => result).increment(1);
}

/// Record a scheduled job firing.
pub fn record_job(result: &'static str) {
    metrics::counter!("chronobot_jobs_total", "result" => result).increment(1);
}

/// Record a completed iteration and the current failure streak.
pub fn record_iteration(failed: bool, consecutive_failures: u32) {
    let result = if failed { "failed" } else { "ok" };
    metrics::counter!("chronobot_iterations_total", "result" => result).increment(1);
    metrics::gauge!("chronobot_consecutive_failures").set(f64::from(consecutive_failures));
}
