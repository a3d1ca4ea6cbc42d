//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_admission_total` (counter): requests by terminal outcome
//! - `gateway_admission_duration_seconds` (histogram): decision + upstream latency by outcome
//! - `gateway_invocations_total` (counter): successful upstream calls by access key

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one completed admission decision.
pub fn record_admission(outcome: &'static str, start: Instant) {
    counter!("gateway_admission_total", "outcome" => outcome).increment(1);
    histogram!("gateway_admission_duration_seconds", "outcome" => outcome)
        .record(start.elapsed().as_secs_f64());
}

/// Count a successful call on behalf of `access_key`.
pub fn record_invocation(access_key: &str) {
    counter!("gateway_invocations_total", "access_key" => access_key.to_string()).increment(1);
}
