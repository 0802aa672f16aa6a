//! Metrics collection and exposition.
//!
//! # Metrics
//! - `authstrip_decisions_total` (counter): decisions by ICAP method and outcome
//! - `authstrip_connections_active` (gauge): open ICAP connections
//! - `authstrip_protocol_errors_total` (counter): rejected ICAP messages by kind
//!
//! # Design Decisions
//! - Recording is always on; without an installed recorder it is a no-op
//! - Method label is bounded to known verbs plus `other`

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::adapt::{AdaptationMethod, AdaptationOutcome};

/// Install the Prometheus recorder and its scrape endpoint.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_decision(method: &AdaptationMethod, outcome: AdaptationOutcome) {
    metrics::counter!(
        "authstrip_decisions_total",
        "method" => method.metric_label(),
        "outcome" => outcome.as_str()
    )
    .increment(1);
}

pub fn connection_opened() {
    metrics::gauge!("authstrip_connections_active").increment(1.0);
}

pub fn connection_closed() {
    metrics::gauge!("authstrip_connections_active").decrement(1.0);
}

pub fn record_protocol_error(kind: &'static str) {
    metrics::counter!("authstrip_protocol_errors_total", "kind" => kind).increment(1);
}
