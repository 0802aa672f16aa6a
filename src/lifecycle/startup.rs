//! Startup orchestration.
//!
//! # Responsibilities
//! - Start the metrics exporter when enabled
//! - Bind the listener, wire signals to shutdown
//! - Run the ICAP server until it has drained
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listener starts last (traffic only when ready)

use std::net::{AddrParseError, SocketAddr};

use metrics_exporter_prometheus::BuildError;

use crate::config::ServiceConfig;
use crate::icap::IcapServer;
use crate::lifecycle::{signals, Shutdown};
use crate::net::{Listener, ListenerError};
use crate::observability::metrics;

/// Errors that abort startup or the serve loop.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("invalid metrics address: {0}")]
    MetricsAddress(#[from] AddrParseError),
    #[error("failed to start metrics exporter: {0}")]
    Metrics(#[from] BuildError),
    #[error(transparent)]
    Listener(#[from] ListenerError),
}

/// Run the service with a validated configuration until a shutdown signal.
pub async fn run(config: ServiceConfig) -> Result<(), StartupError> {
    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let server = IcapServer::from_config(&config);
    let listener = Listener::bind(&config.listener).await?;

    let shutdown = Shutdown::new();
    let stop = shutdown.subscribe();
    signals::spawn_signal_handler(shutdown);

    server.run(listener, stop).await?;
    Ok(())
}
