//! authstrip: ICAP request-adaptation service.
//!
//! Strips `Authorization` from proxied requests for content-addressed
//! registry blobs, so a shared cache can serve them to every tenant.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌───────────────────────────────────────────────┐
//!                     │                   AUTHSTRIP                   │
//!   Forward proxy     │  ┌─────────┐    ┌─────────┐    ┌───────────┐  │
//!   (ICAP client) ────┼─▶│   net   │───▶│  icap   │───▶│   adapt   │  │
//!                     │  │listener │    │ server  │    │  engine   │  │
//!                     │  └─────────┘    └─────────┘    └─────┬─────┘  │
//!                     │                      ▲               │        │
//!                     │                      │         ┌─────▼─────┐  │
//!   ◀─────────────────┼──────────────────────┘         │ classify  │  │
//!   200 / 204 / 405   │                                └───────────┘  │
//!                     │  ┌─────────────────────────────────────────┐  │
//!                     │  │ config · observability · lifecycle      │  │
//!                     │  └─────────────────────────────────────────┘  │
//!                     └───────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use authstrip::config::resolve_config;
use authstrip::lifecycle::startup;
use authstrip::observability::logging;

#[derive(Parser)]
#[command(name = "authstrip")]
#[command(about = "ICAP service that strips credentials from content-addressed blob requests", long_about = None)]
struct Cli {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Validate the configuration and exit.
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = resolve_config(cli.config.as_deref())?;

    if cli.check {
        println!("configuration OK");
        return Ok(());
    }

    logging::init_tracing(&config.observability)?;

    tracing::info!("authstrip v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_connections = config.listener.max_connections,
        classifier = ?config.service.classifier,
        decision_log = ?config.observability.decision_log,
        "Configuration loaded"
    );

    startup::run(config).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
