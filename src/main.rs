//! Signed-request admission gateway.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌──────────────────────────────────────────────────────────┐
//!                     │                   ADMISSION GATEWAY                      │
//!                     │                                                          │
//!   Client Request    │  ┌──────────┐   ┌────────────┐   ┌──────────────────┐    │
//!   ──────────────────┼─▶│  http    │──▶│ request ID │──▶│ admission filter │    │
//!                     │  │ server   │   └────────────┘   │ allow-list       │    │
//!                     │  └──────────┘                    │ credentials      │    │
//!                     │                                  │ replay guard     │    │
//!                     │                                  │ signer           │    │
//!                     │                                  └────────┬─────────┘    │
//!                     │                                           ▼              │
//!   Client Response   │  ┌──────────────┐               ┌──────────────────┐     │
//!   ◀─────────────────┼──│  response    │◀──────────────│  proxy handler   │◀────┼── Upstream
//!                     │  │  translator  │               └──────────────────┘     │
//!                     │  └──────────────┘                                        │
//!                     │   config (watch + atomic swap) · observability · signals │
//!                     └──────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use admission_gateway::config::{load_config, watcher::ConfigWatcher, GatewayConfig};
use admission_gateway::lifecycle::{signals, Shutdown};
use admission_gateway::observability::{logging, metrics};
use admission_gateway::GatewayServer;

#[derive(Parser)]
#[command(name = "admission-gateway")]
#[command(about = "Signed-request admission filter in front of an upstream service", long_about = None)]
struct Args {
    /// Path to the TOML configuration file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Reload the configuration file when it changes.
    #[arg(short, long, requires = "config")]
    watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };

    logging::init_logging(&config.observability)?;

    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.address,
        allowed_addresses = ?config.admission.allowed_addresses,
        replay_window_secs = config.admission.replay_window_secs,
        "Configuration loaded"
    );
    if config.credentials.is_empty() {
        tracing::warn!("No credentials configured; every request will be rejected");
    }

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    // The watcher handle must outlive the server.
    let (_watcher, config_updates) = match (&args.config, args.watch) {
        (Some(path), true) => {
            let (watcher, rx) = ConfigWatcher::new(path);
            (Some(watcher.run()?), rx)
        }
        _ => {
            let (_, rx) = mpsc::unbounded_channel();
            (None, rx)
        }
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        signals::wait_for_signal().await;
        shutdown.trigger();
    });

    let server = GatewayServer::new(config)?;
    server.run(listener, config_updates, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
