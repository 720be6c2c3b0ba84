//! Deferred password hashing service.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request      ┌────────────────────────────────────────────────┐
//!     ────────────────────┼─▶ routing::Router ──▶ http::handlers           │
//!                         │   (templates, stats)   │                       │
//!                         │                        ▼                       │
//!                         │              hashing::SubmissionStore          │
//!                         │              (ids, deferred digests, drain)    │
//!                         │                                                │
//!     SIGINT / SIGTERM ───┼─▶ lifecycle::Shutdown ◀── GET /shutdown        │
//!                         │        │                                       │
//!                         │        ▼                                       │
//!                         │   Router::shutdown → SubmissionStore::drain    │
//!                         └────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use hash_service::config::{self, ServiceConfig};
use hash_service::lifecycle::forward_signals;
use hash_service::observability::{logging, metrics};
use hash_service::HashServer;

#[derive(Parser)]
#[command(name = "hash-service")]
#[command(about = "Accepts passwords and serves their SHA-512 digests after a delay", long_about = None)]
struct Cli {
    /// Port to listen on (overrides the config file)
    port: Option<u16>,

    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => ServiceConfig::default(),
    };
    if let Some(port) = cli.port {
        config.listener.port = port;
    }

    logging::init_logging(&config.observability);
    tracing::info!("hash-service v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address(),
        delay_ms = config.hashing.delay_ms,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let server = HashServer::new(&config)?;
    forward_signals(server.shutdown_handle());
    server.serve().await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
