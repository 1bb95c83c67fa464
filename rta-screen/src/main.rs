//! rta-screen - Survey response screening service
//!
//! Flags free-text answers that duplicate other participants' answers or the
//! participant's own answers, and assigns every answer a response group.
//!
//! **Endpoints:**
//! - `POST /`, `POST /screen`: screen one submission
//! - `POST /identify-duplicates`: metrics worker for remote deployments
//! - `GET /health`: status, uptime and degraded-path counters

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use rta_common::config::{resolve_config, StorageBackend};
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use rta_screen::AppState;

/// Command-line arguments for rta-screen
#[derive(Parser, Debug)]
#[command(name = "rta-screen")]
#[command(about = "Survey response screening service")]
#[command(version)]
struct Args {
    /// Config file (TOML)
    #[arg(short, long, env = "RTA_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, env = "RTA_PORT")]
    port: Option<u16>,

    /// Storage backend (sqlite or memory)
    #[arg(long, env = "RTA_STORAGE")]
    storage: Option<StorageBackend>,

    /// SQLite database file
    #[arg(long, env = "RTA_DATABASE_PATH")]
    database_path: Option<PathBuf>,

    /// Remote metrics worker URL (local computation when unset)
    #[arg(long, env = "RTA_WORKER_URL")]
    worker_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Resolved before the subscriber exists; its source is logged below
    let (mut config, config_source) =
        resolve_config(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(storage) = args.storage {
        config.storage = storage;
    }
    if let Some(path) = args.database_path {
        config.database_path = path;
    }
    if let Some(url) = args.worker_url {
        config.worker.url = Some(url);
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    config_source.log();
    info!("Starting rta-screen on port {}", config.port);
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!(
        storage = ?config.storage,
        max_batch_size = config.max_batch_size,
        length_prefilter = config.length_prefilter,
        tie_break = ?config.tie_break,
        request_timeout_ms = config.request_timeout_ms,
        "Screening configuration"
    );

    let state = AppState::from_config(&config)
        .await
        .context("Failed to initialize application state")?;

    let app = rta_screen::build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
