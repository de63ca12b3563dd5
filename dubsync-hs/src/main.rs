//! History Sync service (dubsync-hs) - Main entry point
//!
//! Reconciles the remote room's playback history into the local database
//! and exposes the operational HTTP trigger for running passes and
//! managing the checkpoint.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dubsync_common::config::resolve_database_path;
use dubsync_common::db::init_database;
use dubsync_hs::source::HttpHistorySource;
use dubsync_hs::{api, AppState};

/// Command-line arguments for dubsync-hs
#[derive(Parser, Debug)]
#[command(name = "dubsync-hs")]
#[command(about = "History sync service for DubSync")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "5750", env = "DUBSYNC_HS_PORT")]
    port: u16,

    /// Path to the SQLite database (falls back to env, config file, OS default)
    #[arg(short, long)]
    database: Option<String>,

    /// Base URL of the remote room service
    #[arg(
        long,
        default_value = "https://api.dubtrack.fm",
        env = "DUBSYNC_SOURCE_URL"
    )]
    source_url: String,

    /// Room slug whose history is synced
    #[arg(short, long, env = "DUBSYNC_ROOM")]
    room: String,

    /// Total attempts the retry wrapper gives each chunk commit
    #[arg(long, default_value = "10", env = "DUBSYNC_MAX_ATTEMPTS")]
    max_attempts: u32,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dubsync_hs=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Parse command-line arguments
    let args = Args::parse();

    info!("Starting DubSync History Sync on port {}", args.port);
    info!("Syncing room: {}", args.room);

    let db_path = resolve_database_path(args.database.as_deref(), "DUBSYNC_DB")
        .context("Failed to resolve database path")?;
    info!("Database: {}", db_path.display());

    let db = init_database(&db_path)
        .await
        .context("Failed to initialize database")?;

    let source = HttpHistorySource::new(&args.source_url, &args.room)
        .context("Failed to build history source client")?;

    let state = AppState::new(db, Arc::new(source), args.max_attempts);
    let app = api::build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
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
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
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
