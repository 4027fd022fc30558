//! idrec-identify - identity reconciliation microservice
//!
//! Serves `POST /identify` over a SQLite contact store.

use anyhow::{Context, Result};
use clap::Parser;
use idrec_common::config::{load_config, ConfigSource};
use idrec_common::db::init_database;
use idrec_identify::{build_router, AppState};
use std::path::PathBuf;
use tokio::signal;
use tracing::{error, info, warn};

/// Command-line arguments for idrec-identify
#[derive(Parser, Debug)]
#[command(name = "idrec-identify")]
#[command(about = "Identity reconciliation service")]
#[command(version)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "IDREC_CONFIG")]
    config: Option<PathBuf>,

    /// SQLite database file (overrides config)
    #[arg(short, long, env = "IDREC_DATABASE")]
    database: Option<PathBuf>,

    /// Interface to bind (overrides config)
    #[arg(long, env = "IDREC_HOST")]
    host: Option<String>,

    /// Port to listen on (overrides config)
    #[arg(short, long, env = "IDREC_PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let (mut config, source) =
        load_config(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(database) = args.database {
        config.database_path = database;
    }
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }

    // RUST_LOG wins over the configured level
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level)),
        )
        .init();

    // Build identification first, before any database work
    info!(
        "Starting idrec-identify v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    match &source {
        ConfigSource::File(path) => info!("Loaded configuration from {}", path.display()),
        ConfigSource::Defaults { missing: Some(path) } => warn!(
            "Config file not found at {}, using built-in defaults",
            path.display()
        ),
        ConfigSource::Defaults { missing: None } => {
            warn!("Could not determine config directory, using built-in defaults")
        }
    }

    info!("Database path: {}", config.database_path.display());
    let pool = match init_database(&config.database_path).await {
        Ok(pool) => {
            info!("✓ Database ready");
            pool
        }
        Err(e) => {
            error!("Failed to initialize database: {}", e);
            return Err(e.into());
        }
    };

    let state = AppState::new(pool.clone(), config.resolver.max_lock_wait_ms);
    let app = build_router(state);

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("idrec-identify listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    pool.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
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
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
