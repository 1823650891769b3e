//! Portal Resilience - offline-first data access for the learning portal
//!
//! Runs the resilience layer as a service with a small admin API.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use portal_resilience::api::{create_router, AppState};
use portal_resilience::clock::SystemClock;
use portal_resilience::storage::FileStorage;
use portal_resilience::sync::HttpSyncBackend;
use portal_resilience::{Config, ResilienceContext};

/// Main entry point.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Open durable storage and the HTTP sync backend
/// 4. Build the resilience context (restores the sync queue, starts tasks)
/// 5. Start the admin HTTP server on the configured port
/// 6. On SIGINT/SIGTERM, stop serving and shut the context down
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "portal_resilience=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Portal Resilience service");

    let config = Config::from_env();
    info!(
        "Configuration loaded: max_entries={}, default_ttl={}s, max_age={}s, port={}, sync_interval={}s, data_dir={}",
        config.max_entries,
        config.default_ttl,
        config.max_age,
        config.server_port,
        config.sync_interval,
        config.data_dir.display()
    );

    let storage = FileStorage::open(config.data_dir.clone())
        .await
        .with_context(|| format!("Failed to open data dir {}", config.data_dir.display()))?;
    let backend = HttpSyncBackend::new(config.api_base_url.clone())?;

    let ctx = ResilienceContext::init(
        &config,
        Arc::new(backend),
        Arc::new(storage),
        Arc::new(SystemClock),
    )
    .await?;

    let app = create_router(AppState::new(ctx.offline.clone(), ctx.defaults.clone()));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    ctx.shutdown().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
