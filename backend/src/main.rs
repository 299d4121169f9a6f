//! Media Suite Backend
//!
//! A REST API and WebSocket server for the simulated multimedia processing
//! pipeline. Provides job submission, live progress, the agent communication
//! log and result downloads.

use media_suite_backend::api::{self, AppContext};
use media_suite_backend::config::Config;
use media_suite_backend::state::PipelineDb;
use std::net::SocketAddr;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Load configuration
    let config = Config::from_env();
    info!("Configuration loaded: {:?}", config);

    // Open the database; the server still runs without one
    let db = match &config.persistence.database_path {
        Some(path) => match PipelineDb::new(path).await {
            Ok(db) => {
                info!("Opened database at {}", path.display());
                Some(db)
            }
            Err(e) => {
                warn!("Failed to open database at {}: {}", path.display(), e);
                None
            }
        },
        None => {
            info!("Persistence disabled");
            None
        }
    };

    let ctx = AppContext::new(config.clone(), db.clone());

    // Restore jobs and messages from the previous run
    if let Some(db) = &db {
        ctx.restore(db).await;
    }

    // Sweep expired downloads
    let downloads = ctx.downloads.clone();
    let cleanup_interval = config
        .downloads
        .cleanup_interval
        .max(std::time::Duration::from_secs(1));
    let cleanup_task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(cleanup_interval);
        loop {
            interval.tick().await;
            let removed = downloads.cleanup_expired(chrono::Utc::now()).await;
            if removed > 0 {
                info!("Removed {} expired downloads", removed);
            }
        }
    });

    let app = api::router(ctx);

    // Bind to address from config
    let addr: SocketAddr = config
        .server_addr()
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid server address: {}", e))?;

    info!("🚀 Server running on http://{}", addr);
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    // Setup graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    cleanup_task.abort();
    info!("Server shutdown complete");
    Ok(())
}

/// Handle graceful shutdown signals (Ctrl+C, SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down gracefully...");
        },
        _ = terminate => {
            info!("Received SIGTERM, shutting down gracefully...");
        },
    }
}
