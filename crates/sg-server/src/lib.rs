//! sg-server: the HTTP streaming gateway.
//!
//! This crate ties the other sg-* crates into a running server:
//!
//! - `/token/{id}` issues signed stream URLs
//! - `/stream/{id}/...` checks the token, then serves rewritten manifests
//!   inline and redirects media requests to signed storage URLs
//! - `/health` and `/metrics` for operations
//! - Graceful shutdown via signal handling

pub mod context;
pub mod error;
pub mod gateway;
pub mod middleware;
pub mod router;
pub mod routes;
pub mod telemetry;

use std::net::SocketAddr;
use std::sync::Arc;

use sg_core::config::Config;
use sg_db::SqliteCatalog;
use sg_storage::SupabaseStorage;

use crate::context::AppContext;

/// Start the gateway and serve until a shutdown signal arrives.
pub async fn start(config: Config) -> sg_core::Result<()> {
    config.validate()?;
    for warning in config.warnings() {
        tracing::warn!("Config warning: {warning}");
    }

    let db_path = &config.catalog.db_path;
    let db = sg_db::pool::init_pool(db_path)?;
    tracing::info!("Catalog opened at {}", db_path.display());

    let storage = SupabaseStorage::from_config(&config.storage)?;
    tracing::info!(
        bucket = %config.storage.bucket,
        "Object storage at {}",
        config.storage.url.trim()
    );

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| sg_core::Error::Config(format!("Invalid server address: {e}")))?;

    let mut ctx = AppContext::new(config, Arc::new(SqliteCatalog::new(db)), Arc::new(storage))?;
    if let Some(handle) = telemetry::install_recorder() {
        ctx = ctx.with_metrics(handle);
    }

    let app = router::build_router(ctx);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| sg_core::Error::Internal(format!("Failed to bind to {addr}: {e}")))?;
    tracing::info!("Starting server on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| sg_core::Error::Internal(format!("Server error: {e}")))?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Wait for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    tracing::info!("Shutdown signal received");
}
