//! HTTP server setup and routing
//!
//! Sets up the axum server with routes for clip rendering, batch rendering,
//! cache administration, and health/stats.

use crate::config::Config;
use crate::pool::RenderPool;
use anyhow::Context;
use axum::{
    routing::{delete, get, post},
    Router,
};
use chirp_core::ClipCache;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::CorsLayer;
use tracing::info;

/// Shared application context passed to all handlers.
///
/// Owns the long-lived services (cache, render pool); created once at server
/// start and torn down at shutdown. Clone is cheap: everything inside is an
/// Arc.
#[derive(Clone)]
pub struct AppContext {
    pub cache: Arc<ClipCache>,
    pub pool: Arc<RenderPool>,
    pub batch_concurrency: usize,
    pub started: Instant,
}

impl AppContext {
    pub fn new(config: &Config) -> Self {
        let cache = Arc::new(ClipCache::new(config.cache_size));
        let pool = Arc::new(RenderPool::new(config.workers, Arc::clone(&cache)));
        Self {
            cache,
            pool,
            batch_concurrency: config.batch_concurrency,
            started: Instant::now(),
        }
    }
}

/// Build the application router
pub fn create_router(ctx: AppContext) -> Router {
    Router::new()
        // Clip rendering
        .route("/clip", get(super::handlers::get_clip))
        .route("/clips/batch", post(super::handlers::post_clips_batch))
        // Cache administration
        .route("/cache", delete(super::handlers::clear_cache))
        // Health and statistics
        .route("/health", get(super::handlers::health))
        .route("/stats", get(super::handlers::get_stats))
        // Attach application context
        .with_state(ctx)
        // The review UI is served from another origin (Electron/Tauri shell)
        .layer(CorsLayer::permissive())
}

/// Run the HTTP API server until shutdown
pub async fn run(config: Config, ctx: AppContext) -> anyhow::Result<()> {
    let app = create_router(ctx);

    let addr = SocketAddr::new(config.host, config.port);
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
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
