//! Clip server - main entry point
//!
//! Serves audio clips and spectrogram images to the bioacoustic review UI
//! over HTTP, with an in-memory result cache and a bounded render pool.

use anyhow::Result;
use chirp_server::api;
use chirp_server::api::AppContext;
use chirp_server::config::{Args, Config};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chirp_server=info,chirp_core=info,tower_http=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Parse command-line arguments and resolve configuration
    let args = Args::parse();
    let config = Config::load(&args)?;

    info!(
        "Starting clip server on {}:{} ({} workers, cache capacity {})",
        config.host, config.port, config.workers, config.cache_size
    );

    // Cache and render pool live for the whole process; handlers receive
    // them through the application context, never through globals
    let ctx = AppContext::new(&config);

    api::run(config, ctx).await?;

    info!("Server shutdown complete");
    Ok(())
}
