//! Server configuration
//!
//! Layered resolution, highest priority first: command-line argument,
//! environment variable (via clap), optional TOML config file, compiled
//! default. CLI/env values win only when explicitly given, so the file can
//! still override the compiled defaults.

use anyhow::Context;
use clap::Parser;
use serde::Deserialize;
use std::net::IpAddr;
use std::path::PathBuf;

/// Command-line arguments for chirp-server
#[derive(Parser, Debug)]
#[command(name = "chirp-server")]
#[command(about = "Clip rendering server for bioacoustic review")]
#[command(version)]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, env = "CHIRP_PORT")]
    pub port: Option<u16>,

    /// Address to bind
    #[arg(long, env = "CHIRP_HOST")]
    pub host: Option<IpAddr>,

    /// Maximum number of cached rendered clips
    #[arg(long, env = "CHIRP_CACHE_SIZE")]
    pub cache_size: Option<usize>,

    /// Render worker thread count
    #[arg(long, env = "CHIRP_WORKERS")]
    pub workers: Option<usize>,

    /// Path to a TOML configuration file
    #[arg(short, long, env = "CHIRP_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Optional TOML file contents; every field may be omitted
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    port: Option<u16>,
    host: Option<IpAddr>,
    cache_size: Option<usize>,
    workers: Option<usize>,
    batch_concurrency: Option<usize>,
}

/// Resolved server configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub host: IpAddr,
    pub cache_size: usize,
    pub workers: usize,
    pub batch_concurrency: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8000,
            host: IpAddr::from([127, 0, 0, 1]),
            cache_size: chirp_core::cache::DEFAULT_MAX_ENTRIES,
            workers: crate::pool::DEFAULT_WORKERS,
            batch_concurrency: crate::pool::DEFAULT_WORKERS,
        }
    }
}

impl Config {
    /// Resolve the effective configuration from CLI args and optional file
    pub fn load(args: &Args) -> anyhow::Result<Self> {
        let file = match &args.config {
            Some(path) => {
                let contents = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file {}", path.display()))?;
                toml::from_str::<ConfigFile>(&contents)
                    .with_context(|| format!("Failed to parse config file {}", path.display()))?
            }
            None => ConfigFile::default(),
        };

        let defaults = Config::default();
        Ok(Config {
            port: args.port.or(file.port).unwrap_or(defaults.port),
            host: args.host.or(file.host).unwrap_or(defaults.host),
            cache_size: args
                .cache_size
                .or(file.cache_size)
                .unwrap_or(defaults.cache_size)
                .max(1),
            workers: args
                .workers
                .or(file.workers)
                .unwrap_or(defaults.workers)
                .max(1),
            batch_concurrency: file
                .batch_concurrency
                .unwrap_or(defaults.batch_concurrency)
                .max(1),
        })
    }
}
