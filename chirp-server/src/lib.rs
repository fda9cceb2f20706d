//! chirp-server: HTTP serving front for the clip rendering engine
//!
//! A small axum service exposing the chirp-core pipeline: single-clip and
//! batch rendering with an in-memory result cache, cache administration, and
//! health/stats. CPU-bound rendering runs on a fixed pool of worker threads
//! so the request-accepting runtime stays responsive.

pub mod api;
pub mod batch;
pub mod config;
pub mod pool;

pub use api::{create_router, AppContext};
pub use config::Config;
pub use pool::RenderPool;
