//! HTTP API for the clip server

pub mod handlers;
pub mod server;

pub use server::{create_router, run, AppContext};
