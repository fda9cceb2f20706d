//! Error types for chirp-core
//!
//! Defines the rendering pipeline error taxonomy using thiserror for clear
//! error propagation across the extractor, cache, and serving layers.

use serde::Serialize;
use thiserror::Error;

/// Main error type for clip rendering operations
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed or missing request fields, rejected before any work is scheduled
    #[error("Validation error: {0}")]
    Validation(String),

    /// Source audio file does not exist
    #[error("File not found: {0}")]
    NotFound(String),

    /// File I/O errors while reading source audio
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Audio or image codec failures
    #[error("Decode error: {0}")]
    Decode(String),

    /// Unexpected renderer failure
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse error classification attached to per-item batch results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ValidationError,
    NotFound,
    IoError,
    DecodeError,
    InternalError,
}

impl Error {
    /// Classify this error for wire serialization
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation(_) => ErrorKind::ValidationError,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::Io(_) => ErrorKind::IoError,
            Error::Decode(_) => ErrorKind::DecodeError,
            Error::Internal(_) => ErrorKind::InternalError,
        }
    }
}

/// Convenience Result type using the chirp-core Error
pub type Result<T> = std::result::Result<T, Error>;
