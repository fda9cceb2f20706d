//! chirp-core: clip rendering engine for bioacoustic review
//!
//! The deterministic audio→spectrogram→image pipeline behind the clip
//! server: decode a time-window of a source audio file, render a
//! decibel-scaled spectrogram image, and package both as portable lossless
//! payloads, with a bounded in-memory result cache keyed on a composite
//! fingerprint.
//!
//! Nothing here is async or HTTP-aware; the serving front lives in
//! chirp-server.

pub mod audio;
pub mod cache;
pub mod clip;
pub mod error;
pub mod settings;
pub mod spectrogram;

pub use cache::{CacheKey, ClipCache};
pub use clip::{extract, ClipRequest, RenderedClip};
pub use error::{Error, ErrorKind, Result};
pub use settings::RenderSettings;
