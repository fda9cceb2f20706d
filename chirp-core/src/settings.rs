//! Spectrogram render settings
//!
//! A strongly-typed configuration record with named fields and defaults,
//! validated at the serving boundary before any work is dispatched. Unknown
//! keys in incoming JSON are ignored; missing keys take defaults.
//!
//! Settings are value types: equality is structural, and the cache-key
//! fingerprint is a stable content hash over the canonical JSON form, so
//! logically-identical settings always hash identically regardless of how
//! they were constructed.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Configuration for one spectrogram render
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// STFT frame length in samples
    pub window_size: usize,

    /// Fraction of each frame shared with the next (0.0 ≤ f < 1.0)
    pub overlap_fraction: f64,

    /// Palette name: "greys", "greys_r", or a named colormap
    /// (viridis, plasma, inferno, magma). Unrecognized names fall back
    /// to inverted greyscale at render time rather than erroring.
    pub colormap: String,

    /// Decibel clipping bounds (low, high) applied before intensity mapping
    pub db_range: (f64, f64),

    /// Restrict the displayed frequency axis to `bandpass_range`
    pub use_bandpass: bool,

    /// Inclusive frequency bounds in Hz for the bandpass crop
    pub bandpass_range: (f64, f64),

    /// Draw a horizontal marker line at `reference_frequency`
    pub show_reference_frequency: bool,

    /// Marker line frequency in Hz
    pub reference_frequency: f64,

    /// Output image dimensions (width, height); None keeps native size
    pub resize: Option<(u32, u32)>,

    /// Peak-normalize the audio window before rendering
    pub normalize_audio: bool,

    /// Output channel count: 1 (greyscale) or 3 (RGB)
    pub channels: u8,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            window_size: 512,
            overlap_fraction: 0.5,
            colormap: "greys_r".to_string(),
            db_range: (-80.0, -20.0),
            use_bandpass: false,
            bandpass_range: (500.0, 8000.0),
            show_reference_frequency: false,
            reference_frequency: 1000.0,
            resize: Some((224, 224)),
            normalize_audio: true,
            channels: 3,
        }
    }
}

impl RenderSettings {
    /// Validate field ranges, rejecting invalid settings before dispatch
    pub fn validate(&self) -> Result<()> {
        if self.window_size < 16 {
            return Err(Error::Validation(format!(
                "window_size must be at least 16, got {}",
                self.window_size
            )));
        }
        if !(0.0..1.0).contains(&self.overlap_fraction) {
            return Err(Error::Validation(format!(
                "overlap_fraction must be in [0.0, 1.0), got {}",
                self.overlap_fraction
            )));
        }
        if self.db_range.0 >= self.db_range.1 {
            return Err(Error::Validation(format!(
                "db_range low bound {} must be below high bound {}",
                self.db_range.0, self.db_range.1
            )));
        }
        if self.use_bandpass && self.bandpass_range.0 >= self.bandpass_range.1 {
            return Err(Error::Validation(format!(
                "bandpass_range low bound {} must be below high bound {}",
                self.bandpass_range.0, self.bandpass_range.1
            )));
        }
        if self.channels != 1 && self.channels != 3 {
            return Err(Error::Validation(format!(
                "channels must be 1 or 3, got {}",
                self.channels
            )));
        }
        if let Some((w, h)) = self.resize {
            if w == 0 || h == 0 {
                return Err(Error::Validation(format!(
                    "resize dimensions must be non-zero, got {}x{}",
                    w, h
                )));
            }
        }
        Ok(())
    }

    /// Stable content hash over the canonicalized settings record.
    ///
    /// serde_json orders object keys alphabetically, so the serialized form
    /// is independent of field declaration or construction order. SHA-256
    /// truncated to 8 bytes is plenty to disambiguate cache keys.
    pub fn fingerprint(&self) -> String {
        // to_value then to_string routes through the sorted-key Map
        let canonical = serde_json::to_value(self)
            .and_then(|v| serde_json::to_string(&v))
            .unwrap_or_default();
        let digest = Sha256::digest(canonical.as_bytes());
        digest[..8].iter().map(|b| format!("{:02x}", b)).collect()
    }

    /// Hop size in samples derived from window size and overlap
    pub fn hop_size(&self) -> usize {
        ((self.window_size as f64) * (1.0 - self.overlap_fraction)).round() as usize
    }
}
