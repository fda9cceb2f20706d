//! Clip extraction pipeline
//!
//! Turns a `ClipRequest` into a `RenderedClip`: decode the time window,
//! normalize, render the spectrogram, and encode both payloads. Given
//! identical inputs and an unchanged source file the result is byte-identical,
//! which is what makes the cache a pure performance optimization.

use crate::audio;
use crate::error::{Error, Result};
use crate::settings::RenderSettings;
use crate::spectrogram;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// One clip to render: a bounded time-window of a source audio file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipRequest {
    pub file_path: String,
    pub start_time: f64,
    pub end_time: f64,
    pub settings: RenderSettings,
}

impl ClipRequest {
    /// Validate request fields before any work is scheduled
    pub fn validate(&self) -> Result<()> {
        if self.file_path.is_empty() {
            return Err(Error::Validation("file_path is required".to_string()));
        }
        if self.start_time < 0.0 || !self.start_time.is_finite() {
            return Err(Error::Validation(format!(
                "start_time must be non-negative, got {}",
                self.start_time
            )));
        }
        if !self.end_time.is_finite() || self.end_time <= self.start_time {
            return Err(Error::Validation(format!(
                "end_time {} must be greater than start_time {}",
                self.end_time, self.start_time
            )));
        }
        self.settings.validate()
    }
}

/// A rendered clip: lossless audio and image payloads plus their metadata
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedClip {
    /// WAV-encoded audio window (32-bit float, mono, native rate)
    pub audio_payload: Vec<u8>,
    /// PNG-encoded spectrogram image
    pub image_payload: Vec<u8>,
    /// Requested window length in seconds
    pub duration: f64,
    /// Native sample rate of the source file
    pub sample_rate: u32,
    /// Frequency span of the image's vertical axis in Hz
    pub frequency_range: (f64, f64),
    /// The requested (start_time, end_time) window
    pub time_range: (f64, f64),
}

/// Extract and render one clip.
///
/// Side-effect free beyond reading the source file.
pub fn extract(request: &ClipRequest) -> Result<RenderedClip> {
    request.validate()?;

    let path = Path::new(&request.file_path);
    debug!(
        "Extracting {} [{:.3}s - {:.3}s]",
        request.file_path, request.start_time, request.end_time
    );

    let clip = audio::read_clip(path, request.start_time, request.end_time)?;
    let mut samples = clip.samples;

    if request.settings.normalize_audio {
        // Epsilon keeps an all-silent window from dividing by zero
        let peak = samples.iter().fold(0.0f32, |m, &s| m.max(s.abs()));
        let scale = 1.0 / (peak + 1e-8);
        for s in samples.iter_mut() {
            *s *= scale;
        }
    }

    let (image, frequency_range) =
        spectrogram::render(&samples, clip.sample_rate, &request.settings);

    let audio_payload = audio::encode_wav(&samples, clip.sample_rate)?;
    let image_payload = encode_png(&image)?;

    Ok(RenderedClip {
        audio_payload,
        image_payload,
        duration: request.end_time - request.start_time,
        sample_rate: clip.sample_rate,
        frequency_range,
        time_range: (request.start_time, request.end_time),
    })
}

/// Encode a rendered image array as PNG
fn encode_png(image: &spectrogram::ImageArray) -> Result<Vec<u8>> {
    let color = match image.channels {
        1 => ExtendedColorType::L8,
        _ => ExtendedColorType::Rgb8,
    };
    let mut buf = Vec::new();
    PngEncoder::new(&mut buf)
        .write_image(&image.data, image.width, image.height, color)
        .map_err(|e| Error::Internal(format!("PNG encode failed: {}", e)))?;
    Ok(buf)
}
