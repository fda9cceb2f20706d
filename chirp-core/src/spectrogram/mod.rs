//! Spectrogram rendering
//!
//! Pure waveform-to-image pipeline: STFT power spectrogram, decibel scaling,
//! optional reference-frequency marker and bandpass crop, colormap
//! application, bilinear resize, and u8 quantization.
//!
//! Rendering is deterministic: the same samples, sample rate, and settings
//! always produce the same pixels.

pub mod colormap;
pub mod stft;

use crate::settings::RenderSettings;
use colormap::Colormap;
use stft::power_spectrogram;
use tracing::warn;

/// Rendered image pixels in row-major, channel-interleaved layout
#[derive(Debug, Clone, PartialEq)]
pub struct ImageArray {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub channels: u8,
}

/// Render a waveform into a spectrogram image.
///
/// Returns the image and the frequency range (Hz) actually covered by the
/// vertical axis after any bandpass crop.
pub fn render(samples: &[f32], sample_rate: u32, settings: &RenderSettings) -> (ImageArray, (f64, f64)) {
    let spec = power_spectrogram(samples, sample_rate, settings.window_size, settings.hop_size());
    let frames = spec.frames;

    // Decibel conversion; zero power becomes -inf, which clips cleanly below
    let mut db: Vec<f32> = spec
        .power
        .iter()
        .map(|&p| if p > 0.0 { 10.0 * p.log10() } else { f32::NEG_INFINITY })
        .collect();
    let mut freqs = spec.freqs;

    // Reference marker: force the nearest bin to the top of the dB range,
    // before any bandpass crop so the line survives cropping decisions
    if settings.show_reference_frequency {
        let bin = nearest_bin(&freqs, settings.reference_frequency as f32);
        let top = settings.db_range.1 as f32;
        for v in db[bin * frames..(bin + 1) * frames].iter_mut() {
            *v = top;
        }
    }

    // Bandpass crop: inclusive slice of bins and the frequency axis
    if settings.use_bandpass {
        let lo = nearest_bin(&freqs, settings.bandpass_range.0 as f32);
        let hi = nearest_bin(&freqs, settings.bandpass_range.1 as f32);
        let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
        db = db[lo * frames..(hi + 1) * frames].to_vec();
        freqs = freqs[lo..=hi].to_vec();
    }

    let bins = freqs.len();
    let freq_range = (
        f64::from(*freqs.first().unwrap_or(&0.0)),
        f64::from(*freqs.last().unwrap_or(&0.0)),
    );

    // Map dB to [0,1] intensity, clipped to the configured range
    let (lo, hi) = (settings.db_range.0 as f32, settings.db_range.1 as f32);
    let span = hi - lo;
    let intensity: Vec<f32> = db
        .iter()
        .map(|&v| ((v.max(lo).min(hi)) - lo) / span)
        .collect();

    // Build the image top-down: row 0 = highest frequency bin
    let cmap = resolve_colormap(&settings.colormap);
    let channels = settings.channels as usize;
    let mut pixels = vec![0.0f32; bins * frames * channels];
    for row in 0..bins {
        let bin = bins - 1 - row;
        for frame in 0..frames {
            let t = intensity[bin * frames + frame];
            let rgb = cmap.map(t);
            let base = (row * frames + frame) * channels;
            if channels == 1 {
                // RGB to greyscale by channel averaging
                pixels[base] = (rgb[0] + rgb[1] + rgb[2]) / 3.0;
            } else {
                pixels[base] = rgb[0];
                pixels[base + 1] = rgb[1];
                pixels[base + 2] = rgb[2];
            }
        }
    }

    let (mut width, mut height) = (frames as u32, bins as u32);
    if let Some((target_w, target_h)) = settings.resize {
        pixels = resize_bilinear(&pixels, width, height, channels, target_w, target_h);
        width = target_w;
        height = target_h;
    }

    let data = pixels
        .iter()
        .map(|&v| (v * 255.0).round().clamp(0.0, 255.0) as u8)
        .collect();

    (
        ImageArray {
            data,
            width,
            height,
            channels: settings.channels,
        },
        freq_range,
    )
}

/// Index of the frequency bin nearest `target` Hz
fn nearest_bin(freqs: &[f32], target: f32) -> usize {
    let mut best = 0;
    let mut best_dist = f32::INFINITY;
    for (i, &f) in freqs.iter().enumerate() {
        let d = (f - target).abs();
        if d < best_dist {
            best_dist = d;
            best = i;
        }
    }
    best
}

/// Resolve a palette name; unknown names degrade to inverted greyscale
/// rather than failing the render.
fn resolve_colormap(name: &str) -> Colormap {
    Colormap::parse(name).unwrap_or_else(|| {
        warn!("Unknown colormap '{}', falling back to greys_r", name);
        Colormap::GreysR
    })
}

/// Bilinear resize of a channel-interleaved float image.
///
/// Width and height are interpolated independently; the channel axis is
/// never interpolated across.
fn resize_bilinear(
    src: &[f32],
    src_w: u32,
    src_h: u32,
    channels: usize,
    dst_w: u32,
    dst_h: u32,
) -> Vec<f32> {
    let (src_w, src_h) = (src_w as usize, src_h as usize);
    let (dst_w, dst_h) = (dst_w as usize, dst_h as usize);
    let mut dst = vec![0.0f32; dst_w * dst_h * channels];

    let x_scale = if dst_w > 1 { (src_w - 1) as f32 / (dst_w - 1) as f32 } else { 0.0 };
    let y_scale = if dst_h > 1 { (src_h - 1) as f32 / (dst_h - 1) as f32 } else { 0.0 };

    for y in 0..dst_h {
        let sy = y as f32 * y_scale;
        let y0 = sy.floor() as usize;
        let y1 = (y0 + 1).min(src_h - 1);
        let fy = sy - y0 as f32;

        for x in 0..dst_w {
            let sx = x as f32 * x_scale;
            let x0 = sx.floor() as usize;
            let x1 = (x0 + 1).min(src_w - 1);
            let fx = sx - x0 as f32;

            for c in 0..channels {
                let p00 = src[(y0 * src_w + x0) * channels + c];
                let p01 = src[(y0 * src_w + x1) * channels + c];
                let p10 = src[(y1 * src_w + x0) * channels + c];
                let p11 = src[(y1 * src_w + x1) * channels + c];
                let top = p00 + (p01 - p00) * fx;
                let bottom = p10 + (p11 - p10) * fx;
                dst[(y * dst_w + x) * channels + c] = top + (bottom - top) * fy;
            }
        }
    }

    dst
}
