//! Short-time Fourier transform
//!
//! Hann-windowed STFT producing a power spectrogram indexed by
//! (frequency bin, time frame). FFT plans and window tables are cached
//! per-thread so repeated renders with the same frame length reuse them.

use realfft::RealFftPlanner;
use std::cell::RefCell;
use std::collections::HashMap;

thread_local! {
    static FFT_PLANNER: RefCell<RealFftPlanner<f32>> = RefCell::new(RealFftPlanner::new());
    static HANN_CACHE: RefCell<HashMap<usize, Vec<f32>>> = RefCell::new(HashMap::new());
}

fn hann_window(size: usize) -> Vec<f32> {
    HANN_CACHE.with(|cache| {
        cache
            .borrow_mut()
            .entry(size)
            .or_insert_with(|| {
                (0..size)
                    .map(|i| {
                        0.5 * (1.0
                            - (2.0 * std::f32::consts::PI * i as f32 / (size - 1) as f32).cos())
                    })
                    .collect()
            })
            .clone()
    })
}

/// Power spectrogram in bin-major layout: `power[bin * frames + frame]`.
///
/// Row 0 is the DC bin; callers flip for display. `freqs` holds the center
/// frequency of each bin in Hz.
pub struct PowerSpectrogram {
    pub power: Vec<f32>,
    pub bins: usize,
    pub frames: usize,
    pub freqs: Vec<f32>,
}

/// Compute a Hann-windowed power spectrogram.
///
/// Frames advance by `hop_size` samples; input shorter than one frame is
/// zero-padded so the result always has at least one time frame.
pub fn power_spectrogram(
    samples: &[f32],
    sample_rate: u32,
    window_size: usize,
    hop_size: usize,
) -> PowerSpectrogram {
    let hop_size = hop_size.max(1);
    let bins = window_size / 2 + 1;

    // Zero-pad inputs shorter than a single frame
    let padded;
    let samples = if samples.len() < window_size {
        padded = {
            let mut v = samples.to_vec();
            v.resize(window_size, 0.0);
            v
        };
        &padded[..]
    } else {
        samples
    };

    let fft = FFT_PLANNER.with(|p| p.borrow_mut().plan_fft_forward(window_size));
    let window = hann_window(window_size);

    // Pre-allocate FFT buffers once and reuse across frames
    let mut input = fft.make_input_vec();
    let mut spectrum = fft.make_output_vec();

    let frames = (samples.len() - window_size) / hop_size + 1;
    let mut power = vec![0.0f32; bins * frames];

    for frame in 0..frames {
        let pos = frame * hop_size;
        for (inp, (&s, &w)) in input
            .iter_mut()
            .zip(samples[pos..pos + window_size].iter().zip(window.iter()))
        {
            *inp = s * w;
        }

        // realfft only fails on length mismatch, which the buffers rule out
        if fft.process(&mut input, &mut spectrum).is_err() {
            continue;
        }

        for (bin, c) in spectrum.iter().enumerate() {
            power[bin * frames + frame] = c.norm_sqr();
        }
    }

    let freq_resolution = sample_rate as f32 / window_size as f32;
    let freqs = (0..bins).map(|bin| bin as f32 * freq_resolution).collect();

    PowerSpectrogram {
        power,
        bins,
        frames,
        freqs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f64, sample_rate: u32, count: usize) -> Vec<f32> {
        (0..count)
            .map(|i| {
                let t = i as f64 / sample_rate as f64;
                (2.0 * std::f64::consts::PI * freq * t).sin() as f32
            })
            .collect()
    }

    #[test]
    fn peak_bin_matches_tone_frequency() {
        let sample_rate = 44100u32;
        let freq = 1000.0f64;
        let samples = sine(freq, sample_rate, 4096);

        let spec = power_spectrogram(&samples, sample_rate, 1024, 512);
        assert!(spec.frames > 1);
        assert_eq!(spec.bins, 513);

        // Skip the first frame (edge effects); peak should land near 1000 Hz
        let frame = 1;
        let peak_bin = (0..spec.bins)
            .max_by(|&a, &b| {
                spec.power[a * spec.frames + frame]
                    .partial_cmp(&spec.power[b * spec.frames + frame])
                    .unwrap()
            })
            .unwrap();
        let freq_resolution = sample_rate as f64 / 1024.0;
        let peak_freq = peak_bin as f64 * freq_resolution;
        assert!(
            (peak_freq - freq).abs() < freq_resolution * 2.0,
            "Peak at {peak_freq} Hz, expected ~{freq} Hz"
        );
    }

    #[test]
    fn short_input_is_padded_to_one_frame() {
        let spec = power_spectrogram(&[0.1f32; 100], 22050, 512, 256);
        assert_eq!(spec.frames, 1);
        assert_eq!(spec.bins, 257);
    }

    #[test]
    fn frequency_axis_spans_zero_to_nyquist() {
        let samples = sine(440.0, 22050, 2048);
        let spec = power_spectrogram(&samples, 22050, 512, 256);
        assert_eq!(spec.freqs[0], 0.0);
        let last = *spec.freqs.last().unwrap();
        assert!((last - 11025.0).abs() < 1e-3, "Nyquist bin at {last} Hz");
    }
}
