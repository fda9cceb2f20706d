//! Audio clip decoding using symphonia
//!
//! Loads a bounded time-window of samples from a source file at its native
//! sample rate, downmixed to mono f32. Seeks to the window start when the
//! container supports it, otherwise decodes from the beginning and discards
//! frames before the window.

use crate::error::{Error, Result};
use std::fs::File;
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, SeekMode, SeekTo};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::units::Time;
use tracing::debug;

/// Mono samples for one decoded clip window
#[derive(Debug)]
pub struct ClipSamples {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

/// Decode `[start_time, end_time)` seconds of `path` to mono f32.
///
/// Fails with `NotFound` if the file is missing, `Io` on read failure, and
/// `Decode` when the container or codec cannot be handled.
pub fn read_clip(path: &Path, start_time: f64, end_time: f64) -> Result<ClipSamples> {
    let file = File::open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::NotFound(path.display().to_string())
        } else {
            Error::Io(e)
        }
    })?;

    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    // Hint from file extension helps the probe pick the right demuxer
    let mut hint = Hint::new();
    if let Some(ext) = path.extension() {
        hint.with_extension(ext.to_str().unwrap_or(""));
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| Error::Decode(format!("{}: unrecognized format: {}", path.display(), e)))?;

    let mut format = probed.format;

    let track = format
        .default_track()
        .ok_or_else(|| Error::Decode(format!("{}: no audio track", path.display())))?;
    let track_id = track.id;
    let codec_params = track.codec_params.clone();

    let sample_rate = codec_params
        .sample_rate
        .ok_or_else(|| Error::Decode(format!("{}: unknown sample rate", path.display())))?;
    let time_base = codec_params.time_base;

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| Error::Decode(format!("{}: unsupported codec: {}", path.display(), e)))?;

    let start_frame = (start_time * sample_rate as f64).round() as u64;
    let end_frame = (end_time * sample_rate as f64).round() as u64;

    // Seek close to the window start; unseekable sources fall back to
    // decoding from zero and skipping
    let mut next_frame: u64 = 0;
    if start_time > 0.0 {
        match format.seek(
            SeekMode::Accurate,
            SeekTo::Time {
                time: Time::from(start_time),
                track_id: Some(track_id),
            },
        ) {
            Ok(seeked) => {
                decoder.reset();
                if let Some(tb) = time_base {
                    let t = tb.calc_time(seeked.actual_ts);
                    next_frame =
                        ((t.seconds as f64 + t.frac) * sample_rate as f64).round() as u64;
                } else {
                    next_frame = seeked.actual_ts;
                }
            }
            Err(e) => {
                debug!("Seek unsupported for {}, decoding from start: {}", path.display(), e);
            }
        }
    }

    // Capacity hint bounded by the track's known length; the requested window
    // is caller input and may be arbitrarily large
    let window_frames = end_frame.saturating_sub(start_frame);
    let hint_frames = match codec_params.n_frames {
        Some(n) => window_frames.min(n),
        None => 0,
    };
    let mut samples = Vec::with_capacity(hint_frames as usize);
    let mut sample_buf: Option<SampleBuffer<f32>> = None;

    loop {
        if next_frame >= end_frame {
            break;
        }

        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break; // EOF
            }
            Err(e) => {
                return Err(Error::Decode(format!("{}: {}", path.display(), e)));
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        // Packet timestamps resync our frame position when available
        if let Some(tb) = time_base {
            let t = tb.calc_time(packet.ts());
            next_frame = ((t.seconds as f64 + t.frac) * sample_rate as f64).round() as u64;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            // Recoverable decode errors (corrupt frame) skip the packet
            Err(SymphoniaError::DecodeError(e)) => {
                debug!("Skipping corrupt packet in {}: {}", path.display(), e);
                continue;
            }
            Err(e) => {
                return Err(Error::Decode(format!("{}: {}", path.display(), e)));
            }
        };

        let spec = *decoded.spec();
        let channels = spec.channels.count().max(1);
        let frames = decoded.frames();

        // (Re)allocate the conversion buffer when a packet needs more room
        let needed = decoded.capacity() as u64;
        if sample_buf
            .as_ref()
            .map(|b| b.capacity() < needed as usize * channels)
            .unwrap_or(true)
        {
            sample_buf = Some(SampleBuffer::<f32>::new(needed, spec));
        }
        let Some(buf) = sample_buf.as_mut() else {
            continue;
        };
        buf.copy_interleaved_ref(decoded);
        let interleaved = buf.samples();

        for frame in 0..frames as u64 {
            let abs = next_frame + frame;
            if abs < start_frame {
                continue;
            }
            if abs >= end_frame {
                break;
            }
            // Downmix to mono by channel averaging
            let base = frame as usize * channels;
            let sum: f32 = interleaved[base..base + channels].iter().sum();
            samples.push(sum / channels as f32);
        }

        next_frame += frames as u64;
    }

    if samples.is_empty() {
        return Err(Error::Decode(format!(
            "{}: no samples in window {:.3}-{:.3}s",
            path.display(),
            start_time,
            end_time
        )));
    }

    debug!(
        "Decoded {} samples at {} Hz from {}",
        samples.len(),
        sample_rate,
        path.display()
    );

    Ok(ClipSamples {
        samples,
        sample_rate,
    })
}
