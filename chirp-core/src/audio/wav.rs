//! In-memory WAV encoding
//!
//! The audio window travels to the UI as a WAV payload. 32-bit float samples
//! keep the (possibly normalized) window bit-exact, so a cache hit and a
//! fresh render are indistinguishable.

use crate::error::{Error, Result};
use std::io::Cursor;

/// Encode mono f32 samples as an in-memory 32-bit float WAV file
pub fn encode_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)
            .map_err(|e| Error::Internal(format!("WAV encode failed: {}", e)))?;
        for &s in samples {
            writer
                .write_sample(s)
                .map_err(|e| Error::Internal(format!("WAV encode failed: {}", e)))?;
        }
        writer
            .finalize()
            .map_err(|e| Error::Internal(format!("WAV encode failed: {}", e)))?;
    }

    Ok(cursor.into_inner())
}
