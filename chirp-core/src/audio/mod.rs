//! Audio decode and encode for clip extraction

pub mod decode;
pub mod wav;

pub use decode::{read_clip, ClipSamples};
pub use wav::encode_wav;
