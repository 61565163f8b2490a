//! Audio encoding for upscaled output
//!
//! - WAV (via hound), 32-bit integer PCM
//! - FLAC (via flac-bound, `flac` feature), 24-bit, compression level 1

use log::debug;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use super::signal::Signal;
use crate::config::AudioFormat;
use crate::error::{UpscaleError, UpscaleResult};

/// Encoder producing a complete file image in memory
pub trait AudioEncoder {
    fn encode(&self, signal: &Signal) -> UpscaleResult<Vec<u8>>;

    fn format(&self) -> AudioFormat;
}

/// Scale a float sample to a signed integer of `bits` bits, clipping to [-1, 1]
fn quantize(sample: f32, bits: u32) -> i32 {
    let max = ((1i64 << (bits - 1)) - 1) as f64;
    (sample.clamp(-1.0, 1.0) as f64 * max).round() as i32
}

/// WAV encoder using hound
pub struct WavEncoder {
    bit_depth: u16,
}

impl WavEncoder {
    pub fn new() -> Self {
        Self { bit_depth: 32 }
    }
}

impl Default for WavEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioEncoder for WavEncoder {
    fn encode(&self, signal: &Signal) -> UpscaleResult<Vec<u8>> {
        let mut output = Vec::new();
        let spec = hound::WavSpec {
            channels: signal.channel_count() as u16,
            sample_rate: signal.sample_rate(),
            bits_per_sample: self.bit_depth,
            sample_format: hound::SampleFormat::Int,
        };

        let mut writer = hound::WavWriter::new(Cursor::new(&mut output), spec)?;
        for &sample in signal.samples() {
            writer.write_sample(quantize(sample, self.bit_depth as u32))?;
        }
        writer.finalize()?;

        Ok(output)
    }

    fn format(&self) -> AudioFormat {
        AudioFormat::Wav
    }
}

/// FLAC encoder using flac-bound
#[cfg(feature = "flac")]
pub struct FlacEncoder {
    bit_depth: u32,
    compression_level: u32,
}

#[cfg(feature = "flac")]
impl FlacEncoder {
    pub fn new() -> Self {
        Self {
            bit_depth: 24,
            compression_level: 1,
        }
    }
}

#[cfg(feature = "flac")]
impl Default for FlacEncoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "flac")]
impl AudioEncoder for FlacEncoder {
    fn encode(&self, signal: &Signal) -> UpscaleResult<Vec<u8>> {
        use flac_bound::{FlacEncoder as FlacEnc, WriteWrapper};

        let channels = signal.channel_count();
        let mut output = Vec::new();

        let encoder_config = FlacEnc::new()
            .ok_or_else(|| UpscaleError::Encode("FLAC encoder init failed".to_string()))?
            .channels(channels as u32)
            .sample_rate(signal.sample_rate())
            .bits_per_sample(self.bit_depth)
            .compression_level(self.compression_level);

        let mut wrapper = WriteWrapper(&mut output);
        let mut encoder = encoder_config
            .init_write(&mut wrapper)
            .map_err(|_| UpscaleError::Encode("FLAC stream init failed".to_string()))?;

        let samples: Vec<i32> = signal
            .samples()
            .iter()
            .map(|&s| quantize(s, self.bit_depth))
            .collect();

        const BLOCK_FRAMES: usize = 4096;
        for block in samples.chunks(BLOCK_FRAMES * channels) {
            encoder
                .process_interleaved(block, (block.len() / channels) as u32)
                .map_err(|_| UpscaleError::Encode("FLAC process failed".to_string()))?;
        }

        encoder
            .finish()
            .map_err(|_| UpscaleError::Encode("FLAC finish failed".to_string()))?;

        Ok(output)
    }

    fn format(&self) -> AudioFormat {
        AudioFormat::Flac
    }
}

/// Encoder for a target format
pub fn create_encoder(format: AudioFormat) -> UpscaleResult<Box<dyn AudioEncoder>> {
    match format {
        AudioFormat::Wav => Ok(Box::new(WavEncoder::new())),
        #[cfg(feature = "flac")]
        AudioFormat::Flac => Ok(Box::new(FlacEncoder::new())),
        #[cfg(not(feature = "flac"))]
        AudioFormat::Flac => Err(UpscaleError::UnsupportedFormat(
            "flac output requires the `flac` feature".to_string(),
        )),
        AudioFormat::Mp3 | AudioFormat::Ogg => Err(UpscaleError::UnsupportedFormat(format!(
            "cannot write {} output",
            format
        ))),
    }
}

/// Sibling path used to stage an atomic write
fn staging_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.partial", name))
}

/// Encode `signal` and write it to `path`.
///
/// With `atomic` set the file is staged next to the destination and renamed
/// into place, so a failed write never leaves a truncated output.
pub fn write_signal(path: &Path, signal: &Signal, format: AudioFormat, atomic: bool) -> UpscaleResult<()> {
    let encoder = create_encoder(format)?;
    let bytes = encoder.encode(signal)?;

    if !atomic {
        fs::write(path, &bytes)?;
        return Ok(());
    }

    let staging = staging_path(path);
    let result = fs::write(&staging, &bytes).and_then(|_| fs::rename(&staging, path));
    if let Err(e) = result {
        let _ = fs::remove_file(&staging);
        return Err(e.into());
    }

    debug!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}
