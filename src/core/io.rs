// src/core/io.rs
//
// Signal boundaries of an upscaling job. The orchestrator only sees these
// traits; the file implementations delegate to the decoder and encoder.

use std::path::Path;

use super::decoder::decode_audio;
use super::encoder::{create_encoder, write_signal};
use super::signal::Signal;
use crate::config::AudioFormat;
use crate::error::UpscaleResult;

/// Source of the signal to upscale
pub trait SignalReader {
    fn read(&self, path: &Path, format: AudioFormat) -> UpscaleResult<Signal>;
}

/// Sink for the upscaled signal
pub trait SignalWriter {
    /// Whether this writer can produce `format`
    fn supports(&self, _format: AudioFormat) -> bool {
        true
    }

    fn write(&self, path: &Path, signal: &Signal, format: AudioFormat, atomic: bool) -> UpscaleResult<()>;
}

/// Decodes audio files with symphonia
#[derive(Debug, Clone, Copy, Default)]
pub struct FileReader;

impl SignalReader for FileReader {
    fn read(&self, path: &Path, format: AudioFormat) -> UpscaleResult<Signal> {
        decode_audio(path, format)
    }
}

/// Encodes WAV (and FLAC with the `flac` feature) files
#[derive(Debug, Clone, Copy, Default)]
pub struct FileWriter;

impl SignalWriter for FileWriter {
    fn supports(&self, format: AudioFormat) -> bool {
        create_encoder(format).is_ok()
    }

    fn write(&self, path: &Path, signal: &Signal, format: AudioFormat, atomic: bool) -> UpscaleResult<()> {
        write_signal(path, signal, format, atomic)
    }
}
