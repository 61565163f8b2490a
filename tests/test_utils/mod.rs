#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};

use upscalr::config::{AudioFormat, UpscaleConfig};
use upscalr::core::{Signal, SignalReader, SignalWriter};
use upscalr::error::{UpscaleError, UpscaleResult};

/// Sine tone of `frames` samples
pub fn sine(sample_rate: u32, freq: f32, amplitude: f32, frames: usize) -> Vec<f32> {
    (0..frames)
        .map(|i| amplitude * (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate as f32).sin())
        .collect()
}

pub fn peak(samples: &[f32]) -> f32 {
    samples.iter().fold(0.0f32, |m, s| m.max(s.abs()))
}

/// Job configuration with few reconstruction iterations to keep tests fast
pub fn fast_config(target: AudioFormat) -> UpscaleConfig {
    let mut config = UpscaleConfig::new("input.wav", format!("output.{}", target), AudioFormat::Wav, target);
    config.max_iterations = 8;
    config
}

/// Reader serving a fixed signal and counting calls
pub struct MemoryReader {
    signal: Signal,
    reads: Cell<usize>,
}

impl MemoryReader {
    pub fn new(signal: Signal) -> Self {
        Self {
            signal,
            reads: Cell::new(0),
        }
    }

    pub fn reads(&self) -> usize {
        self.reads.get()
    }
}

impl SignalReader for MemoryReader {
    fn read(&self, _path: &Path, _format: AudioFormat) -> UpscaleResult<Signal> {
        self.reads.set(self.reads.get() + 1);
        Ok(self.signal.clone())
    }
}

/// What a [`MemoryWriter`] was asked to write
#[derive(Debug, Clone)]
pub struct Written {
    pub path: PathBuf,
    pub signal: Signal,
    pub format: AudioFormat,
    pub atomic: bool,
}

/// Writer keeping the last written signal in memory
#[derive(Default)]
pub struct MemoryWriter {
    written: RefCell<Option<Written>>,
}

impl MemoryWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn written(&self) -> Option<Written> {
        self.written.borrow().clone()
    }
}

impl SignalWriter for MemoryWriter {
    fn write(&self, path: &Path, signal: &Signal, format: AudioFormat, atomic: bool) -> UpscaleResult<()> {
        *self.written.borrow_mut() = Some(Written {
            path: path.to_path_buf(),
            signal: signal.clone(),
            format,
            atomic,
        });
        Ok(())
    }
}

/// Writer that always fails
pub struct FailingWriter;

impl SignalWriter for FailingWriter {
    fn write(&self, _path: &Path, _signal: &Signal, _format: AudioFormat, _atomic: bool) -> UpscaleResult<()> {
        Err(UpscaleError::Encode("disk full".to_string()))
    }
}
