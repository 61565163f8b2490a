// src/core/upscaler.rs
//
// Job orchestration: validate, read, split channels, run each channel through
// the pipeline, reassemble and write. The whole job runs inside one
// ResourceScope and each channel inside a nested one.

use log::{debug, info};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;

use super::device::Device;
use super::io::{FileReader, FileWriter, SignalReader, SignalWriter};
use super::pipeline::ChannelPipeline;
use super::signal::{ChannelSummary, Signal};
use crate::config::{AudioFormat, UpscaleConfig};
use crate::error::{UpscaleError, UpscaleResult};

/// Summary of a completed upscaling job
#[derive(Debug, Clone, Serialize)]
pub struct UpscaleReport {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub source_format: AudioFormat,
    pub target_format: AudioFormat,
    pub input_sample_rate: u32,
    pub output_sample_rate: u32,
    pub factor: u32,
    pub source_bitrate: Option<u32>,
    pub channels: usize,
    pub input_frames: usize,
    pub output_frames: usize,
    pub channel_summaries: Vec<ChannelSummary>,
    pub peak_device_bytes: usize,
    pub elapsed_secs: f64,
}

/// Upscaled signal with the factor that produced it
#[derive(Debug, Clone)]
pub struct UpscaledSignal {
    pub signal: Signal,
    pub factor: u32,
    pub channel_summaries: Vec<ChannelSummary>,
}

/// Runs upscaling jobs on a device
pub struct Upscaler<'d, R = FileReader, W = FileWriter> {
    device: &'d Device,
    reader: R,
    writer: W,
}

impl<'d> Upscaler<'d> {
    pub fn new(device: &'d Device) -> Self {
        Self::with_io(device, FileReader, FileWriter)
    }
}

impl<'d, R: SignalReader, W: SignalWriter> Upscaler<'d, R, W> {
    pub fn with_io(device: &'d Device, reader: R, writer: W) -> Self {
        Self { device, reader, writer }
    }

    pub fn device(&self) -> &Device {
        self.device
    }

    pub fn reader(&self) -> &R {
        &self.reader
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }

    /// Run a full job from `config.input_path` to `config.output_path`.
    ///
    /// The configuration, and the writer's support for the target format,
    /// are checked before anything is read or allocated.
    pub fn upscale(&self, config: &UpscaleConfig) -> UpscaleResult<UpscaleReport> {
        config.validate()?;
        if !self.writer.supports(config.target_format) {
            return Err(UpscaleError::UnsupportedFormat(format!(
                "this build cannot write {} output",
                config.target_format
            )));
        }
        let started = Instant::now();

        info!("Reading {} ({})", config.input_path.display(), config.source_format);
        let source = self.reader.read(&config.input_path, config.source_format)?;

        let upscaled = self.process(config, &source)?;

        info!(
            "Writing {} ({}, {} Hz)",
            config.output_path.display(),
            config.target_format,
            upscaled.signal.sample_rate()
        );
        self.writer.write(
            &config.output_path,
            &upscaled.signal,
            config.target_format,
            config.atomic_write,
        )?;

        let report = UpscaleReport {
            input_path: config.input_path.clone(),
            output_path: config.output_path.clone(),
            source_format: config.source_format,
            target_format: config.target_format,
            input_sample_rate: source.sample_rate(),
            output_sample_rate: upscaled.signal.sample_rate(),
            factor: upscaled.factor,
            source_bitrate: source.bitrate(),
            channels: source.channel_count(),
            input_frames: source.frames(),
            output_frames: upscaled.signal.frames(),
            channel_summaries: upscaled.channel_summaries,
            peak_device_bytes: self.device.memory_usage().peak_bytes,
            elapsed_secs: started.elapsed().as_secs_f64(),
        };

        info!("Upscaling finished in {:.2}s", report.elapsed_secs);
        Ok(report)
    }

    /// Upscale an in-memory signal without touching the reader or writer
    pub fn upscale_signal(&self, config: &UpscaleConfig, source: &Signal) -> UpscaleResult<UpscaledSignal> {
        config.validate()?;
        self.process(config, source)
    }

    fn process(&self, config: &UpscaleConfig, source: &Signal) -> UpscaleResult<UpscaledSignal> {
        let factor = config.upscale_factor(source.bitrate())?;
        let output_rate = source.sample_rate().checked_mul(factor).ok_or_else(|| {
            UpscaleError::Configuration(format!(
                "output sample rate {} Hz x {} overflows",
                source.sample_rate(),
                factor
            ))
        })?;

        info!(
            "Upscale factor {} (source bitrate {:?}, target {} kbps): {} Hz -> {} Hz",
            factor,
            source.bitrate(),
            config.target_bitrate_kbps,
            source.sample_rate(),
            output_rate
        );

        let pipeline = ChannelPipeline::new(config, factor);
        let (channels, channel_summaries) = self.device.scoped("job", |device| {
            let mut channels = Vec::with_capacity(source.channel_count());
            let mut summaries = Vec::with_capacity(source.channel_count());

            for view in source.channels() {
                let index = view.index();
                let output = pipeline.process(device, index, &view.to_vec())?;
                debug!(
                    "channel {}: {:?} in {:.2}s",
                    index,
                    output.stages,
                    output.elapsed_secs
                );
                summaries.push(ChannelSummary {
                    index,
                    input_peak: output.input_peak,
                    output_peak: output.output_peak,
                    elapsed_secs: output.elapsed_secs,
                });
                channels.push(output.samples);
            }

            Ok::<_, UpscaleError>((channels, summaries))
        })?;

        let signal = Signal::from_channels(output_rate, channels, None)?;
        Ok(UpscaledSignal {
            signal,
            factor,
            channel_summaries,
        })
    }
}

/// Run one job on a freshly created device with default options
pub fn upscale(config: &UpscaleConfig) -> UpscaleResult<UpscaleReport> {
    config.validate()?;
    let device = Device::new()?;
    Upscaler::new(&device).upscale(config)
}
