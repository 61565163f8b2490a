// src/core/pipeline.rs
//
// Per-channel processing:
//   Expanded -> Reconstructed -> [Autoscaled] -> [Normalized] -> [Filtered] -> Done
// Optional stages are gated by the job toggles and always run in this order.
// Each channel runs inside its own ResourceScope, so device memory and FFT
// plans are reclaimed before the next channel starts.

use log::debug;
use serde::Serialize;
use std::time::Instant;

use super::device::{Device, DeviceBuffer};
use super::dsp::{self, BlockLms, SpectralReconstructor};
use crate::config::UpscaleConfig;
use crate::error::UpscaleResult;

/// Stage a channel has reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ChannelStage {
    Expanded,
    Reconstructed,
    Autoscaled,
    Normalized,
    Filtered,
    Done,
}

/// Processed channel and the stages it went through
#[derive(Debug, Clone)]
pub struct ChannelOutput {
    pub samples: Vec<f32>,
    pub stages: Vec<ChannelStage>,
    pub input_peak: f32,
    pub output_peak: f32,
    pub elapsed_secs: f64,
}

/// Adaptive filter stage settings
#[derive(Debug, Clone, Copy)]
struct FilterStage {
    lms: BlockLms,
    chunk_size: Option<usize>,
}

/// Channel pipeline built from a validated job configuration
#[derive(Debug, Clone)]
pub struct ChannelPipeline {
    factor: usize,
    reconstructor: SpectralReconstructor,
    autoscale: bool,
    normalize: bool,
    filter: Option<FilterStage>,
}

impl ChannelPipeline {
    pub fn new(config: &UpscaleConfig, factor: u32) -> Self {
        Self {
            factor: factor as usize,
            reconstructor: SpectralReconstructor::new(config.max_iterations, config.threshold_value),
            autoscale: config.autoscale,
            normalize: config.normalize,
            filter: config.adaptive_filter.then(|| FilterStage {
                lms: BlockLms::from_config(&config.filter),
                chunk_size: config.filter.chunk_size,
            }),
        }
    }

    pub fn factor(&self) -> usize {
        self.factor
    }

    /// Run every enabled stage on one channel.
    ///
    /// Device memory is reclaimed when this returns, whether or not a stage
    /// failed.
    pub fn process(&self, device: &Device, index: usize, channel: &[f32]) -> UpscaleResult<ChannelOutput> {
        device.scoped(format!("channel {}", index), |device| self.run_stages(device, index, channel))
    }

    fn run_stages(&self, device: &Device, index: usize, channel: &[f32]) -> UpscaleResult<ChannelOutput> {
        let started = Instant::now();
        let mut stages = Vec::with_capacity(6);

        let source = device.upload(channel)?;
        let input_peak = dsp::peak(&source);

        let expanded = dsp::interpolate(device, &source, self.factor)?;
        device.release(source);
        stages.push(ChannelStage::Expanded);
        debug!("channel {}: expanded to {} samples", index, expanded.len());

        let mut current: DeviceBuffer = self.reconstructor.reconstruct(device, &expanded)?;
        device.release(expanded);
        stages.push(ChannelStage::Reconstructed);
        debug!(
            "channel {}: reconstructed ({} iterations)",
            index,
            self.reconstructor.max_iterations()
        );

        if self.autoscale {
            current = dsp::autoscale(device, current, input_peak)?;
            stages.push(ChannelStage::Autoscaled);
        }

        if self.normalize {
            current = dsp::normalize(device, current)?;
            stages.push(ChannelStage::Normalized);
        }

        if let Some(filter) = self.filter {
            current = match filter.chunk_size {
                Some(chunk_size) => filter.lms.filter_chunked(device, &current, &current, chunk_size)?,
                None => filter.lms.filter(device, &current, &current)?,
            };
            stages.push(ChannelStage::Filtered);
            debug!(
                "channel {}: filtered ({} blocks)",
                index,
                filter.lms.num_blocks(current.len())
            );
        }

        stages.push(ChannelStage::Done);
        let output_peak = dsp::peak(&current);

        Ok(ChannelOutput {
            samples: current.into_host(),
            stages,
            input_peak,
            output_peak,
            elapsed_secs: started.elapsed().as_secs_f64(),
        })
    }
}
