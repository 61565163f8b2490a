// src/config/upscale.rs
//
// Job configuration: paths, formats, reconstruction and filter parameters.
// Built once per job, validated before any I/O or device allocation.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::format::AudioFormat;
use crate::error::{UpscaleError, UpscaleResult};

/// Upscale factor used when the source bitrate is unknown
pub const DEFAULT_UPSCALE_FACTOR: u32 = 4;

/// Block LMS filter parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Step size
    pub mu: f32,
    /// Number of tap weights
    pub num_taps: usize,
    /// Samples per weight update
    pub block_size: usize,
    /// When set, filter independent chunks of this many samples,
    /// restarting the weights from zero in each chunk
    pub chunk_size: Option<usize>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            mu: 0.001,
            num_taps: 32,
            block_size: 2048,
            chunk_size: None,
        }
    }
}

/// Complete upscaling job configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpscaleConfig {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub source_format: AudioFormat,
    pub target_format: AudioFormat,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    #[serde(default = "default_threshold")]
    pub threshold_value: f32,
    #[serde(default = "default_target_bitrate")]
    pub target_bitrate_kbps: u32,
    #[serde(default = "enabled")]
    pub normalize: bool,
    #[serde(default = "enabled")]
    pub autoscale: bool,
    #[serde(default = "enabled")]
    pub adaptive_filter: bool,
    #[serde(default)]
    pub filter: FilterConfig,
    /// Stage output in a sibling file and rename it into place on success
    #[serde(default = "enabled")]
    pub atomic_write: bool,
}

fn default_max_iterations() -> usize {
    300
}

fn default_threshold() -> f32 {
    0.6
}

fn default_target_bitrate() -> u32 {
    1411
}

fn enabled() -> bool {
    true
}

impl UpscaleConfig {
    /// Create a configuration with default parameters
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(
        input_path: P,
        output_path: Q,
        source_format: AudioFormat,
        target_format: AudioFormat,
    ) -> Self {
        Self {
            input_path: input_path.as_ref().to_path_buf(),
            output_path: output_path.as_ref().to_path_buf(),
            source_format,
            target_format,
            max_iterations: default_max_iterations(),
            threshold_value: default_threshold(),
            target_bitrate_kbps: default_target_bitrate(),
            normalize: true,
            autoscale: true,
            adaptive_filter: true,
            filter: FilterConfig::default(),
            atomic_write: true,
        }
    }

    pub fn builder<P: AsRef<Path>, Q: AsRef<Path>>(
        input_path: P,
        output_path: Q,
        source_format: AudioFormat,
        target_format: AudioFormat,
    ) -> UpscaleConfigBuilder {
        UpscaleConfigBuilder {
            config: Self::new(input_path, output_path, source_format, target_format),
        }
    }

    /// Load a configuration from a JSON file
    pub fn from_json_file(path: &Path) -> UpscaleResult<Self> {
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(|e| {
            UpscaleError::Configuration(format!("{}: {}", path.display(), e))
        })
    }

    /// Check every constraint on the configuration.
    ///
    /// Performs no I/O and touches no device memory.
    pub fn validate(&self) -> UpscaleResult<()> {
        let (min_kbps, max_kbps) = self.target_format.target_bitrate_range().ok_or_else(|| {
            UpscaleError::Configuration(format!(
                "Unsupported output format: {}",
                self.target_format
            ))
        })?;

        if !(min_kbps..=max_kbps).contains(&self.target_bitrate_kbps) {
            return Err(UpscaleError::Configuration(format!(
                "Bitrate {} kbps outside {}-{} kbps for {}",
                self.target_bitrate_kbps, min_kbps, max_kbps, self.target_format
            )));
        }

        if self.max_iterations == 0 {
            return Err(UpscaleError::Configuration(
                "max_iterations must be at least 1".to_string(),
            ));
        }

        if !(self.threshold_value > 0.0 && self.threshold_value <= 1.0) {
            return Err(UpscaleError::Configuration(format!(
                "threshold_value {} outside (0, 1]",
                self.threshold_value
            )));
        }

        let filter = &self.filter;
        if !(filter.mu.is_finite() && filter.mu > 0.0) {
            return Err(UpscaleError::Configuration(format!(
                "Filter step size must be positive, got {}",
                filter.mu
            )));
        }
        if filter.num_taps == 0 || filter.block_size == 0 {
            return Err(UpscaleError::Configuration(
                "Filter taps and block size must be positive".to_string(),
            ));
        }
        if filter.chunk_size == Some(0) {
            return Err(UpscaleError::Configuration(
                "Filter chunk size must be positive".to_string(),
            ));
        }

        Ok(())
    }

    /// Upscale factor for a source with the given bitrate (bits per second)
    pub fn upscale_factor(&self, source_bitrate: Option<u32>) -> UpscaleResult<u32> {
        let factor = compute_factor(source_bitrate, self.target_bitrate_kbps);
        if factor < 1 {
            return Err(UpscaleError::Configuration(format!(
                "Target {} kbps is below the source bitrate {} bps (factor {})",
                self.target_bitrate_kbps,
                source_bitrate.unwrap_or_default(),
                factor
            )));
        }
        Ok(factor)
    }
}

/// Ratio of target to source bitrate, rounded half to even.
///
/// Falls back to [`DEFAULT_UPSCALE_FACTOR`] when the source bitrate is
/// unknown. May return 0; callers reject factors below 1.
pub fn compute_factor(source_bitrate: Option<u32>, target_bitrate_kbps: u32) -> u32 {
    match source_bitrate {
        Some(bps) if bps > 0 => {
            let ratio = target_bitrate_kbps as f64 * 1000.0 / bps as f64;
            ratio.round_ties_even() as u32
        }
        _ => DEFAULT_UPSCALE_FACTOR,
    }
}

/// Fluent builder for [`UpscaleConfig`]
pub struct UpscaleConfigBuilder {
    config: UpscaleConfig,
}

impl UpscaleConfigBuilder {
    pub fn max_iterations(mut self, iterations: usize) -> Self {
        self.config.max_iterations = iterations;
        self
    }

    pub fn threshold(mut self, threshold: f32) -> Self {
        self.config.threshold_value = threshold;
        self
    }

    pub fn target_bitrate_kbps(mut self, kbps: u32) -> Self {
        self.config.target_bitrate_kbps = kbps;
        self
    }

    pub fn normalize(mut self, enabled: bool) -> Self {
        self.config.normalize = enabled;
        self
    }

    pub fn autoscale(mut self, enabled: bool) -> Self {
        self.config.autoscale = enabled;
        self
    }

    pub fn adaptive_filter(mut self, enabled: bool) -> Self {
        self.config.adaptive_filter = enabled;
        self
    }

    pub fn filter(mut self, filter: FilterConfig) -> Self {
        self.config.filter = filter;
        self
    }

    pub fn chunk_size(mut self, chunk_size: Option<usize>) -> Self {
        self.config.filter.chunk_size = chunk_size;
        self
    }

    pub fn atomic_write(mut self, atomic: bool) -> Self {
        self.config.atomic_write = atomic;
        self
    }

    /// Finish building, validating the result
    pub fn build(self) -> UpscaleResult<UpscaleConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
