//! upscalr - Upscale audio to a higher sample rate
//!
//! Each channel is expanded by sample repetition, refined with iterative
//! soft-thresholding in the frequency domain and smoothed with a block LMS
//! adaptive filter. Heavy arithmetic runs on a [`core::Device`] whose pooled
//! memory is reclaimed after every channel.
//!
//! ## Pipeline
//!
//! ```text
//! read -> split channels -> interpolate -> reconstruct -> [autoscale]
//!      -> [normalize] -> [adaptive filter] -> reassemble -> write
//! ```
//!
//! ## Module Structure
//!
//! - `core` - Device model, DSP kernels, channel pipeline and orchestration
//! - `cli` - Command-line interface
//! - `config` - Job configuration and audio formats
//! - `error` - Error types
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use upscalr::config::{AudioFormat, UpscaleConfig};
//!
//! let config = UpscaleConfig::builder("song.mp3", "song.wav", AudioFormat::Mp3, AudioFormat::Wav)
//!     .target_bitrate_kbps(1411)
//!     .build()?;
//!
//! let report = upscalr::upscale(&config)?;
//! println!("{} Hz -> {} Hz (x{})", report.input_sample_rate, report.output_sample_rate, report.factor);
//! ```
//!
//! ## Upscale Factor
//!
//! | Source bitrate | Target     | Factor |
//! |----------------|------------|--------|
//! | 128 kbps       | 1411 kbps  | 11     |
//! | 705.6 kbps     | 1411 kbps  | 2      |
//! | unknown        | any        | 4      |

// Core engine
pub mod core;

// Command-line interface
pub mod cli;

// Job configuration and formats
pub mod config;

pub mod error;

// Re-export commonly used types at crate root for convenience
pub use config::{AudioFormat, FilterConfig, UpscaleConfig, UpscaleConfigBuilder};
pub use self::core::{upscale, Device, Signal, UpscaleReport, Upscaler};
pub use error::{UpscaleError, UpscaleResult};
