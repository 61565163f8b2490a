//! Configuration module for upscalr

mod format;
mod upscale;

pub use format::AudioFormat;
pub use upscale::{
    compute_factor, FilterConfig, UpscaleConfig, UpscaleConfigBuilder, DEFAULT_UPSCALE_FACTOR,
};
