//! Error types for the upscaling pipeline

use thiserror::Error;

/// Upscaling errors
#[derive(Error, Debug)]
pub enum UpscaleError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Cannot normalize an empty or silent signal")]
    EmptySignal,

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Device resource error: {0}")]
    Resource(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Failed to decode audio: {0}")]
    Decode(String),

    #[error("Failed to encode audio: {0}")]
    Encode(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<symphonia::core::errors::Error> for UpscaleError {
    fn from(e: symphonia::core::errors::Error) -> Self {
        Self::Decode(e.to_string())
    }
}

impl From<hound::Error> for UpscaleError {
    fn from(e: hound::Error) -> Self {
        match e {
            hound::Error::IoError(io) => Self::Io(io),
            other => Self::Encode(other.to_string()),
        }
    }
}

/// Result type for upscaling operations
pub type UpscaleResult<T> = Result<T, UpscaleError>;
