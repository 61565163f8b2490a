// src/config/format.rs
//
// Closed set of audio container formats understood at the job boundary.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::UpscaleError;

/// Audio container format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    Mp3,
    Wav,
    Flac,
    Ogg,
}

impl AudioFormat {
    pub fn all() -> [Self; 4] {
        [Self::Mp3, Self::Wav, Self::Flac, Self::Ogg]
    }

    /// File extension, also used as the decoder probe hint
    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Wav => "wav",
            AudioFormat::Flac => "flac",
            AudioFormat::Ogg => "ogg",
        }
    }

    /// Codec carried by the container
    pub fn codec_name(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "MPEG-1 Layer III",
            AudioFormat::Wav => "PCM",
            AudioFormat::Flac => "FLAC",
            AudioFormat::Ogg => "Vorbis",
        }
    }

    pub fn is_lossless(&self) -> bool {
        matches!(self, AudioFormat::Wav | AudioFormat::Flac)
    }

    /// Valid target bitrate range in kbps, or None if the format can't be written
    pub fn target_bitrate_range(&self) -> Option<(u32, u32)> {
        match self {
            AudioFormat::Flac => Some((800, 1411)),
            AudioFormat::Wav => Some((800, 6444)),
            AudioFormat::Mp3 | AudioFormat::Ogg => None,
        }
    }

    /// Infer the format from a file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(|e| e.parse().ok())
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extension())
    }
}

impl FromStr for AudioFormat {
    type Err = UpscaleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mp3" => Ok(AudioFormat::Mp3),
            "wav" | "wave" => Ok(AudioFormat::Wav),
            "flac" => Ok(AudioFormat::Flac),
            "ogg" | "oga" => Ok(AudioFormat::Ogg),
            other => Err(UpscaleError::UnsupportedFormat(other.to_string())),
        }
    }
}
