// src/core/signal.rs
//
// Signal data model: interleaved PCM frames plus per-channel views.

use serde::Serialize;

use crate::error::{UpscaleError, UpscaleResult};

/// Immutable PCM signal.
///
/// Samples are interleaved frames: a stereo signal of N frames is an N×2
/// matrix stored row by row. Stages never reorder samples in time.
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    sample_rate: u32,
    channels: usize,
    samples: Vec<f32>,
    bitrate: Option<u32>,
}

impl Signal {
    pub fn new(
        sample_rate: u32,
        channels: usize,
        samples: Vec<f32>,
        bitrate: Option<u32>,
    ) -> UpscaleResult<Self> {
        if sample_rate == 0 {
            return Err(UpscaleError::InvalidInput("sample rate must be positive".to_string()));
        }
        if !(1..=2).contains(&channels) {
            return Err(UpscaleError::InvalidInput(format!(
                "{} channels not supported (mono or stereo only)",
                channels
            )));
        }
        if samples.len() % channels != 0 {
            return Err(UpscaleError::InvalidInput(format!(
                "{} samples do not form whole {}-channel frames",
                samples.len(),
                channels
            )));
        }

        Ok(Self {
            sample_rate,
            channels,
            samples,
            bitrate,
        })
    }

    pub fn mono(sample_rate: u32, samples: Vec<f32>) -> UpscaleResult<Self> {
        Self::new(sample_rate, 1, samples, None)
    }

    /// Interleave per-channel sample vectors, preserving channel order
    pub fn from_channels(
        sample_rate: u32,
        channels: Vec<Vec<f32>>,
        bitrate: Option<u32>,
    ) -> UpscaleResult<Self> {
        let count = channels.len();
        let frames = channels.first().map(Vec::len).unwrap_or(0);
        if let Some(bad) = channels.iter().find(|c| c.len() != frames) {
            return Err(UpscaleError::InvalidInput(format!(
                "channel length mismatch: {} vs {}",
                bad.len(),
                frames
            )));
        }

        let samples = if count == 1 {
            channels.into_iter().next().unwrap_or_default()
        } else {
            let mut interleaved = Vec::with_capacity(frames * count);
            for frame in 0..frames {
                interleaved.extend(channels.iter().map(|c| c[frame]));
            }
            interleaved
        };

        Self::new(sample_rate, count, samples, bitrate)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channel_count(&self) -> usize {
        self.channels
    }

    /// Source bitrate in bits per second, when known
    pub fn bitrate(&self) -> Option<u32> {
        self.bitrate
    }

    /// Interleaved samples
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels
    }

    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    pub fn channel(&self, index: usize) -> Option<ChannelView<'_>> {
        (index < self.channels).then_some(ChannelView { signal: self, index })
    }

    /// Views of every channel, in channel order
    pub fn channels(&self) -> impl Iterator<Item = ChannelView<'_>> + '_ {
        (0..self.channels).map(move |index| ChannelView { signal: self, index })
    }
}

/// Borrowed view of one channel of a [`Signal`]
#[derive(Debug, Clone, Copy)]
pub struct ChannelView<'a> {
    signal: &'a Signal,
    index: usize,
}

impl<'a> ChannelView<'a> {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.signal.frames()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = f32> + 'a {
        self.signal
            .samples
            .iter()
            .skip(self.index)
            .step_by(self.signal.channels)
            .copied()
    }

    /// De-interleave into a contiguous vector
    pub fn to_vec(&self) -> Vec<f32> {
        if self.signal.channels == 1 {
            return self.signal.samples.clone();
        }
        self.iter().collect()
    }
}

/// Per-channel summary carried in the job report
#[derive(Debug, Clone, Serialize)]
pub struct ChannelSummary {
    pub index: usize,
    pub input_peak: f32,
    pub output_peak: f32,
    pub elapsed_secs: f64,
}
