// src/core/dsp/lms.rs
//
// Block least-mean-squares adaptive filter.
//
// Tap weights are updated once per block of `block_size` samples. The
// weights are an explicit FilterState value folded over the blocks of one
// channel; nothing carries over between channels.
//
// Boundaries: filtering starts at offset `num_taps`, so the first
// `num_taps` output samples are zero. Samples after the last complete block
// are not filtered and are also zero.

use rayon::prelude::*;

use crate::config::FilterConfig;
use crate::core::device::{Device, DeviceBuffer};
use crate::error::{UpscaleError, UpscaleResult};

/// Default chunk length for the chunked filter
pub const DEFAULT_CHUNK_SIZE: usize = 1_000_000;

/// Tap weights of the adaptive filter
#[derive(Debug, Clone, PartialEq)]
pub struct FilterState {
    weights: Vec<f32>,
}

impl FilterState {
    pub fn zeros(num_taps: usize) -> Self {
        Self {
            weights: vec![0.0; num_taps],
        }
    }

    pub fn from_weights(weights: Vec<f32>) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    pub fn num_taps(&self) -> usize {
        self.weights.len()
    }
}

/// Block LMS filter parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockLms {
    mu: f32,
    num_taps: usize,
    block_size: usize,
}

impl Default for BlockLms {
    fn default() -> Self {
        Self::from_config(&FilterConfig::default())
    }
}

impl BlockLms {
    pub fn new(mu: f32, num_taps: usize, block_size: usize) -> Self {
        Self {
            mu,
            num_taps,
            block_size,
        }
    }

    pub fn from_config(config: &FilterConfig) -> Self {
        Self::new(config.mu, config.num_taps, config.block_size)
    }

    pub fn num_taps(&self) -> usize {
        self.num_taps
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Number of complete blocks in a signal of `len` samples
    pub fn num_blocks(&self, len: usize) -> usize {
        len.saturating_sub(self.num_taps) / self.block_size
    }

    /// Samples from this index on are past the last complete block
    pub fn filtered_end(&self, len: usize) -> usize {
        (self.num_taps + self.num_blocks(len) * self.block_size).min(len)
    }

    /// One block of the update law.
    ///
    /// `window` holds the `block_size + num_taps - 1` input samples ending at
    /// the last position of the block; `desired` holds the block's reference
    /// samples. Row `k` of the design matrix is
    /// `window[k + num_taps - 1], window[k + num_taps - 2], ..., window[k]`.
    ///
    /// Returns the updated weights and the block prediction `y = X·w`
    /// computed with the weights passed in.
    pub fn update(&self, state: FilterState, window: &[f32], desired: &[f32]) -> (FilterState, Vec<f32>) {
        let taps = state.num_taps();
        let block = desired.len();
        debug_assert_eq!(window.len(), block + taps - 1);

        let weights = state.weights;
        let row = |k: usize, i: usize| window[k + taps - 1 - i];

        let prediction: Vec<f32> = (0..block)
            .into_par_iter()
            .map(|k| (0..taps).map(|i| row(k, i) * weights[i]).sum::<f32>())
            .collect();

        let error: Vec<f32> = desired
            .par_iter()
            .zip(prediction.par_iter())
            .map(|(&d, &y)| d - y)
            .collect();

        let step = (2.0 * self.mu as f64 / self.block_size as f64) as f32;
        let weights: Vec<f32> = weights
            .par_iter()
            .enumerate()
            .map(|(i, &w)| {
                let gradient: f32 = (0..block).map(|k| row(k, i) * error[k]).sum();
                w + step * gradient
            })
            .collect();

        (FilterState { weights }, prediction)
    }

    /// Filter `signal` against `desired`, carrying weights across all blocks
    pub fn filter(&self, device: &Device, signal: &[f32], desired: &[f32]) -> UpscaleResult<DeviceBuffer> {
        let mut output = device.acquire(signal.len())?;
        device.run(|| self.filter_into(signal, desired, &mut output))?;
        Ok(output)
    }

    /// Filter independent chunks of `chunk_size` samples.
    ///
    /// Weights restart from zero in every chunk, so the result differs from
    /// [`BlockLms::filter`] for signals longer than one chunk.
    pub fn filter_chunked(
        &self,
        device: &Device,
        signal: &[f32],
        desired: &[f32],
        chunk_size: usize,
    ) -> UpscaleResult<DeviceBuffer> {
        if chunk_size == 0 {
            return Err(UpscaleError::InvalidInput("chunk size must be positive".to_string()));
        }
        check_lengths(signal, desired)?;

        let mut output = device.acquire(signal.len())?;
        device.run(|| {
            output
                .chunks_mut(chunk_size)
                .zip(signal.chunks(chunk_size).zip(desired.chunks(chunk_size)))
                .try_for_each(|(out, (sig, des))| self.filter_into(sig, des, out))
        })?;
        Ok(output)
    }

    fn filter_into(&self, signal: &[f32], desired: &[f32], output: &mut [f32]) -> UpscaleResult<()> {
        check_lengths(signal, desired)?;
        if self.num_taps == 0 || self.block_size == 0 {
            return Err(UpscaleError::InvalidInput(
                "filter taps and block size must be positive".to_string(),
            ));
        }

        let taps = self.num_taps;
        let block = self.block_size;
        (0..self.num_blocks(signal.len())).fold(FilterState::zeros(taps), |state, b| {
            let start = taps + b * block;
            let end = start + block;
            let (state, prediction) =
                self.update(state, &signal[start + 1 - taps..end], &desired[start..end]);
            output[start..end].copy_from_slice(&prediction);
            state
        });
        Ok(())
    }
}

fn check_lengths(signal: &[f32], desired: &[f32]) -> UpscaleResult<()> {
    if signal.len() != desired.len() {
        return Err(UpscaleError::InvalidInput(format!(
            "signal has {} samples but reference has {}",
            signal.len(),
            desired.len()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sine(len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| 0.8 * (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 44100.0).sin())
            .collect()
    }

    #[test]
    fn test_update_law() {
        let lms = BlockLms::new(0.25, 2, 2);
        let (a, b, c) = (1.0, 2.0, 3.0);
        let (d0, d1) = (0.5, -1.0);

        let (state, y) = lms.update(FilterState::zeros(2), &[a, b, c], &[d0, d1]);
        assert_eq!(y, vec![0.0, 0.0]);

        // step = 2 * 0.25 / 2
        let step = 0.25;
        assert_relative_eq!(state.weights()[0], step * (b * d0 + c * d1));
        assert_relative_eq!(state.weights()[1], step * (a * d0 + b * d1));
    }

    #[test]
    fn test_update_predicts_with_incoming_weights() {
        let lms = BlockLms::new(0.0, 2, 2);
        let state = FilterState::from_weights(vec![1.0, 0.5]);
        let (next, y) = lms.update(state.clone(), &[1.0, 2.0, 3.0], &[0.0, 0.0]);
        assert_eq!(y, vec![2.0 + 0.5, 3.0 + 1.0]);
        // mu = 0 leaves the weights unchanged
        assert_eq!(next, state);
    }

    #[test]
    fn test_boundaries_are_zero() {
        let device = Device::new().unwrap();
        let lms = BlockLms::new(0.001, 32, 256);
        let signal = sine(32 + 256 * 4 + 100);
        let out = lms.filter(&device, &signal, &signal).unwrap();

        assert_eq!(out.len(), signal.len());
        assert!(out[..32].iter().all(|&s| s == 0.0));
        let end = lms.filtered_end(signal.len());
        assert_eq!(end, 32 + 256 * 4);
        assert!(out[end..].iter().all(|&s| s == 0.0));
        // First block predicts with zero weights
        assert!(out[32..32 + 256].iter().all(|&s| s == 0.0));
        assert!(out[32 + 256..end].iter().any(|&s| s != 0.0));
    }

    #[test]
    fn test_adapts_toward_signal() {
        let device = Device::new().unwrap();
        let lms = BlockLms::new(0.05, 8, 128);
        let signal = sine(8 + 128 * 200);
        let out = lms.filter(&device, &signal, &signal).unwrap();

        let last = lms.filtered_end(signal.len()) - 128;
        let error: f32 = out[last..last + 128]
            .iter()
            .zip(&signal[last..last + 128])
            .map(|(y, d)| (d - y).powi(2))
            .sum::<f32>()
            / 128.0;
        let power: f32 = signal[last..last + 128].iter().map(|d| d * d).sum::<f32>() / 128.0;
        assert!(error < power * 0.5, "error {} vs power {}", error, power);
    }

    #[test]
    fn test_short_signal_untouched() {
        let device = Device::new().unwrap();
        let lms = BlockLms::default();
        let signal = sine(100);
        let out = lms.filter(&device, &signal, &signal).unwrap();
        assert_eq!(out.len(), 100);
        assert!(out.iter().all(|&s| s == 0.0));
        assert_eq!(lms.filtered_end(10), 10);
    }

    #[test]
    fn test_chunked_restarts_weights() {
        let device = Device::new().unwrap();
        let lms = BlockLms::new(0.01, 4, 64);
        let signal = sine(4 + 64 * 20);

        let chunk = 4 + 64 * 10;
        let chunked = lms.filter_chunked(&device, &signal, &signal, chunk).unwrap();
        let second = lms.filter(&device, &signal[chunk..], &signal[chunk..]).unwrap();
        assert_eq!(&chunked[chunk..], &second[..]);

        let whole = lms.filter(&device, &signal, &signal).unwrap();
        assert_ne!(&chunked[..], &whole[..]);
    }

    #[test]
    fn test_single_chunk_matches_unchunked() {
        let device = Device::new().unwrap();
        let lms = BlockLms::new(0.01, 4, 64);
        let signal = sine(1000);
        let chunked = lms.filter_chunked(&device, &signal, &signal, DEFAULT_CHUNK_SIZE).unwrap();
        let whole = lms.filter(&device, &signal, &signal).unwrap();
        assert_eq!(&chunked[..], &whole[..]);
    }

    #[test]
    fn test_length_mismatch() {
        let device = Device::new().unwrap();
        let lms = BlockLms::default();
        assert!(matches!(
            lms.filter(&device, &[0.0; 10], &[0.0; 9]),
            Err(UpscaleError::InvalidInput(_))
        ));
    }
}
