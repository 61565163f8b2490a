// src/core/dsp/reconstruct.rs
//
// Spectral reconstruction by iterative soft-thresholding (IST).
//
// Starting from the gated expanded signal, each round transforms the
// estimate, zeroes weak spectral coefficients, transforms back and adds a
// low-level synthetic harmonic. The final estimate is added to the
// expanded signal.
//
// The input is real, so only the non-negative half of the spectrum is
// computed. Magnitudes are symmetric in a real signal's spectrum, so
// thresholding the half spectrum and running the complex-to-real inverse
// gives the real part of the full inverse transform.

use log::debug;
use num_complex::Complex32;
use rayon::prelude::*;
use realfft::FftError;
use std::f64::consts::PI;

use crate::core::device::{Device, DeviceBuffer};
use crate::error::{UpscaleError, UpscaleResult};

/// Amplitude of the harmonic excitation added every iteration
pub const HARMONIC_AMPLITUDE: f64 = 0.1;

/// Iterative soft-thresholding reconstructor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectralReconstructor {
    max_iterations: usize,
    threshold: f32,
}

impl SpectralReconstructor {
    pub fn new(max_iterations: usize, threshold: f32) -> Self {
        Self {
            max_iterations,
            threshold,
        }
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Return `expanded + estimate` after `max_iterations` rounds.
    ///
    /// Deterministic: the same input and parameters give bit-identical output.
    pub fn reconstruct(&self, device: &Device, expanded: &[f32]) -> UpscaleResult<DeviceBuffer> {
        let mut estimate = self.estimate(device, expanded)?;
        device.run(|| {
            estimate
                .par_iter_mut()
                .zip(expanded.par_iter())
                .for_each(|(d, &x)| *d += x);
        });
        Ok(estimate)
    }

    /// Thresholded estimate alone, without the expanded signal added back
    pub fn estimate(&self, device: &Device, expanded: &[f32]) -> UpscaleResult<DeviceBuffer> {
        let n = expanded.len();
        let threshold = self.threshold;

        let mut estimate = device.acquire(n)?;
        device.run(|| {
            estimate
                .par_iter_mut()
                .zip(expanded.par_iter())
                .for_each(|(d, &x)| *d = if x.abs() > threshold { x } else { 0.0 });
        });
        if n == 0 || self.max_iterations == 0 {
            return Ok(estimate);
        }

        let harmonic = harmonic(device, n)?;
        let plans = device.real_fft(n);
        let mut spectrum = device.acquire::<Complex32>(n / 2 + 1)?;
        let mut scratch = device.acquire::<Complex32>(
            plans
                .forward
                .get_scratch_len()
                .max(plans.inverse.get_scratch_len()),
        )?;
        let scale = 1.0 / n as f32;

        debug!(
            "IST: {} samples, {} iterations, threshold {}",
            n, self.max_iterations, threshold
        );

        for _ in 0..self.max_iterations {
            let forward_len = plans.forward.get_scratch_len();
            plans
                .forward
                .process_with_scratch(&mut estimate, &mut spectrum, &mut scratch[..forward_len])
                .map_err(fft_error)?;

            device.run(|| {
                spectrum.par_iter_mut().for_each(|c| {
                    if c.norm() <= threshold {
                        *c = Complex32::new(0.0, 0.0);
                    }
                });
            });

            let inverse_len = plans.inverse.get_scratch_len();
            match plans
                .inverse
                .process_with_scratch(&mut spectrum, &mut estimate, &mut scratch[..inverse_len])
            {
                // Non-zero imaginary parts at DC/Nyquist are ignored, which is
                // the real part of the full inverse
                Ok(()) | Err(FftError::InputValues(..)) => {}
                Err(e) => return Err(fft_error(e)),
            }

            device.run(|| {
                estimate
                    .par_iter_mut()
                    .zip(harmonic.par_iter())
                    .for_each(|(d, &h)| *d = *d * scale + h);
            });
        }

        Ok(estimate)
    }
}

/// `0.1 * sin(linspace(0, 2π, n))`
fn harmonic(device: &Device, n: usize) -> UpscaleResult<DeviceBuffer> {
    let mut out = device.acquire(n)?;
    let step = if n > 1 { 2.0 * PI / (n - 1) as f64 } else { 0.0 };
    device.run(|| {
        out.par_iter_mut().enumerate().for_each(|(i, h)| {
            *h = (HARMONIC_AMPLITUDE * (i as f64 * step).sin()) as f32;
        });
    });
    Ok(out)
}

fn fft_error(e: FftError) -> UpscaleError {
    UpscaleError::Resource(format!("FFT failed: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::dsp::interpolate::interpolate;

    fn sine(len: usize, amplitude: f32, cycles: f32) -> Vec<f32> {
        (0..len)
            .map(|i| amplitude * (2.0 * std::f32::consts::PI * cycles * i as f32 / len as f32).sin())
            .collect()
    }

    #[test]
    fn test_deterministic() {
        let device = Device::new().unwrap();
        let input = sine(4410, 0.8, 7.0);
        let expanded = interpolate(&device, &input, 2).unwrap();
        let ist = SpectralReconstructor::new(25, 0.6);

        let a = ist.reconstruct(&device, &expanded).unwrap().into_host();
        let b = ist.reconstruct(&device, &expanded).unwrap().into_host();
        assert_eq!(a.len(), expanded.len());
        assert!(a.iter().zip(b.iter()).all(|(x, y)| x.to_bits() == y.to_bits()));
    }

    #[test]
    fn test_output_is_expanded_plus_estimate() {
        let device = Device::new().unwrap();
        let input = sine(1000, 0.9, 3.0);
        let ist = SpectralReconstructor::new(5, 0.6);

        let estimate = ist.estimate(&device, &input).unwrap();
        let output = ist.reconstruct(&device, &input).unwrap();
        for ((&o, &e), &x) in output.iter().zip(estimate.iter()).zip(input.iter()) {
            assert!((o - (e + x)).abs() < 1e-6);
        }
    }

    #[test]
    fn test_zero_iterations_is_hard_gate() {
        let device = Device::new().unwrap();
        let ist = SpectralReconstructor::new(0, 0.5);
        let estimate = ist.estimate(&device, &[0.2, -0.7, 0.5, 0.9]).unwrap();
        assert_eq!(&estimate[..], &[0.0, -0.7, 0.0, 0.9]);
    }

    #[test]
    fn test_quiet_input_converges_to_harmonic() {
        // Every sample is below the gate, so the estimate starts at zero and
        // only the harmonic excitation survives thresholding.
        let device = Device::new().unwrap();
        let n = 512;
        let input = sine(n, 0.1, 4.0);
        let ist = SpectralReconstructor::new(1, 0.6);
        let estimate = ist.estimate(&device, &input).unwrap();

        let step = 2.0 * std::f64::consts::PI / (n - 1) as f64;
        for (i, &e) in estimate.iter().enumerate() {
            let expected = (0.1 * (i as f64 * step).sin()) as f32;
            assert!((e - expected).abs() < 1e-6, "sample {}: {} vs {}", i, e, expected);
        }
    }

    #[test]
    fn test_empty_input() {
        let device = Device::new().unwrap();
        let out = SpectralReconstructor::new(10, 0.6).reconstruct(&device, &[]).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_odd_length() {
        let device = Device::new().unwrap();
        let input = sine(999, 0.9, 5.0);
        let out = SpectralReconstructor::new(3, 0.6).reconstruct(&device, &input).unwrap();
        assert_eq!(out.len(), 999);
        assert!(out.iter().all(|s| s.is_finite()));
    }
}
