//! Upsampling by sample repetition

use rayon::prelude::*;

use crate::core::device::{Device, DeviceBuffer};
use crate::error::{UpscaleError, UpscaleResult};

/// Repeat every sample `factor` times.
///
/// Output length is `input.len() * factor`; each run of `factor` output
/// samples equals one input sample.
pub fn interpolate(device: &Device, input: &[f32], factor: usize) -> UpscaleResult<DeviceBuffer> {
    if factor == 0 {
        return Err(UpscaleError::InvalidInput("upscale factor must be at least 1".to_string()));
    }
    let len = input
        .len()
        .checked_mul(factor)
        .ok_or_else(|| UpscaleError::Resource(format!("{} samples x{} overflows", input.len(), factor)))?;

    let mut output = device.acquire(len)?;
    device.run(|| {
        output
            .par_chunks_mut(factor)
            .zip(input.par_iter())
            .for_each(|(run, &sample)| run.fill(sample));
    });
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeats_each_sample() {
        let device = Device::new().unwrap();
        let out = interpolate(&device, &[0.1, -0.2, 0.3], 3).unwrap();
        assert_eq!(&out[..], &[0.1, 0.1, 0.1, -0.2, -0.2, -0.2, 0.3, 0.3, 0.3]);
    }

    #[test]
    fn test_length_property() {
        let device = Device::new().unwrap();
        let input: Vec<f32> = (0..1000).map(|i| (i as f32 * 0.01).sin()).collect();
        for factor in 1..=5 {
            let out = interpolate(&device, &input, factor).unwrap();
            assert_eq!(out.len(), input.len() * factor);
            for (run, &sample) in out.chunks(factor).zip(input.iter()) {
                assert!(run.iter().all(|&s| s == sample));
            }
        }
    }

    #[test]
    fn test_factor_one_is_copy() {
        let device = Device::new().unwrap();
        let out = interpolate(&device, &[1.0, 2.0], 1).unwrap();
        assert_eq!(&out[..], &[1.0, 2.0]);
    }

    #[test]
    fn test_zero_factor_rejected() {
        let device = Device::new().unwrap();
        assert!(interpolate(&device, &[1.0], 0).is_err());
    }
}
