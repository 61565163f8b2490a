//! Peak normalization and autoscaling

use rayon::prelude::*;

use crate::core::device::{Device, DeviceBuffer};
use crate::error::{UpscaleError, UpscaleResult};

/// Largest absolute sample value (0.0 for an empty slice)
pub fn peak(samples: &[f32]) -> f32 {
    samples
        .par_iter()
        .map(|s| s.abs())
        .reduce(|| 0.0, f32::max)
}

/// Divide every sample by the peak so the result peaks at 1.0
pub fn normalize_in_place(samples: &mut [f32]) -> UpscaleResult<()> {
    let max = peak(samples);
    if samples.is_empty() || max == 0.0 {
        return Err(UpscaleError::EmptySignal);
    }
    samples.par_iter_mut().for_each(|s| *s /= max);
    Ok(())
}

/// Normalize a device buffer, taking ownership of it
pub fn normalize(device: &Device, mut buffer: DeviceBuffer) -> UpscaleResult<DeviceBuffer> {
    device.run(|| normalize_in_place(&mut buffer))?;
    Ok(buffer)
}

/// Normalize, then rescale to `reference_peak`.
///
/// `reference_peak` is the peak of the channel before interpolation, which
/// restores the physical amplitude lost by normalization.
pub fn autoscale(
    device: &Device,
    mut buffer: DeviceBuffer,
    reference_peak: f32,
) -> UpscaleResult<DeviceBuffer> {
    device.run(|| {
        normalize_in_place(&mut buffer)?;
        buffer.par_iter_mut().for_each(|s| *s *= reference_peak);
        Ok::<_, UpscaleError>(())
    })?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peak() {
        assert_eq!(peak(&[0.1, -0.7, 0.3]), 0.7);
        assert_eq!(peak(&[]), 0.0);
    }

    #[test]
    fn test_normalize_peaks_at_one() {
        let device = Device::new().unwrap();
        let buffer = device.upload(&[0.25, -0.5, 0.125]).unwrap();
        let out = normalize(&device, buffer).unwrap();
        assert_eq!(&out[..], &[0.5, -1.0, 0.25]);
        assert!((peak(&out) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_empty_or_silent() {
        let device = Device::new().unwrap();
        let empty = device.acquire(0).unwrap();
        assert!(matches!(normalize(&device, empty), Err(UpscaleError::EmptySignal)));
        let silent = device.acquire(16).unwrap();
        assert!(matches!(normalize(&device, silent), Err(UpscaleError::EmptySignal)));
    }

    #[test]
    fn test_autoscale_restores_reference_peak() {
        let device = Device::new().unwrap();
        let buffer = device.upload(&[2.0, -4.0, 1.0]).unwrap();
        let out = autoscale(&device, buffer, 0.5).unwrap();
        assert!((peak(&out) - 0.5).abs() < 1e-6);
        assert!((out[0] - 0.25).abs() < 1e-6);
    }
}
