// src/core/scope.rs
//
// Scoped acquisition of device resources. Teardown runs from Drop, so it
// happens on every exit path: normal return, `?` propagation or unwinding.

use log::{debug, warn};
use std::time::Instant;

use super::device::{Device, MemoryUsage};

/// Guard that reclaims device memory and plan caches when dropped
pub struct ResourceScope<'a> {
    device: &'a Device,
    label: String,
    baseline: MemoryUsage,
    started: Instant,
}

impl<'a> ResourceScope<'a> {
    pub fn new(device: &'a Device, label: impl Into<String>) -> Self {
        let label = label.into();
        let baseline = device.memory_usage();
        debug!("[{}] scope entered ({} bytes in use)", label, baseline.used_bytes);
        Self {
            device,
            label,
            baseline,
            started: Instant::now(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Usage recorded when the scope was entered
    pub fn baseline(&self) -> MemoryUsage {
        self.baseline
    }
}

impl Drop for ResourceScope<'_> {
    fn drop(&mut self) {
        self.device.synchronize();
        self.device.reset();

        let usage = self.device.memory_usage();
        if usage.used_bytes > self.baseline.used_bytes {
            warn!(
                "[{}] {} bytes still held by live buffers after scope exit",
                self.label,
                usage.used_bytes - self.baseline.used_bytes
            );
        }
        debug!(
            "[{}] scope released after {:.2}s",
            self.label,
            self.started.elapsed().as_secs_f64()
        );
        self.device.log_usage(&self.label);
    }
}

impl Device {
    /// Run `f` inside a [`ResourceScope`].
    ///
    /// Buffers local to `f` are dropped before the scope tears down; buffers
    /// returned from `f` outlive it.
    pub fn scoped<T, F>(&self, label: impl Into<String>, f: F) -> T
    where
        F: FnOnce(&Device) -> T,
    {
        let _scope = ResourceScope::new(self, label);
        f(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::device::DeviceOptions;
    use crate::error::{UpscaleError, UpscaleResult};

    fn device() -> Device {
        Device::with_options(DeviceOptions {
            threads: Some(2),
            memory_limit: None,
        })
        .unwrap()
    }

    #[test]
    fn test_scope_reclaims_on_success() {
        let device = device();
        let baseline = device.memory_usage();

        let total = device.scoped("ok", |device| -> UpscaleResult<f32> {
            let a = device.upload(&[1.0; 4096])?;
            let _b = device.acquire::<f32>(8192)?;
            device.real_fft(4096);
            Ok(a.iter().sum())
        });

        assert_eq!(total.unwrap(), 4096.0);
        let after = device.memory_usage();
        assert_eq!(after.used_bytes, baseline.used_bytes);
        assert_eq!(after.cached_bytes, 0);
        assert_eq!(after.cached_plans, 0);
    }

    #[test]
    fn test_scope_reclaims_on_failure() {
        let device = device();
        let baseline = device.memory_usage();

        let result = device.scoped("fail", |device| -> UpscaleResult<()> {
            let _held = device.acquire::<f32>(10_000)?;
            device.real_fft(1024);
            Err(UpscaleError::Resource("induced".to_string()))
        });

        assert!(result.is_err());
        let after = device.memory_usage();
        assert_eq!(after.used_bytes, baseline.used_bytes);
        assert_eq!(after.cached_bytes, 0);
        assert_eq!(after.cached_plans, 0);
    }

    #[test]
    fn test_explicit_guard() {
        let device = device();
        {
            let scope = ResourceScope::new(&device, "guard");
            assert_eq!(scope.label(), "guard");
            assert_eq!(scope.baseline().used_bytes, 0);
            drop(device.acquire::<f32>(64).unwrap());
            assert!(device.memory_usage().cached_bytes > 0);
        }
        assert_eq!(device.memory_usage().cached_bytes, 0);
    }
}
