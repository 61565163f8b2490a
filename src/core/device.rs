// src/core/device.rs
//
// Accelerator model. A Device owns a block-caching memory pool, a cache of
// real FFT plans and a worker pool that runs the data-parallel kernels.
// Pool and plan cache are shared state: every processing scope must leave
// them reclaimed (see ResourceScope).

use log::{debug, info};
use num_complex::Complex32;
use parking_lot::Mutex;
use rayon::{ThreadPool, ThreadPoolBuilder};
use realfft::{ComplexToReal, RealFftPlanner, RealToComplex};
use serde::Serialize;
use std::collections::HashMap;
use std::mem;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use crate::error::{UpscaleError, UpscaleResult};

/// Free blocks held by the pool, one list per element type
#[doc(hidden)]
#[derive(Default)]
pub struct BlockCache {
    real: Vec<Vec<f32>>,
    complex: Vec<Vec<Complex32>>,
}

impl BlockCache {
    fn bytes(&self) -> usize {
        self.real.iter().map(block_bytes).sum::<usize>()
            + self.complex.iter().map(block_bytes).sum::<usize>()
    }

    fn clear(&mut self) {
        self.real.clear();
        self.complex.clear();
    }
}

/// Element types that can live in device memory
pub trait DeviceElement: Copy + Default + Send + Sync + 'static {
    #[doc(hidden)]
    fn free_list(cache: &mut BlockCache) -> &mut Vec<Vec<Self>>;
}

impl DeviceElement for f32 {
    fn free_list(cache: &mut BlockCache) -> &mut Vec<Vec<Self>> {
        &mut cache.real
    }
}

impl DeviceElement for Complex32 {
    fn free_list(cache: &mut BlockCache) -> &mut Vec<Vec<Self>> {
        &mut cache.complex
    }
}

fn block_bytes<T>(block: &Vec<T>) -> usize {
    block.capacity() * mem::size_of::<T>()
}

/// Snapshot of device memory and plan cache state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MemoryUsage {
    /// Bytes held by live buffers
    pub used_bytes: usize,
    /// Bytes held in freed blocks awaiting reuse
    pub cached_bytes: usize,
    /// High-water mark of used + cached bytes
    pub peak_bytes: usize,
    /// Number of cached FFT plans
    pub cached_plans: usize,
}

impl MemoryUsage {
    pub fn used_mb(&self) -> f64 {
        self.used_bytes as f64 / 1e6
    }

    pub fn cached_mb(&self) -> f64 {
        self.cached_bytes as f64 / 1e6
    }
}

#[derive(Default)]
struct PoolState {
    used_bytes: usize,
    peak_bytes: usize,
    free: BlockCache,
}

/// Block-caching memory pool.
///
/// Released blocks stay cached for reuse until `free_all_blocks` runs.
pub(crate) struct DevicePool {
    state: Mutex<PoolState>,
    limit: Option<usize>,
}

impl DevicePool {
    fn new(limit: Option<usize>) -> Self {
        Self {
            state: Mutex::new(PoolState::default()),
            limit,
        }
    }

    fn allocate<T: DeviceElement>(self: &Arc<Self>, len: usize) -> UpscaleResult<DeviceBuffer<T>> {
        let mut state = self.state.lock();

        // Best fit among cached blocks
        let free = T::free_list(&mut state.free);
        let reuse = free
            .iter()
            .enumerate()
            .filter(|(_, block)| block.capacity() >= len)
            .min_by_key(|(_, block)| block.capacity())
            .map(|(i, _)| i);

        let mut block = match reuse {
            Some(i) => free.swap_remove(i),
            None => {
                let requested = len
                    .checked_mul(mem::size_of::<T>())
                    .ok_or_else(|| UpscaleError::Resource(format!("allocation of {} elements overflows", len)))?;
                if let Some(limit) = self.limit {
                    if state.used_bytes + state.free.bytes() + requested > limit {
                        // Out of room: drop the cache and retry before failing
                        state.free.clear();
                        if state.used_bytes + requested > limit {
                            return Err(UpscaleError::Resource(format!(
                                "out of device memory: requested {} bytes with {} of {} in use",
                                requested, state.used_bytes, limit
                            )));
                        }
                    }
                }
                Vec::with_capacity(len)
            }
        };

        block.clear();
        block.resize(len, T::default());
        state.used_bytes += block_bytes(&block);
        let total = state.used_bytes + state.free.bytes();
        state.peak_bytes = state.peak_bytes.max(total);

        Ok(DeviceBuffer {
            data: block,
            pool: Arc::clone(self),
        })
    }

    fn reclaim<T: DeviceElement>(&self, block: Vec<T>) {
        let mut state = self.state.lock();
        state.used_bytes = state.used_bytes.saturating_sub(block_bytes(&block));
        if block.capacity() > 0 {
            T::free_list(&mut state.free).push(block);
        }
    }

    fn forget(&self, bytes: usize) {
        let mut state = self.state.lock();
        state.used_bytes = state.used_bytes.saturating_sub(bytes);
    }

    fn free_all_blocks(&self) {
        self.state.lock().free.clear();
    }

    fn usage(&self) -> (usize, usize, usize) {
        let state = self.state.lock();
        (state.used_bytes, state.free.bytes(), state.peak_bytes)
    }
}

/// Device-resident array owned by exactly one pipeline stage.
///
/// Dropping the buffer returns its block to the pool.
pub struct DeviceBuffer<T: DeviceElement = f32> {
    data: Vec<T>,
    pool: Arc<DevicePool>,
}

impl<T: DeviceElement> DeviceBuffer<T> {
    /// Copy the contents back to host memory and release the buffer
    pub fn into_host(mut self) -> Vec<T> {
        let data = mem::take(&mut self.data);
        self.pool.forget(block_bytes(&data));
        data
    }
}

impl<T: DeviceElement> Deref for DeviceBuffer<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.data
    }
}

impl<T: DeviceElement> DerefMut for DeviceBuffer<T> {
    fn deref_mut(&mut self) -> &mut [T] {
        &mut self.data
    }
}

impl<T: DeviceElement> Drop for DeviceBuffer<T> {
    fn drop(&mut self) {
        self.pool.reclaim(mem::take(&mut self.data));
    }
}

impl<T: DeviceElement + std::fmt::Debug> std::fmt::Debug for DeviceBuffer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceBuffer").field("len", &self.data.len()).finish()
    }
}

/// Forward/inverse real FFT plans for one transform length
#[derive(Clone)]
pub struct RealFftPair {
    pub forward: Arc<dyn RealToComplex<f32>>,
    pub inverse: Arc<dyn ComplexToReal<f32>>,
}

struct PlanCache {
    planner: RealFftPlanner<f32>,
    plans: HashMap<usize, RealFftPair>,
}

impl PlanCache {
    fn new() -> Self {
        Self {
            planner: RealFftPlanner::new(),
            plans: HashMap::new(),
        }
    }
}

/// Device construction options
#[derive(Debug, Clone, Default)]
pub struct DeviceOptions {
    /// Worker threads for data-parallel kernels (None = one per core)
    pub threads: Option<usize>,
    /// Upper bound on pool bytes (None = unbounded)
    pub memory_limit: Option<usize>,
}

/// Data-parallel accelerator with pooled memory and cached FFT plans
pub struct Device {
    pool: Arc<DevicePool>,
    plans: Mutex<PlanCache>,
    workers: ThreadPool,
}

impl Device {
    pub fn new() -> UpscaleResult<Self> {
        Self::with_options(DeviceOptions::default())
    }

    pub fn with_options(options: DeviceOptions) -> UpscaleResult<Self> {
        let mut builder = ThreadPoolBuilder::new().thread_name(|i| format!("upscalr-device-{}", i));
        if let Some(threads) = options.threads {
            builder = builder.num_threads(threads);
        }
        let workers = builder
            .build()
            .map_err(|e| UpscaleError::Resource(format!("failed to start device workers: {}", e)))?;

        debug!(
            "Device ready: {} workers, memory limit {:?}",
            workers.current_num_threads(),
            options.memory_limit
        );

        Ok(Self {
            pool: Arc::new(DevicePool::new(options.memory_limit)),
            plans: Mutex::new(PlanCache::new()),
            workers,
        })
    }

    /// Allocate a zeroed buffer of `len` elements
    pub fn acquire<T: DeviceElement>(&self, len: usize) -> UpscaleResult<DeviceBuffer<T>> {
        self.pool.allocate(len)
    }

    /// Allocate a buffer and copy `data` into it
    pub fn upload(&self, data: &[f32]) -> UpscaleResult<DeviceBuffer<f32>> {
        let mut buffer = self.acquire(data.len())?;
        buffer.copy_from_slice(data);
        Ok(buffer)
    }

    /// Return a buffer's block to the pool
    pub fn release<T: DeviceElement>(&self, buffer: DeviceBuffer<T>) {
        drop(buffer);
    }

    /// Run a kernel on the device workers and wait for it to finish
    pub fn run<R, F>(&self, kernel: F) -> R
    where
        F: FnOnce() -> R + Send,
        R: Send,
    {
        self.workers.install(kernel)
    }

    /// Barrier on outstanding device work: returns once every worker has
    /// drained the jobs queued ahead of it.
    pub fn synchronize(&self) {
        self.workers.broadcast(|_| ());
    }

    /// Cached forward/inverse plans for a real FFT of length `len`
    pub fn real_fft(&self, len: usize) -> RealFftPair {
        let mut cache = self.plans.lock();
        let PlanCache { planner, plans } = &mut *cache;
        plans
            .entry(len)
            .or_insert_with(|| RealFftPair {
                forward: planner.plan_fft_forward(len),
                inverse: planner.plan_fft_inverse(len),
            })
            .clone()
    }

    /// Drop every cached pool block and FFT plan.
    ///
    /// Live buffers are unaffected.
    pub fn reset(&self) {
        self.pool.free_all_blocks();
        *self.plans.lock() = PlanCache::new();
    }

    pub fn memory_usage(&self) -> MemoryUsage {
        let (used_bytes, cached_bytes, peak_bytes) = self.pool.usage();
        MemoryUsage {
            used_bytes,
            cached_bytes,
            peak_bytes,
            cached_plans: self.plans.lock().plans.len(),
        }
    }

    pub fn log_usage(&self, stage: &str) {
        let usage = self.memory_usage();
        info!(
            "[{}] Device memory used: {:.2} MB (cached {:.2} MB, {} plans)",
            stage,
            usage.used_mb(),
            usage.cached_mb(),
            usage.cached_plans
        );
    }

    pub fn num_workers(&self) -> usize {
        self.workers.current_num_threads()
    }
}
