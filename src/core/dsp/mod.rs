//! Digital signal processing kernels of the upscaling pipeline

pub mod interpolate;
pub mod lms;
pub mod normalize;
pub mod reconstruct;

pub use interpolate::interpolate;
pub use lms::{BlockLms, FilterState, DEFAULT_CHUNK_SIZE};
pub use normalize::{autoscale, normalize, normalize_in_place, peak};
pub use reconstruct::SpectralReconstructor;
