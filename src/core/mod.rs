//! Core upscaling engine: device model, DSP kernels, channel pipeline and
//! job orchestration

pub mod decoder;
pub mod device;
pub mod dsp;
pub mod encoder;
pub mod io;
pub mod pipeline;
pub mod scope;
pub mod signal;
pub mod upscaler;

pub use decoder::decode_audio;
pub use device::{Device, DeviceBuffer, DeviceOptions, MemoryUsage};
pub use encoder::{create_encoder, write_signal, AudioEncoder, WavEncoder};
#[cfg(feature = "flac")]
pub use encoder::FlacEncoder;
pub use io::{FileReader, FileWriter, SignalReader, SignalWriter};
pub use pipeline::{ChannelOutput, ChannelPipeline, ChannelStage};
pub use scope::ResourceScope;
pub use signal::{ChannelSummary, ChannelView, Signal};
pub use upscaler::{upscale, UpscaleReport, UpscaledSignal, Upscaler};
