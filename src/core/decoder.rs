// src/core/decoder.rs
//
// Audio decoding into a Signal, with source bitrate extraction.
// Uses Symphonia for format-agnostic decoding.

use log::debug;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use std::fs::File;
use std::path::Path;

use super::signal::Signal;
use crate::config::AudioFormat;
use crate::error::{UpscaleError, UpscaleResult};

/// Stream parameters taken from the first decoded buffer
#[derive(Debug, Clone, Copy)]
struct StreamLayout {
    sample_rate: u32,
    channels: usize,
}

/// Decode an audio file to floating-point samples in [-1.0, 1.0]
pub fn decode_audio(path: &Path, format: AudioFormat) -> UpscaleResult<Signal> {
    if !path.exists() {
        return Err(UpscaleError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("File not found: {}", path.display()),
        )));
    }

    let file = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    hint.with_extension(format.extension());

    let mut probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| UpscaleError::Decode(format!("failed to probe {}: {}", path.display(), e)))?;

    let track = probed
        .format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| UpscaleError::Decode("no supported audio track found".to_string()))?;

    let track_id = track.id;
    let bits_per_sample = track.codec_params.bits_per_sample;
    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| UpscaleError::Decode(format!("failed to create decoder: {}", e)))?;

    let mut samples: Vec<f32> = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;
    let mut layout: Option<StreamLayout> = None;
    // Encoded payload of the selected track; container metadata and
    // embedded artwork never reach a packet
    let mut audio_bytes: u64 = 0;

    loop {
        let packet = match probed.format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(ref e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(SymphoniaError::ResetRequired) => {
                decoder.reset();
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        if packet.track_id() != track_id {
            continue;
        }
        audio_bytes += packet.buf().len() as u64;

        let decoded = match decoder.decode(&packet) {
            Ok(buf) => buf,
            Err(SymphoniaError::DecodeError(_)) => continue,
            Err(e) => return Err(e.into()),
        };

        let spec = *decoded.spec();
        if layout.is_none() {
            layout = Some(StreamLayout {
                sample_rate: spec.rate,
                channels: spec.channels.count(),
            });
        }

        let buf = sample_buf.get_or_insert_with(|| SampleBuffer::new(decoded.capacity() as u64, spec));
        buf.copy_interleaved_ref(decoded);
        samples.extend_from_slice(buf.samples());
    }

    let layout = match layout {
        Some(layout) if !samples.is_empty() => layout,
        _ => return Err(UpscaleError::Decode("no audio samples decoded from file".to_string())),
    };
    if layout.channels == 0 {
        return Err(UpscaleError::Decode("file reports 0 audio channels".to_string()));
    }

    let duration_secs = samples.len() as f64 / (layout.sample_rate as f64 * layout.channels as f64);
    let bitrate = source_bitrate(format, layout, bits_per_sample, audio_bytes, duration_secs);

    debug!(
        "Decoded {}: {} Hz, {} ch, {:.2}s, {} audio bytes, bitrate {:?}",
        path.display(),
        layout.sample_rate,
        layout.channels,
        duration_secs,
        audio_bytes,
        bitrate
    );

    Signal::new(layout.sample_rate, layout.channels, samples, bitrate)
}

/// Source bitrate in bits per second.
///
/// PCM bitrate follows from the stream parameters. Compressed formats use the
/// average over the track's encoded packets.
fn source_bitrate(
    format: AudioFormat,
    layout: StreamLayout,
    bits_per_sample: Option<u32>,
    audio_bytes: u64,
    duration_secs: f64,
) -> Option<u32> {
    match (format, bits_per_sample) {
        (AudioFormat::Wav, Some(bits)) => Some(layout.sample_rate * bits * layout.channels as u32),
        _ if duration_secs > 0.0 && audio_bytes > 0 => {
            Some((audio_bytes as f64 * 8.0 / duration_secs).round() as u32)
        }
        _ => None,
    }
}
