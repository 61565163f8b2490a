//! CLI argument parsing

use clap::Parser;
use std::path::{Path, PathBuf};

use crate::config::{AudioFormat, UpscaleConfig};
use crate::core::dsp::DEFAULT_CHUNK_SIZE;
use crate::error::{UpscaleError, UpscaleResult};

#[derive(Parser, Debug)]
#[command(name = "upscalr")]
#[command(version)]
#[command(about = "Upscale audio to a higher sample rate with spectral reconstruction")]
pub struct Args {
    /// Input audio file (mp3, wav, flac, ogg)
    #[arg(short, long, required_unless_present = "config")]
    pub input: Option<PathBuf>,

    /// Output audio file (wav, or flac when built with the `flac` feature)
    #[arg(short, long, required_unless_present = "config")]
    pub output: Option<PathBuf>,

    /// Source format (inferred from the input extension when omitted)
    #[arg(long)]
    pub source_format: Option<AudioFormat>,

    /// Target format (inferred from the output extension when omitted)
    #[arg(long)]
    pub target_format: Option<AudioFormat>,

    /// Reconstruction iterations
    #[arg(long, env = "UPSCALR_ITERATIONS")]
    pub iterations: Option<usize>,

    /// Magnitude threshold for spectral coefficients, in (0, 1]
    #[arg(long, env = "UPSCALR_THRESHOLD")]
    pub threshold: Option<f32>,

    /// Target bitrate in kbps (flac 800-1411, wav 800-6444)
    #[arg(short, long, env = "UPSCALR_BITRATE")]
    pub bitrate: Option<u32>,

    /// Skip peak normalization
    #[arg(long)]
    pub no_normalize: bool,

    /// Skip restoring the source peak amplitude
    #[arg(long)]
    pub no_autoscale: bool,

    /// Skip the adaptive filter
    #[arg(long)]
    pub no_filter: bool,

    /// Filter independent chunks of this many samples (1000000 when no
    /// value is given)
    #[arg(long, num_args = 0..=1, value_name = "SAMPLES")]
    pub chunk_size: Option<Option<usize>>,

    /// Load job settings from a JSON file; other flags override it
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Write straight to the output path instead of staging and renaming
    #[arg(long)]
    pub direct_write: bool,

    /// Verbose output (debug logging)
    #[arg(short, long)]
    pub verbose: bool,

    /// Print the job report as JSON
    #[arg(long)]
    pub json: bool,
}

impl Args {
    /// Resolve the arguments into a validated job configuration.
    ///
    /// Without `--config`, formats missing from the command line are inferred
    /// from the file extensions. With it, only the flags actually given
    /// override the loaded settings.
    pub fn into_config(self) -> UpscaleResult<UpscaleConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let mut config = UpscaleConfig::from_json_file(path)?;
                if let Some(input) = &self.input {
                    config.input_path = input.clone();
                }
                if let Some(output) = &self.output {
                    config.output_path = output.clone();
                }
                if let Some(format) = self.source_format {
                    config.source_format = format;
                }
                if let Some(format) = self.target_format {
                    config.target_format = format;
                }
                config
            }
            None => {
                let input = required_path(&self.input, "--input")?;
                let output = required_path(&self.output, "--output")?;
                let source = resolve_format(self.source_format, &input)?;
                let target = resolve_format(self.target_format, &output)?;
                UpscaleConfig::new(input, output, source, target)
            }
        };

        if let Some(iterations) = self.iterations {
            config.max_iterations = iterations;
        }
        if let Some(threshold) = self.threshold {
            config.threshold_value = threshold;
        }
        if let Some(bitrate) = self.bitrate {
            config.target_bitrate_kbps = bitrate;
        }
        if self.no_normalize {
            config.normalize = false;
        }
        if self.no_autoscale {
            config.autoscale = false;
        }
        if self.no_filter {
            config.adaptive_filter = false;
        }
        if let Some(chunk_size) = self.chunk_size {
            config.filter.chunk_size = Some(chunk_size.unwrap_or(DEFAULT_CHUNK_SIZE));
        }
        if self.direct_write {
            config.atomic_write = false;
        }

        config.validate()?;
        Ok(config)
    }
}

fn required_path(path: &Option<PathBuf>, flag: &str) -> UpscaleResult<PathBuf> {
    path.clone()
        .ok_or_else(|| UpscaleError::Configuration(format!("{} is required without --config", flag)))
}

fn resolve_format(explicit: Option<AudioFormat>, path: &Path) -> UpscaleResult<AudioFormat> {
    explicit.or_else(|| AudioFormat::from_path(path)).ok_or_else(|| {
        UpscaleError::UnsupportedFormat(format!(
            "cannot infer format of {}; pass it explicitly",
            path.display()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("upscalr").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_formats_inferred_from_extensions() {
        let config = parse(&["-i", "song.mp3", "-o", "song.wav"]).into_config().unwrap();
        assert_eq!(config.source_format, AudioFormat::Mp3);
        assert_eq!(config.target_format, AudioFormat::Wav);
        assert!(config.atomic_write);
        assert!(config.adaptive_filter);
    }

    #[test]
    fn test_explicit_format_wins() {
        let config = parse(&["-i", "track", "-o", "out.bin", "--source-format", "ogg", "--target-format", "wav"])
            .into_config()
            .unwrap();
        assert_eq!(config.source_format, AudioFormat::Ogg);
        assert_eq!(config.target_format, AudioFormat::Wav);
    }

    #[test]
    fn test_unknown_extension() {
        let err = parse(&["-i", "track.xyz", "-o", "out.wav"]).into_config().unwrap_err();
        assert!(matches!(err, UpscaleError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_toggles_and_overrides() {
        let config = parse(&[
            "-i", "a.wav", "-o", "b.wav",
            "--iterations", "10",
            "--threshold", "0.5",
            "--bitrate", "3000",
            "--no-normalize",
            "--no-filter",
            "--chunk-size", "4096",
            "--direct-write",
        ])
        .into_config()
        .unwrap();

        assert_eq!(config.max_iterations, 10);
        assert_eq!(config.threshold_value, 0.5);
        assert_eq!(config.target_bitrate_kbps, 3000);
        assert!(!config.normalize);
        assert!(config.autoscale);
        assert!(!config.adaptive_filter);
        assert_eq!(config.filter.chunk_size, Some(4096));
        assert!(!config.atomic_write);
    }

    #[test]
    fn test_chunk_size_without_value_uses_default() {
        let config = parse(&["-i", "a.wav", "-o", "b.wav", "--chunk-size"]).into_config().unwrap();
        assert_eq!(config.filter.chunk_size, Some(DEFAULT_CHUNK_SIZE));

        let config = parse(&["-i", "a.wav", "-o", "b.wav"]).into_config().unwrap();
        assert_eq!(config.filter.chunk_size, None);
    }

    #[test]
    fn test_invalid_bitrate_rejected() {
        let err = parse(&["-i", "a.mp3", "-o", "b.flac", "--bitrate", "2000"])
            .into_config()
            .unwrap_err();
        assert!(matches!(err, UpscaleError::Configuration(_)));
    }

    #[test]
    fn test_requires_paths_without_config() {
        assert!(Args::try_parse_from(["upscalr", "-i", "a.mp3"]).is_err());
    }

    #[test]
    fn test_config_file_with_override() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"input_path": "in.mp3", "output_path": "out.wav",
                "source_format": "mp3", "target_format": "wav",
                "max_iterations": 50}}"#
        )
        .unwrap();

        let path = file.path().to_string_lossy().into_owned();
        let config = parse(&["--config", &path, "--no-autoscale"]).into_config().unwrap();
        assert_eq!(config.max_iterations, 50);
        assert_eq!(config.input_path, PathBuf::from("in.mp3"));
        assert!(!config.autoscale);
        assert!(config.normalize);
    }
}
