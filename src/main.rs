// src/main.rs
use anyhow::{Context, Result};
use clap::Parser;
use colorful::Colorful;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use upscalr::cli::{print_json, print_report, Args};
use upscalr::core::{Device, Upscaler};

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let verbose = args.verbose;
    let json = args.json;
    let config = args.into_config().context("Invalid upscaling configuration")?;

    let device = Device::new().context("Failed to initialize device")?;

    let spinner = if json {
        ProgressBar::hidden()
    } else {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed}]")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.enable_steady_tick(Duration::from_millis(120));
        spinner
    };
    spinner.set_message(format!("Upscaling {}", config.input_path.display()));

    let result = Upscaler::new(&device).upscale(&config);
    spinner.finish_and_clear();

    let report = match result {
        Ok(report) => report,
        Err(e) => {
            eprintln!("{} {}", "✗".red(), config.input_path.display());
            return Err(e).with_context(|| {
                format!(
                    "Failed to upscale {} to {}",
                    config.input_path.display(),
                    config.output_path.display()
                )
            });
        }
    };

    if json {
        print_json(&report).context("Failed to serialize report")?;
    } else {
        print_report(&report, verbose);
    }

    Ok(())
}
