//! Output formatting for CLI results

use colorful::Colorful;

use crate::core::UpscaleReport;

/// Format a job report for terminal output
pub fn format_report(report: &UpscaleReport, verbose: bool) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "{} {} -> {}\n",
        "✓".green(),
        report.input_path.display().to_string().cyan(),
        report.output_path.display().to_string().cyan()
    ));
    output.push_str(&format!(
        "  Format: {} -> {}\n",
        report.source_format, report.target_format
    ));
    output.push_str(&format!(
        "  Sample Rate: {} Hz -> {} Hz (x{})\n",
        report.input_sample_rate, report.output_sample_rate, report.factor
    ));
    match report.source_bitrate {
        Some(bps) => output.push_str(&format!("  Source Bitrate: {:.1} kbps\n", bps as f64 / 1000.0)),
        None => output.push_str(&format!(
            "  Source Bitrate: {}\n",
            "unknown (default factor)".yellow()
        )),
    }
    output.push_str(&format!("  Channels: {}\n", report.channels));
    output.push_str(&format!(
        "  Frames: {} -> {}\n",
        report.input_frames, report.output_frames
    ));
    output.push_str(&format!("  Elapsed: {:.2}s\n", report.elapsed_secs));

    if verbose {
        output.push_str("\n  Channels:\n");
        for channel in &report.channel_summaries {
            output.push_str(&format!(
                "    [{}] peak {:.3} -> {:.3} ({:.2}s)\n",
                channel.index, channel.input_peak, channel.output_peak, channel.elapsed_secs
            ));
        }
        output.push_str(&format!(
            "    Peak device memory: {:.2} MB\n",
            report.peak_device_bytes as f64 / (1024.0 * 1024.0)
        ));
    }

    output
}

pub fn print_report(report: &UpscaleReport, verbose: bool) {
    print!("{}", format_report(report, verbose));
}

/// Format a job report as JSON
pub fn format_json(report: &UpscaleReport) -> serde_json::Result<String> {
    serde_json::to_string_pretty(report)
}

pub fn print_json(report: &UpscaleReport) -> serde_json::Result<()> {
    println!("{}", format_json(report)?);
    Ok(())
}
