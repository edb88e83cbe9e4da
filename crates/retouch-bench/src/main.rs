//! retouch-bench: CLI tool for adjustment experiments and pipeline timing.
//!
//! Runs the edit pipeline on an image file with the given settings and
//! prints per-stage diagnostics. Useful for:
//!
//! - Checking what a preset or slider combination does to a real photo
//! - Measuring per-stage durations at full resolution
//! - Producing reference outputs for comparison
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin retouch-bench -- [OPTIONS] <IMAGE_PATH>
//! ```
//!
//! Set `RUST_LOG=debug` to see the pipeline's own log output.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::{Parser, ValueEnum};
use retouch_pipeline::diagnostics::{Clock, PipelineDiagnostics};
use retouch_pipeline::{EditSettings, FilterKind};

/// Adjustment experiments and diagnostics for retouch.
///
/// Applies filter, tone, vignette and sharpness settings to an image and
/// prints detailed per-stage timing.
#[derive(Parser)]
#[command(name = "retouch-bench", version)]
struct Cli {
    /// Path to the input image (PNG, JPEG, BMP, WebP).
    image_path: PathBuf,

    /// Start from a named preset; individual flags override its values.
    #[arg(long, value_enum)]
    preset: Option<Preset>,

    /// Categorical filter.
    #[arg(long, value_enum)]
    filter: Option<Filter>,

    /// Brightness multiplier (1.0 = unchanged, must be > 0).
    #[arg(long)]
    brightness: Option<f32>,

    /// Contrast scale around mid-gray (1.0 = unchanged).
    #[arg(long)]
    contrast: Option<f32>,

    /// Saturation factor (0.0 = gray, 1.0 = unchanged).
    #[arg(long)]
    saturation: Option<f32>,

    /// Vignette intensity (0.0 = none).
    #[arg(long)]
    vignette: Option<f32>,

    /// Sharpness (> 1.0 sharpens, < 1.0 blurs).
    #[arg(long)]
    sharpness: Option<f32>,

    /// Write the edited PNG to this file.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Number of runs for averaging.
    #[arg(long, default_value_t = 1, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    runs: usize,

    /// Output diagnostics as JSON instead of human-readable report.
    #[arg(long)]
    json: bool,

    /// Full settings as a JSON string.
    ///
    /// When provided, `--preset` and all individual adjustment flags are
    /// ignored. Missing fields take their neutral values.
    #[arg(long)]
    settings_json: Option<String>,
}

/// Preset selection.
#[derive(Clone, Copy, ValueEnum)]
enum Preset {
    Cinematic,
    Filmic,
    Vibrant,
    Soft,
    HighContrast,
}

/// Filter selection.
#[derive(Clone, Copy, ValueEnum)]
enum Filter {
    /// No filter.
    None,
    /// Luma-weighted gray.
    Grayscale,
    /// Warm brown tone matrix.
    Sepia,
    /// Gaussian blur, radius 2.
    Blur,
    /// Unsharp mask (2, 150%, 3).
    Sharpen,
    /// Contrast curve, gamma and warm bias after all other stages.
    Film,
}

impl From<Preset> for retouch_pipeline::Preset {
    fn from(preset: Preset) -> Self {
        match preset {
            Preset::Cinematic => Self::Cinematic,
            Preset::Filmic => Self::Filmic,
            Preset::Vibrant => Self::Vibrant,
            Preset::Soft => Self::Soft,
            Preset::HighContrast => Self::HighContrast,
        }
    }
}

impl From<Filter> for FilterKind {
    fn from(filter: Filter) -> Self {
        match filter {
            Filter::None => Self::None,
            Filter::Grayscale => Self::Grayscale,
            Filter::Sepia => Self::Sepia,
            Filter::Blur => Self::Blur,
            Filter::Sharpen => Self::Sharpen,
            Filter::Film => Self::Film,
        }
    }
}

/// Build [`EditSettings`] from CLI arguments.
///
/// If `--settings-json` is provided it is parsed directly. Otherwise the
/// preset (or identity) is the base and each given flag overrides one
/// field.
fn settings_from_cli(cli: &Cli) -> Result<EditSettings, String> {
    if let Some(ref json) = cli.settings_json {
        return serde_json::from_str(json)
            .map_err(|e| format!("Error parsing --settings-json: {e}"));
    }

    let base = cli
        .preset
        .map_or(EditSettings::IDENTITY, |p| retouch_pipeline::Preset::from(p).settings());

    Ok(EditSettings {
        filter: cli.filter.map_or(base.filter, FilterKind::from),
        brightness: cli.brightness.unwrap_or(base.brightness),
        contrast: cli.contrast.unwrap_or(base.contrast),
        saturation: cli.saturation.unwrap_or(base.saturation),
        vignette: cli.vignette.unwrap_or(base.vignette),
        sharpness: cli.sharpness.unwrap_or(base.sharpness),
    })
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let settings = match settings_from_cli(&cli) {
        Ok(s) => s,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let image_bytes = match std::fs::read(&cli.image_path) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Error reading {}: {e}", cli.image_path.display());
            return ExitCode::FAILURE;
        }
    };

    eprintln!(
        "Image: {} ({} bytes)",
        cli.image_path.display(),
        image_bytes.len(),
    );
    eprintln!("Settings: {settings:#?}");
    eprintln!("Runs: {}", cli.runs);
    eprintln!();

    let mut all_diagnostics = Vec::with_capacity(cli.runs);

    for run in 0..cli.runs {
        if cli.runs > 1 {
            eprintln!("--- Run {}/{} ---", run + 1, cli.runs);
        }

        match retouch_pipeline::run_with_diagnostics(&image_bytes, &settings, &StdClock) {
            Ok((png, diagnostics)) => {
                if cli.json {
                    match serde_json::to_string_pretty(&diagnostics) {
                        Ok(json) => println!("{json}"),
                        Err(e) => {
                            eprintln!("Error serializing diagnostics: {e}");
                            return ExitCode::FAILURE;
                        }
                    }
                } else {
                    println!("{}", diagnostics.report());
                }

                // Write the image on the first run only.
                if run == 0
                    && let Some(ref path) = cli.output
                {
                    match std::fs::write(path, &png) {
                        Ok(()) => {
                            eprintln!("PNG written to {} ({} bytes)", path.display(), png.len());
                        }
                        Err(e) => {
                            eprintln!("Error writing PNG to {}: {e}", path.display());
                        }
                    }
                }

                all_diagnostics.push(diagnostics);
            }
            Err(e) => {
                eprintln!("Pipeline error: {e}");
                return ExitCode::FAILURE;
            }
        }

        if cli.runs > 1 {
            eprintln!();
        }
    }

    if cli.runs > 1 {
        print_multi_run_summary(&all_diagnostics);
    }

    ExitCode::SUCCESS
}

/// [`Clock`] implementation backed by [`std::time::Instant`].
struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn elapsed(&self, since: &Instant) -> Duration {
        since.elapsed()
    }
}

/// Print aggregated statistics across multiple runs.
#[allow(clippy::cast_precision_loss)]
fn print_multi_run_summary(all_diagnostics: &[PipelineDiagnostics]) {
    println!();
    println!(
        "Summary ({} runs)\n{}",
        all_diagnostics.len(),
        "=".repeat(60),
    );

    let Some(first) = all_diagnostics.first() else {
        println!("Warning: no diagnostics to summarize");
        return;
    };

    let durations: Vec<f64> = all_diagnostics
        .iter()
        .map(|d| retouch_pipeline::diagnostics::duration_ms(d.total_duration))
        .collect();

    let min = durations.iter().copied().reduce(f64::min).unwrap_or(0.0);
    let max = durations.iter().copied().reduce(f64::max).unwrap_or(0.0);
    let mean = durations.iter().sum::<f64>() / durations.len() as f64;

    println!("Total duration: min={min:.3}ms  mean={mean:.3}ms  max={max:.3}ms");

    println!();
    println!("{:<24} {:>12}", "Stage", "Mean (ms)");
    println!("{}", "-".repeat(40));

    // Every run used the same settings, so the stage list is the same.
    for (index, (name, _)) in first.stages().into_iter().enumerate() {
        let total: f64 = all_diagnostics
            .iter()
            .filter_map(|d| d.stages().get(index).map(|(_, s)| s.duration))
            .map(retouch_pipeline::diagnostics::duration_ms)
            .sum();
        let stage_mean = total / all_diagnostics.len() as f64;
        println!("{name:<24} {stage_mean:>10.3}ms");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("retouch-bench").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn flags_override_preset() {
        let cli = parse(&["--preset", "cinematic", "--contrast", "2.0", "in.png"]);
        let settings = settings_from_cli(&cli).unwrap();
        let cinematic = retouch_pipeline::Preset::Cinematic.settings();
        assert!((settings.contrast - 2.0).abs() < f32::EPSILON);
        assert!((settings.brightness - cinematic.brightness).abs() < f32::EPSILON);
        assert!((settings.vignette - cinematic.vignette).abs() < f32::EPSILON);
    }

    #[test]
    fn no_flags_is_identity() {
        let settings = settings_from_cli(&parse(&["in.png"])).unwrap();
        assert!(settings.is_identity());
    }

    #[test]
    fn kebab_case_names_parse() {
        assert!(Cli::try_parse_from(["retouch-bench", "--filter", "high-contrast", "in.png"]).is_err());
        let cli = parse(&["--preset", "high-contrast", "--filter", "film", "in.png"]);
        let settings = settings_from_cli(&cli).unwrap();
        assert_eq!(settings.filter, FilterKind::Film);
        assert!((settings.contrast - 1.4).abs() < f32::EPSILON);
    }

    #[test]
    fn settings_json_wins() {
        let cli = parse(&[
            "--preset",
            "soft",
            "--settings-json",
            r#"{"filter":"Sepia","vignette":0.3}"#,
            "in.png",
        ]);
        let settings = settings_from_cli(&cli).unwrap();
        assert_eq!(settings.filter, FilterKind::Sepia);
        assert!((settings.vignette - 0.3).abs() < f32::EPSILON);
        assert!((settings.sharpness - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn bad_settings_json_is_reported() {
        let cli = parse(&["--settings-json", "{", "in.png"]);
        assert!(settings_from_cli(&cli).unwrap_err().contains("--settings-json"));
    }

    #[test]
    fn runs_must_be_positive() {
        assert!(Cli::try_parse_from(["retouch-bench", "--runs", "0", "in.png"]).is_err());
    }
}
