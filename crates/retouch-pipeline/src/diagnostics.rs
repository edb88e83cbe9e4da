//! Pipeline diagnostics: per-stage timing and metrics.
//!
//! [`crate::run_with_diagnostics`] collects a [`PipelineDiagnostics`]
//! alongside the encoded output. Time is read through the [`Clock`]
//! trait so this crate stays free of platform timers; callers supply a
//! clock backed by whatever instant type they have.
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::FilterKind;

/// Source of timestamps for stage timing.
pub trait Clock {
    /// Opaque timestamp type.
    type Instant;

    /// Capture the current time.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// A clock that never advances. Used when timings are not wanted.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullClock;

impl Clock for NullClock {
    type Instant = ();

    fn now(&self) {}

    fn elapsed(&self, _since: &()) -> Duration {
        Duration::ZERO
    }
}

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Diagnostics collected from a single pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDiagnostics {
    /// Decoding the input bytes.
    pub decode: StageDiagnostics,
    /// Categorical filter.
    pub filter: StageDiagnostics,
    /// Brightness, contrast, saturation.
    pub tone: StageDiagnostics,
    /// Radial vignette.
    pub vignette: StageDiagnostics,
    /// Sharpen/blur control.
    pub sharpness: StageDiagnostics,
    /// Film finishing look (only when the filter is `Film`).
    pub film: Option<StageDiagnostics>,
    /// PNG encoding.
    pub encode: StageDiagnostics,
    /// Total wall-clock duration of the run.
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Summary of the image that went through.
    pub summary: PipelineSummary,
}

/// Diagnostics for a single pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific parameters.
    pub metrics: StageMetrics,
}

/// Stage-specific parameters and sizes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Image decoding.
    Decode {
        /// Size of the input image bytes.
        input_bytes: usize,
        /// Decoded width in pixels.
        width: u32,
        /// Decoded height in pixels.
        height: u32,
    },
    /// Categorical filter.
    Filter {
        /// Filter that ran.
        kind: FilterKind,
    },
    /// Tonal adjustments.
    Tone {
        /// Brightness multiplier.
        brightness: f32,
        /// Contrast scale.
        contrast: f32,
        /// Saturation factor.
        saturation: f32,
    },
    /// Vignette.
    Vignette {
        /// Mask intensity.
        intensity: f32,
    },
    /// Sharpen/blur.
    Sharpness {
        /// Sharpness value.
        sharpness: f32,
    },
    /// Film post.
    Film,
    /// PNG encoding.
    Encode {
        /// Size of the encoded output.
        output_bytes: usize,
    },
}

/// Image-level summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSummary {
    /// Image width in pixels.
    pub image_width: u32,
    /// Image height in pixels.
    pub image_height: u32,
    /// `width * height`.
    pub pixel_count: u64,
    /// Encoded input size.
    pub input_bytes: usize,
    /// Encoded output size.
    pub output_bytes: usize,
}

impl PipelineDiagnostics {
    /// Stages in execution order, with display names.
    #[must_use]
    pub fn stages(&self) -> Vec<(&'static str, &StageDiagnostics)> {
        let mut stages = vec![
            ("Decode", &self.decode),
            ("Filter", &self.filter),
            ("Tone", &self.tone),
            ("Vignette", &self.vignette),
            ("Sharpness", &self.sharpness),
        ];
        if let Some(ref film) = self.film {
            stages.push(("Film", film));
        }
        stages.push(("Encode", &self.encode));
        stages
    }

    /// Human-readable multi-line report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Pipeline Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Image: {}x{} ({} pixels)",
            self.summary.image_width, self.summary.image_height, self.summary.pixel_count,
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<24} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);
        for (name, diag) in self.stages() {
            let ms = duration_ms(diag.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let details = format_metrics(&diag.metrics);
            lines.push(format!("{name:<24} {ms:>8.3}ms {pct:>9.1}%  {details}"));
        }

        lines.push(String::new());
        lines.push(format!(
            "Bytes: {} in  |  {} out",
            self.summary.input_bytes, self.summary.output_bytes,
        ));

        lines.join("\n")
    }
}

/// Convert a duration to fractional milliseconds.
#[must_use]
pub fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Decode {
            input_bytes,
            width,
            height,
        } => format!("{input_bytes} bytes -> {width}x{height}"),
        StageMetrics::Filter { kind } => kind.to_string(),
        StageMetrics::Tone {
            brightness,
            contrast,
            saturation,
        } => format!("bri={brightness:.2} con={contrast:.2} sat={saturation:.2}"),
        StageMetrics::Vignette { intensity } => format!("intensity={intensity:.2}"),
        StageMetrics::Sharpness { sharpness } => format!("sharpness={sharpness:.2}"),
        StageMetrics::Film => "s-curve + gamma + warm".to_owned(),
        StageMetrics::Encode { output_bytes } => format!("{output_bytes} bytes"),
    }
}

/// Accumulates stage timings during a run.
pub(crate) struct Recorder<'a, C: Clock> {
    clock: &'a C,
    start: C::Instant,
    stage_start: C::Instant,
}

impl<'a, C: Clock> Recorder<'a, C> {
    pub(crate) fn start(clock: &'a C) -> Self {
        Self {
            clock,
            start: clock.now(),
            stage_start: clock.now(),
        }
    }

    /// Close the current stage and start timing the next one.
    pub(crate) fn lap(&mut self, metrics: StageMetrics) -> StageDiagnostics {
        let duration = self.clock.elapsed(&self.stage_start);
        self.stage_start = self.clock.now();
        StageDiagnostics { duration, metrics }
    }

    pub(crate) fn total(&self) -> Duration {
        self.clock.elapsed(&self.start)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    /// Clock that advances one millisecond per reading.
    struct TickClock {
        ticks: Cell<u64>,
    }

    impl Clock for TickClock {
        type Instant = u64;

        fn now(&self) -> u64 {
            let t = self.ticks.get();
            self.ticks.set(t + 1);
            t
        }

        fn elapsed(&self, since: &u64) -> Duration {
            Duration::from_millis(self.ticks.get() - since)
        }
    }

    #[test]
    fn duration_ms_converts_correctly() {
        let ms = duration_ms(Duration::from_millis(1234));
        assert!((ms - 1234.0).abs() < 0.01);
    }

    #[test]
    fn null_clock_reports_zero() {
        let mut recorder = Recorder::start(&NullClock);
        let stage = recorder.lap(StageMetrics::Film);
        assert_eq!(stage.duration, Duration::ZERO);
        assert_eq!(recorder.total(), Duration::ZERO);
    }

    #[test]
    fn recorder_laps_measure_each_stage() {
        let clock = TickClock {
            ticks: Cell::new(0),
        };
        let mut recorder = Recorder::start(&clock);
        // Every reading advances the clock, so each lap spans one tick.
        let first = recorder.lap(StageMetrics::Film);
        assert_eq!(first.duration, Duration::from_millis(1));
        let second = recorder.lap(StageMetrics::Film);
        assert_eq!(second.duration, Duration::from_millis(1));
        assert!(recorder.total() >= first.duration + second.duration);
    }
}
