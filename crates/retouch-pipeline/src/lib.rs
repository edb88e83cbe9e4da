//! retouch-pipeline: Pure image adjustment pipeline (sans-IO).
//!
//! Turns encoded image bytes plus an [`EditSettings`] into new encoded
//! bytes through a fixed sequence of stages:
//! decode -> filter -> brightness -> contrast -> saturation -> vignette ->
//! sharpness -> film post -> PNG encode.
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! byte slices and returns owned byte buffers. Threading, history and
//! persistence live in `retouch-session`.

pub mod blur;
pub mod codec;
pub mod diagnostics;
pub mod filter;
pub mod preset;
pub mod raster;
pub mod sharpness;
pub mod tone;
pub mod types;
pub mod vignette;

pub use diagnostics::{Clock, NullClock, PipelineDiagnostics};
pub use preset::Preset;
pub use raster::PixelBuffer;
pub use types::{Dimensions, EditSettings, FilterKind, PipelineError, RgbImage};
pub use vignette::VignetteCurve;

use diagnostics::{PipelineSummary, Recorder, StageMetrics};

/// Run the full adjustment pipeline.
///
/// Takes raw image bytes (PNG, JPEG, BMP, WebP) and settings, and returns
/// the edited image as PNG bytes. The same inputs always produce the same
/// bytes.
///
/// # Pipeline steps
///
/// 1. Decode to 8-bit RGB (alpha dropped)
/// 2. Filter (grayscale, sepia, blur or sharpen)
/// 3. Brightness, contrast, saturation
/// 4. Vignette
/// 5. Quantize to 8 bits
/// 6. Sharpness (unsharp mask above 1.0, blur below)
/// 7. Film post (only for [`FilterKind::Film`])
/// 8. Encode as PNG
///
/// # Errors
///
/// Returns [`PipelineError::InvalidSettings`] if `settings` fail
/// [`EditSettings::validate`].
/// Returns [`PipelineError::EmptyInput`] if `image_bytes` is empty.
/// Returns [`PipelineError::Decode`] if the image format is unrecognized.
/// Returns [`PipelineError::Encode`] if PNG encoding fails.
pub fn run(image_bytes: &[u8], settings: &EditSettings) -> Result<Vec<u8>, PipelineError> {
    run_with_diagnostics(image_bytes, settings, &NullClock).map(|(bytes, _)| bytes)
}

/// Run the pipeline and collect per-stage diagnostics.
///
/// Identical output to [`run`]; `clock` is read at every stage boundary.
///
/// # Errors
///
/// Same as [`run`].
pub fn run_with_diagnostics<C: Clock>(
    image_bytes: &[u8],
    settings: &EditSettings,
    clock: &C,
) -> Result<(Vec<u8>, PipelineDiagnostics), PipelineError> {
    settings.validate()?;

    let mut recorder = Recorder::start(clock);

    // 1. Decode.
    let decoded = codec::decode_rgb(image_bytes)?;
    let (width, height) = decoded.dimensions();
    let decode = recorder.lap(StageMetrics::Decode {
        input_bytes: image_bytes.len(),
        width,
        height,
    });

    // 2. Filter.
    let buffer = filter::apply(PixelBuffer::from_rgb8(&decoded), settings.filter);
    drop(decoded);
    let filter = recorder.lap(StageMetrics::Filter {
        kind: settings.filter,
    });

    // 3. Tone.
    let buffer = tone::apply(
        buffer,
        settings.brightness,
        settings.contrast,
        settings.saturation,
    );
    let tone = recorder.lap(StageMetrics::Tone {
        brightness: settings.brightness,
        contrast: settings.contrast,
        saturation: settings.saturation,
    });

    // 4. Vignette.
    let buffer = vignette::apply(buffer, settings.vignette);
    let vignette = recorder.lap(StageMetrics::Vignette {
        intensity: settings.vignette,
    });

    // 5-6. Quantize, then sharpness on the 8-bit raster.
    let rgb = sharpness::apply(buffer.to_rgb8(), settings.sharpness);
    let sharpness = recorder.lap(StageMetrics::Sharpness {
        sharpness: settings.sharpness,
    });

    // 7. Film post.
    let (rgb, film) = if settings.filter == FilterKind::Film {
        let toned = filter::film_post(PixelBuffer::from_rgb8(&rgb)).to_rgb8();
        (toned, Some(recorder.lap(StageMetrics::Film)))
    } else {
        (rgb, None)
    };

    debug_assert_eq!(rgb.dimensions(), (width, height), "stages must preserve dimensions");

    // 8. Encode.
    let encoded = codec::encode_png(&rgb)?;
    let encode = recorder.lap(StageMetrics::Encode {
        output_bytes: encoded.len(),
    });

    let diagnostics = PipelineDiagnostics {
        decode,
        filter,
        tone,
        vignette,
        sharpness,
        film,
        encode,
        total_duration: recorder.total(),
        summary: PipelineSummary {
            image_width: width,
            image_height: height,
            pixel_count: u64::from(width) * u64::from(height),
            input_bytes: image_bytes.len(),
            output_bytes: encoded.len(),
        },
    };

    log::debug!(
        "edited {width}x{height} image ({} -> {} bytes) in {:.3}ms",
        image_bytes.len(),
        encoded.len(),
        diagnostics::duration_ms(diagnostics.total_duration),
    );

    Ok((encoded, diagnostics))
}
