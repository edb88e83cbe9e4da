//! Image decoding and lossless re-encoding.
//!
//! Accepts raw image bytes (PNG, JPEG, BMP, WebP) and produces an 8-bit
//! RGB raster; alpha is dropped on decode and never restored. The edited
//! raster leaves the pipeline as PNG.

use image::{ImageEncoder, RgbImage};

use crate::types::PipelineError;

/// Decode raw image bytes into an RGB raster.
///
/// Any alpha channel is discarded without compositing.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if `bytes` is empty.
/// Returns [`PipelineError::Decode`] if the image format is
/// unrecognized or the data is corrupt.
pub fn decode_rgb(bytes: &[u8]) -> Result<RgbImage, PipelineError> {
    if bytes.is_empty() {
        return Err(PipelineError::EmptyInput);
    }

    let img = image::load_from_memory(bytes).map_err(PipelineError::Decode)?;
    Ok(img.to_rgb8())
}

/// Encode an RGB raster as PNG bytes.
///
/// # Errors
///
/// Returns [`PipelineError::Encode`] if the PNG encoder rejects the
/// raster.
pub fn encode_png(image: &RgbImage) -> Result<Vec<u8>, PipelineError> {
    let mut buf = Vec::new();
    let encoder = image::codecs::png::PngEncoder::new(&mut buf);
    encoder
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            image::ExtendedColorType::Rgb8,
        )
        .map_err(PipelineError::Encode)?;
    Ok(buf)
}
