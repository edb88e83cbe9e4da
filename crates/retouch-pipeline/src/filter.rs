//! Categorical filters.
//!
//! [`apply`] maps a [`FilterKind`] to a deterministic transform of the
//! working raster. Grayscale and sepia are color-matrix operations done in
//! `f32`; blur and sharpen are convolutions done on the 8-bit raster (the
//! filter stage runs first, so its input holds exact integers and the
//! round trip through 8 bits is lossless). Film is a finishing look and
//! runs separately as [`film_post`] at the very end of the pipeline.

use crate::blur::{self, UnsharpMask};
use crate::raster::{self, PixelBuffer};
use crate::types::FilterKind;

/// Gaussian radius of [`FilterKind::Blur`].
pub const BLUR_RADIUS: f32 = 2.0;

/// Unsharp mask of [`FilterKind::Sharpen`].
pub const SHARPEN_MASK: UnsharpMask = UnsharpMask {
    radius: 2.0,
    amount_percent: 150.0,
    threshold: 3,
};

/// Sepia color matrix, one row per output channel.
pub const SEPIA_MATRIX: [[f32; 3]; 3] = [
    [0.393, 0.769, 0.189],
    [0.349, 0.686, 0.168],
    [0.272, 0.534, 0.131],
];

/// Contrast scale of the film S-curve around mid-gray.
pub const FILM_CONTRAST: f32 = 1.08;

/// Exponent of the film gamma curve.
pub const FILM_GAMMA: f32 = 0.95;

/// Red-channel multiplier of the film warm bias.
pub const FILM_RED_GAIN: f32 = 1.02;

/// Red-channel offset of the film warm bias.
pub const FILM_RED_OFFSET: f32 = 4.0;

/// Apply the filter stage.
///
/// [`FilterKind::None`] and [`FilterKind::Film`] leave the buffer as is
/// here; the film look is applied by [`film_post`].
#[must_use = "returns the filtered buffer"]
pub fn apply(buffer: PixelBuffer, kind: FilterKind) -> PixelBuffer {
    match kind {
        FilterKind::None | FilterKind::Film => buffer,
        FilterKind::Grayscale => grayscale(buffer),
        FilterKind::Sepia => sepia(buffer),
        FilterKind::Blur => {
            PixelBuffer::from_rgb8(&blur::gaussian_blur_rgb(&buffer.to_rgb8(), BLUR_RADIUS))
        }
        FilterKind::Sharpen => {
            PixelBuffer::from_rgb8(&blur::unsharp_mask(&buffer.to_rgb8(), SHARPEN_MASK))
        }
    }
}

/// Replace every channel with the pixel's luma.
#[must_use = "returns the grayscale buffer"]
pub fn grayscale(mut buffer: PixelBuffer) -> PixelBuffer {
    buffer.map_pixels(|rgb| [raster::luma(rgb); 3]);
    buffer
}

/// Apply the sepia matrix, clamping each channel to 0..=255.
#[must_use = "returns the sepia-toned buffer"]
pub fn sepia(mut buffer: PixelBuffer) -> PixelBuffer {
    buffer.map_pixels(|[r, g, b]| {
        SEPIA_MATRIX.map(|[kr, kg, kb]| kb.mul_add(b, kg.mul_add(g, kr * r)).clamp(0.0, 255.0))
    });
    buffer
}

/// Film finishing look: contrast S-curve, filmic gamma, warm red bias.
///
/// Each step clamps to 0..=255 so the gamma curve never sees a negative
/// base.
#[must_use = "returns the film-toned buffer"]
pub fn film_post(mut buffer: PixelBuffer) -> PixelBuffer {
    buffer.map_pixels(|rgb| {
        let [r, g, b] = rgb.map(|v| {
            let curved = (v - 128.0).mul_add(FILM_CONTRAST, 128.0).clamp(0.0, 255.0);
            255.0 * (curved / 255.0).powf(FILM_GAMMA)
        });
        [
            r.mul_add(FILM_RED_GAIN, FILM_RED_OFFSET).clamp(0.0, 255.0),
            g,
            b,
        ]
    });
    buffer
}
