//! Floating-point working raster.
//!
//! [`PixelBuffer`] holds RGB channel values on the 0..=255 scale as `f32`
//! so that filter, tone and vignette arithmetic compounds without
//! intermediate rounding. Values may leave the 0..=255 range while in
//! this form; they are rounded and clamped only by
//! [`PixelBuffer::to_rgb8`].

use image::{Rgb, Rgb32FImage, RgbImage};

/// Perceptual luma weights for R, G and B.
pub const LUMA_WEIGHTS: [f32; 3] = [0.2989, 0.5870, 0.1140];

/// Weighted grayscale brightness of one RGB sample.
#[must_use]
pub fn luma(rgb: [f32; 3]) -> f32 {
    rgb[2].mul_add(
        LUMA_WEIGHTS[2],
        rgb[1].mul_add(LUMA_WEIGHTS[1], rgb[0] * LUMA_WEIGHTS[0]),
    )
}

/// Round and clamp a working value to an 8-bit channel.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn quantize(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

/// An owned RGB raster with `f32` channels.
///
/// Width × height × 3 always equals the sample count; this is upheld by
/// the underlying [`image::ImageBuffer`].
#[derive(Debug, Clone, PartialEq)]
pub struct PixelBuffer {
    image: Rgb32FImage,
}

impl PixelBuffer {
    /// Lift an 8-bit raster into working precision. Exact.
    #[must_use]
    pub fn from_rgb8(image: &RgbImage) -> Self {
        let (w, h) = image.dimensions();
        let lifted = Rgb32FImage::from_fn(w, h, |x, y| Rgb(image.get_pixel(x, y).0.map(f32::from)));
        Self { image: lifted }
    }

    /// Build a buffer from a per-pixel function (mostly useful in tests).
    #[must_use]
    pub fn from_fn(width: u32, height: u32, f: impl Fn(u32, u32) -> [f32; 3]) -> Self {
        Self {
            image: Rgb32FImage::from_fn(width, height, |x, y| Rgb(f(x, y))),
        }
    }

    /// Quantize back to an 8-bit raster, rounding and clamping every
    /// channel to 0..=255.
    #[must_use]
    pub fn to_rgb8(&self) -> RgbImage {
        let (w, h) = self.image.dimensions();
        RgbImage::from_fn(w, h, |x, y| Rgb(self.image.get_pixel(x, y).0.map(quantize)))
    }

    /// Raster width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Raster height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Channel values of the pixel at `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if the coordinates are out of bounds.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> [f32; 3] {
        self.image.get_pixel(x, y).0
    }

    /// Apply `f` to every pixel in place.
    pub fn map_pixels(&mut self, mut f: impl FnMut([f32; 3]) -> [f32; 3]) {
        for pixel in self.image.pixels_mut() {
            pixel.0 = f(pixel.0);
        }
    }

    /// Apply `f` to every pixel in place, with its coordinates.
    pub fn map_pixels_at(&mut self, mut f: impl FnMut(u32, u32, [f32; 3]) -> [f32; 3]) {
        for (x, y, pixel) in self.image.enumerate_pixels_mut() {
            pixel.0 = f(x, y, pixel.0);
        }
    }

    /// Clamp every channel to 0..=255 without rounding.
    pub fn clamp(&mut self) {
        self.map_pixels(|rgb| rgb.map(|v| v.clamp(0.0, 255.0)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[allow(clippy::cast_possible_truncation)]
    fn lift_and_quantize_is_exact() {
        let img = RgbImage::from_fn(16, 16, |x, y| Rgb([(x * 16) as u8, (y * 16) as u8, 255]));
        let buffer = PixelBuffer::from_rgb8(&img);
        assert_eq!(buffer.to_rgb8(), img);
    }

    #[test]
    fn quantize_rounds_and_clamps() {
        assert_eq!(quantize(-12.0), 0);
        assert_eq!(quantize(0.49), 0);
        assert_eq!(quantize(0.5), 1);
        assert_eq!(quantize(254.6), 255);
        assert_eq!(quantize(1000.0), 255);
        assert_eq!(quantize(f32::NAN), 0);
    }

    #[test]
    fn luma_weights_sum_to_one() {
        let white = luma([255.0, 255.0, 255.0]);
        assert!((white - 255.0).abs() < 0.1, "white luma was {white}");
    }

    #[test]
    fn green_dominates_luma() {
        let r = luma([255.0, 0.0, 0.0]);
        let g = luma([0.0, 255.0, 0.0]);
        let b = luma([0.0, 0.0, 255.0]);
        assert!(g > r && r > b, "expected G > R > B, got R={r} G={g} B={b}");
    }

    #[test]
    #[allow(clippy::cast_precision_loss)]
    fn map_pixels_at_sees_coordinates() {
        let mut buffer = PixelBuffer::from_fn(3, 2, |_, _| [0.0; 3]);
        buffer.map_pixels_at(|x, y, _| [x as f32, y as f32, 0.0]);
        assert_eq!(buffer.pixel(2, 1), [2.0, 1.0, 0.0]);
        assert_eq!(buffer.pixel(0, 0), [0.0, 0.0, 0.0]);
    }

    #[test]
    fn clamp_bounds_out_of_range_values() {
        let mut buffer = PixelBuffer::from_fn(1, 1, |_, _| [-5.0, 128.5, 300.0]);
        buffer.clamp();
        assert_eq!(buffer.pixel(0, 0), [0.0, 128.5, 255.0]);
    }
}
