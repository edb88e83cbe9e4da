//! Gaussian blur and unsharp masking on 8-bit RGB rasters.
//!
//! Wraps [`imageproc::filter::gaussian_blur_f32`], which operates on a
//! single grayscale channel: [`gaussian_blur_rgb`] splits the raster into
//! its R/G/B planes, blurs each, and reassembles. Gaussian blur is linear
//! and per-channel, so this is equivalent to blurring in color space.
//!
//! The blur "radius" used throughout retouch is the Gaussian standard
//! deviation.

use image::{GrayImage, Rgb, RgbImage};

/// Parameters for an unsharp mask.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnsharpMask {
    /// Blur radius (Gaussian sigma) of the comparison copy.
    pub radius: f32,
    /// How strongly the difference is amplified, in percent.
    pub amount_percent: f32,
    /// Minimum absolute difference (in intensity levels) a sample must
    /// exceed before it is sharpened.
    pub threshold: u8,
}

/// Apply Gaussian blur to an RGB image by blurring each channel
/// independently.
///
/// Non-positive radius values return the image unchanged, since
/// `imageproc`'s underlying function panics on `sigma <= 0.0`.
#[must_use = "returns the blurred image"]
pub fn gaussian_blur_rgb(image: &RgbImage, radius: f32) -> RgbImage {
    if radius <= 0.0 || !radius.is_finite() {
        return image.clone();
    }

    let (w, h) = image.dimensions();

    let channels: [GrayImage; 3] = std::array::from_fn(|c| {
        GrayImage::from_fn(w, h, |x, y| image::Luma([image.get_pixel(x, y).0[c]]))
    });

    let blurred: [GrayImage; 3] =
        std::array::from_fn(|c| imageproc::filter::gaussian_blur_f32(&channels[c], radius));

    RgbImage::from_fn(w, h, |x, y| {
        Rgb([
            blurred[0].get_pixel(x, y).0[0],
            blurred[1].get_pixel(x, y).0[0],
            blurred[2].get_pixel(x, y).0[0],
        ])
    })
}

/// Sharpen by amplifying each sample's difference from a blurred copy.
///
/// For every channel sample, `diff = original - blurred`. Where
/// `|diff| > threshold` the output is `original + diff * amount / 100`,
/// rounded and clamped to 0..=255; elsewhere the sample is untouched.
/// A zero amount or radius returns the image unchanged.
#[must_use = "returns the sharpened image"]
pub fn unsharp_mask(image: &RgbImage, mask: UnsharpMask) -> RgbImage {
    if mask.amount_percent <= 0.0 || mask.radius <= 0.0 {
        return image.clone();
    }

    let blurred = gaussian_blur_rgb(image, mask.radius);
    let gain = mask.amount_percent / 100.0;
    let threshold = i16::from(mask.threshold);

    let mut out = image.clone();
    for (dst, soft) in out.pixels_mut().zip(blurred.pixels()) {
        for (value, &smooth) in dst.0.iter_mut().zip(soft.0.iter()) {
            let diff = i16::from(*value) - i16::from(smooth);
            if diff.abs() > threshold {
                *value = crate::raster::quantize(f32::from(diff).mul_add(gain, f32::from(*value)));
            }
        }
    }
    out
}
