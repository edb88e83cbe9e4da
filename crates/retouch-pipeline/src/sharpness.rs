//! Bidirectional sharpness control.
//!
//! One continuous value covers both directions: above 1.0 it drives an
//! unsharp mask, below 1.0 a Gaussian blur, and exactly 1.0 is a no-op.

use image::RgbImage;

use crate::blur::{self, UnsharpMask};
use crate::types::EditSettings;

/// Unsharp-mask radius used when sharpening.
pub const SHARPEN_RADIUS: f32 = 2.0;

/// Unsharp-mask threshold used when sharpening.
pub const SHARPEN_THRESHOLD: u8 = 3;

/// Blur radius at `sharpness = 0.0`.
pub const MAX_BLUR_RADIUS: f32 = 5.0;

/// What a given sharpness value does to the raster.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SharpnessOp {
    /// `sharpness == 1.0`.
    Unchanged,
    /// `sharpness > 1.0`: unsharp mask with amount `(s - 1) * 200` percent.
    Sharpen(UnsharpMask),
    /// `sharpness < 1.0`: Gaussian blur with radius `(1 - s) * 5`.
    Blur {
        /// Gaussian radius.
        radius: f32,
    },
}

impl SharpnessOp {
    /// Resolve a sharpness value into the operation it performs.
    #[must_use]
    pub fn from_sharpness(sharpness: f32) -> Self {
        let neutral = EditSettings::NEUTRAL_SHARPNESS;
        if sharpness > neutral {
            Self::Sharpen(UnsharpMask {
                radius: SHARPEN_RADIUS,
                amount_percent: (sharpness - neutral) * 200.0,
                threshold: SHARPEN_THRESHOLD,
            })
        } else if sharpness < neutral {
            Self::Blur {
                radius: (neutral - sharpness) * MAX_BLUR_RADIUS,
            }
        } else {
            Self::Unchanged
        }
    }
}

/// Apply the sharpness stage.
#[must_use = "returns the sharpened or blurred image"]
pub fn apply(image: RgbImage, sharpness: f32) -> RgbImage {
    match SharpnessOp::from_sharpness(sharpness) {
        SharpnessOp::Unchanged => image,
        SharpnessOp::Sharpen(mask) => blur::unsharp_mask(&image, mask),
        SharpnessOp::Blur { radius } => blur::gaussian_blur_rgb(&image, radius),
    }
}

#[cfg(test)]
mod tests {
    use image::Rgb;

    use super::*;

    fn checker() -> RgbImage {
        RgbImage::from_fn(16, 16, |x, y| {
            if (x / 4 + y / 4) % 2 == 0 {
                Rgb([90, 90, 90])
            } else {
                Rgb([170, 170, 170])
            }
        })
    }

    #[test]
    fn neutral_is_unchanged() {
        assert_eq!(SharpnessOp::from_sharpness(1.0), SharpnessOp::Unchanged);
        let img = checker();
        assert_eq!(apply(img.clone(), 1.0), img);
    }

    #[test]
    fn amount_scales_with_distance_above_neutral() {
        let SharpnessOp::Sharpen(mask) = SharpnessOp::from_sharpness(1.5) else {
            unreachable!("1.5 must sharpen");
        };
        assert!((mask.amount_percent - 100.0).abs() < 1e-4);
        assert!((mask.radius - 2.0).abs() < f32::EPSILON);
        assert_eq!(mask.threshold, 3);

        let SharpnessOp::Sharpen(mask) = SharpnessOp::from_sharpness(2.0) else {
            unreachable!("2.0 must sharpen");
        };
        assert!((mask.amount_percent - 200.0).abs() < 1e-4);
    }

    #[test]
    fn radius_scales_with_distance_below_neutral() {
        assert_eq!(
            SharpnessOp::from_sharpness(0.5),
            SharpnessOp::Blur { radius: 2.5 }
        );
        assert_eq!(
            SharpnessOp::from_sharpness(0.0),
            SharpnessOp::Blur { radius: 5.0 }
        );
    }

    #[test]
    fn sharpening_and_blurring_change_the_raster() {
        let img = checker();
        assert_ne!(apply(img.clone(), 2.0), img);
        assert_ne!(apply(img.clone(), 0.0), img);
    }
}
