//! Radial vignette.
//!
//! Pixel coordinates are normalized to `[-1, 1]` on each axis (evenly
//! spaced with both endpoints included, so the corner pixels sit at
//! exactly ±1), `d = sqrt(x² + y²)` is the normalized radial distance, and
//! every channel is multiplied by a mask `m(d, intensity)` in `[0, 1]`.
//!
//! The squared axis terms are computed once per column and once per row
//! and broadcast over the raster, rather than recomputing coordinates for
//! each pixel.

use crate::raster::PixelBuffer;

/// Shape of the darkening mask.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VignetteCurve {
    /// `m = 1 - clamp(d * intensity * 1.5, 0, 1)`: darkening starts at
    /// the center and grows linearly with distance.
    #[default]
    Radial,
    /// `m = 1 - clamp((d - 0.65) * intensity * 2, 0, 1)`: the center out
    /// to `d = 0.65` is untouched.
    CenterBiased,
}

impl VignetteCurve {
    /// Mask value for normalized distance `d`.
    #[must_use]
    pub fn mask(self, d: f32, intensity: f32) -> f32 {
        let falloff = match self {
            Self::Radial => d * intensity * 1.5,
            Self::CenterBiased => (d - 0.65) * intensity * 2.0,
        };
        1.0 - falloff.clamp(0.0, 1.0)
    }
}

/// Apply the pipeline's vignette ([`VignetteCurve::Radial`]).
///
/// No-op when `intensity <= 0`.
#[must_use = "returns the vignetted buffer"]
pub fn apply(buffer: PixelBuffer, intensity: f32) -> PixelBuffer {
    apply_curve(buffer, intensity, VignetteCurve::Radial)
}

/// Apply a vignette with an explicit mask curve.
///
/// No-op when `intensity <= 0`.
#[must_use = "returns the vignetted buffer"]
pub fn apply_curve(mut buffer: PixelBuffer, intensity: f32, curve: VignetteCurve) -> PixelBuffer {
    if intensity <= 0.0 {
        return buffer;
    }

    let xs = squared_axis(buffer.width());
    let ys = squared_axis(buffer.height());

    buffer.map_pixels_at(|x, y, rgb| {
        let d = (xs[x as usize] + ys[y as usize]).sqrt();
        let m = curve.mask(d, intensity);
        rgb.map(|v| v * m)
    });
    buffer
}

/// Squared normalized coordinate of every index along one axis.
///
/// A single-pixel axis is its own center and maps to 0.
#[allow(clippy::cast_precision_loss)]
fn squared_axis(len: u32) -> Vec<f32> {
    if len <= 1 {
        return vec![0.0; len as usize];
    }
    let span = (len - 1) as f32;
    (0..len)
        .map(|i| {
            let t = (i as f32 / span).mul_add(2.0, -1.0);
            t * t
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn white(width: u32, height: u32) -> PixelBuffer {
        PixelBuffer::from_fn(width, height, |_, _| [255.0; 3])
    }

    #[test]
    fn zero_intensity_is_identity() {
        let buffer = white(9, 9);
        assert_eq!(apply(buffer.clone(), 0.0), buffer);
    }

    #[test]
    fn negative_intensity_is_identity() {
        let buffer = white(9, 9);
        assert_eq!(apply(buffer.clone(), -0.5), buffer);
    }

    #[test]
    fn center_untouched_corners_darkened() {
        let out = apply(white(9, 9), 0.3);
        assert!((out.pixel(4, 4)[0] - 255.0).abs() < f32::EPSILON);
        assert!(out.pixel(0, 0)[0] < 255.0);
        assert!(out.pixel(8, 8)[0] < 255.0);
    }

    #[test]
    fn corner_mask_matches_formula() {
        let intensity = 0.2;
        let out = apply(white(9, 9), intensity);
        let d = 2.0f32.sqrt();
        let expected = 255.0 * (1.0 - (d * intensity * 1.5).clamp(0.0, 1.0));
        assert!((out.pixel(0, 0)[0] - expected).abs() < 1e-3);
    }

    #[test]
    fn strong_vignette_reaches_black() {
        // d * 1.0 * 1.5 >= 1 whenever d >= 2/3; corners are at d = sqrt(2).
        let out = apply(white(9, 9), 1.0);
        assert!(out.pixel(0, 0)[0].abs() < f32::EPSILON);
    }

    #[test]
    fn darkening_is_monotonic_along_diagonal() {
        let out = apply(white(21, 21), 0.4);
        let mut previous = f32::INFINITY;
        for i in (0..=10).rev() {
            let v = out.pixel(i, i)[0];
            assert!(v <= previous, "brightness increased moving outward at ({i},{i})");
            previous = v;
        }
    }

    #[test]
    fn center_biased_curve_leaves_inner_disc() {
        let out = apply_curve(white(21, 21), 1.0, VignetteCurve::CenterBiased);
        // (13, 10) is at d = 0.3, well inside the 0.65 untouched radius.
        assert!((out.pixel(13, 10)[0] - 255.0).abs() < f32::EPSILON);
        assert!(out.pixel(0, 0)[0] < 255.0);
    }

    #[test]
    fn single_pixel_image_is_center() {
        let out = apply(white(1, 1), 1.0);
        assert!((out.pixel(0, 0)[0] - 255.0).abs() < f32::EPSILON);
    }

    #[test]
    fn squared_axis_spans_unit_interval() {
        let axis = squared_axis(5);
        assert_eq!(axis, vec![1.0, 0.25, 0.0, 0.25, 1.0]);
    }
}
