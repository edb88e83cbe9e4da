//! Brightness, contrast and saturation.
//!
//! Each adjustment is skipped entirely at its neutral value so repeated
//! edits do not pick up float rounding from no-op passes. No clamping
//! happens here; the raster is clamped once when it is quantized.

use crate::raster::{self, PixelBuffer};
use crate::types::EditSettings;

/// Apply brightness, then contrast, then saturation.
#[must_use = "returns the adjusted buffer"]
#[allow(clippy::float_cmp)] // neutral values are exact sentinels
pub fn apply(mut buffer: PixelBuffer, brightness: f32, contrast: f32, saturation: f32) -> PixelBuffer {
    if brightness != EditSettings::NEUTRAL_BRIGHTNESS {
        buffer.map_pixels(|rgb| rgb.map(|v| v * brightness));
    }

    if contrast != EditSettings::NEUTRAL_CONTRAST {
        buffer.map_pixels(|rgb| rgb.map(|v| (v - 128.0).mul_add(contrast, 128.0)));
    }

    if saturation != EditSettings::NEUTRAL_SATURATION {
        buffer.map_pixels(|rgb| {
            let gray = raster::luma(rgb);
            rgb.map(|v| (v - gray).mul_add(saturation, gray))
        });
    }

    buffer
}
