//! Shared types for the retouch adjustment pipeline.

use serde::{Deserialize, Serialize};

/// Re-export `RgbImage` so downstream crates can reference decoded
/// rasters without depending on `image` directly.
pub use image::RgbImage;

/// Width and height of an image in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
}

/// Named categorical filter applied before the tonal adjustments.
///
/// `Film` differs from the others: it is a finishing look that runs after
/// sharpness, see [`crate::filter::film_post`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterKind {
    /// No filter (identity).
    #[default]
    None,
    /// Perceptual luma written to all three channels.
    Grayscale,
    /// Classic sepia tone matrix.
    Sepia,
    /// Fixed Gaussian blur (radius 2).
    Blur,
    /// Fixed unsharp mask (radius 2, 150%, threshold 3).
    Sharpen,
    /// Contrast S-curve, filmic gamma and a warm red bias.
    Film,
}

impl FilterKind {
    /// Every filter, in the order a UI should list them.
    pub const ALL: [Self; 6] = [
        Self::None,
        Self::Grayscale,
        Self::Sepia,
        Self::Blur,
        Self::Sharpen,
        Self::Film,
    ];

    /// Human-readable filter name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Grayscale => "Grayscale",
            Self::Sepia => "Sepia",
            Self::Blur => "Blur",
            Self::Sharpen => "Sharpen",
            Self::Film => "Film",
        }
    }
}

impl std::fmt::Display for FilterKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// The complete set of user adjustments for one pipeline run.
///
/// `EditSettings::default()` is the identity: every field sits at its
/// neutral value and [`crate::run`] returns the input raster unchanged.
/// Missing fields in serialized settings take their neutral value.
///
/// Fields are public with no construction-time validation; ranges are
/// checked by [`validate`](Self::validate), which [`crate::run`] calls
/// before touching any pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditSettings {
    /// Categorical filter.
    pub filter: FilterKind,

    /// Channel multiplier. Must be `> 0`. Neutral at `1.0`.
    pub brightness: f32,

    /// Scale of the deviation from mid-gray 128. Must be `>= 0`.
    /// Neutral at `1.0`.
    pub contrast: f32,

    /// Interpolation factor between luma and color. `0.0` fully
    /// desaturates, values above `1.0` oversaturate. Must be `>= 0`.
    /// Neutral at `1.0`.
    pub saturation: f32,

    /// Radial darkening strength. Must be `>= 0`. Neutral at `0.0`.
    pub vignette: f32,

    /// Bidirectional sharpen/blur control. Must be `>= 0`. Neutral at
    /// `1.0`; above sharpens, below blurs.
    pub sharpness: f32,
}

impl EditSettings {
    /// Neutral brightness.
    pub const NEUTRAL_BRIGHTNESS: f32 = 1.0;

    /// Neutral contrast.
    pub const NEUTRAL_CONTRAST: f32 = 1.0;

    /// Neutral saturation.
    pub const NEUTRAL_SATURATION: f32 = 1.0;

    /// Neutral vignette intensity.
    pub const NEUTRAL_VIGNETTE: f32 = 0.0;

    /// Neutral sharpness.
    pub const NEUTRAL_SHARPNESS: f32 = 1.0;

    /// The identity settings value.
    pub const IDENTITY: Self = Self {
        filter: FilterKind::None,
        brightness: Self::NEUTRAL_BRIGHTNESS,
        contrast: Self::NEUTRAL_CONTRAST,
        saturation: Self::NEUTRAL_SATURATION,
        vignette: Self::NEUTRAL_VIGNETTE,
        sharpness: Self::NEUTRAL_SHARPNESS,
    };

    /// Returns `true` if running these settings cannot change any pixel.
    #[must_use]
    #[allow(clippy::float_cmp)] // neutral values are exact sentinels
    pub fn is_identity(&self) -> bool {
        self.filter == FilterKind::None
            && self.brightness == Self::NEUTRAL_BRIGHTNESS
            && self.contrast == Self::NEUTRAL_CONTRAST
            && self.saturation == Self::NEUTRAL_SATURATION
            && self.vignette <= Self::NEUTRAL_VIGNETTE
            && self.sharpness == Self::NEUTRAL_SHARPNESS
    }

    /// Check every field against its documented range.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidSettings`] naming the first field
    /// that is non-finite or out of range.
    pub fn validate(&self) -> Result<(), PipelineError> {
        let checks: [(&str, f32, bool); 5] = [
            ("brightness", self.brightness, self.brightness > 0.0),
            ("contrast", self.contrast, self.contrast >= 0.0),
            ("saturation", self.saturation, self.saturation >= 0.0),
            ("vignette", self.vignette, self.vignette >= 0.0),
            ("sharpness", self.sharpness, self.sharpness >= 0.0),
        ];
        for (name, value, in_range) in checks {
            if !value.is_finite() {
                return Err(PipelineError::InvalidSettings(format!(
                    "{name} must be finite, got {value}"
                )));
            }
            if !in_range {
                return Err(PipelineError::InvalidSettings(format!(
                    "{name} is out of range: {value}"
                )));
            }
        }
        Ok(())
    }
}

impl Default for EditSettings {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Errors that can occur during a pipeline run.
///
/// Every variant is fatal to the single call that produced it and never
/// to the process.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// The input bytes are not a decodable image.
    #[error("failed to decode image: {0}")]
    Decode(#[source] image::ImageError),

    /// Re-encoding the edited raster failed.
    #[error("failed to encode image: {0}")]
    Encode(#[source] image::ImageError),

    /// A settings field is non-finite or outside its range.
    #[error("invalid edit settings: {0}")]
    InvalidSettings(String),
}
