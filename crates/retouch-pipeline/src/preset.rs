//! Named starting points for the adjustment sliders.

use serde::{Deserialize, Serialize};

use crate::types::{EditSettings, FilterKind};

/// A named bundle of adjustments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Preset {
    /// Punchy contrast, a little extra color, noticeable vignette.
    Cinematic,
    /// Muted color with a gentle vignette.
    Filmic,
    /// Strongly saturated, slightly brighter.
    Vibrant,
    /// Lower contrast and a touch of blur.
    Soft,
    /// Heavy contrast and extra sharpening.
    HighContrast,
}

impl Preset {
    /// Every preset, in menu order.
    pub const ALL: [Self; 5] = [
        Self::Cinematic,
        Self::Filmic,
        Self::Vibrant,
        Self::Soft,
        Self::HighContrast,
    ];

    /// Human-readable preset name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Cinematic => "Cinematic",
            Self::Filmic => "Filmic",
            Self::Vibrant => "Vibrant",
            Self::Soft => "Soft",
            Self::HighContrast => "High Contrast",
        }
    }

    /// The settings this preset loads.
    #[must_use]
    pub const fn settings(self) -> EditSettings {
        let (brightness, contrast, saturation, vignette, sharpness) = match self {
            Self::Cinematic => (0.95, 1.20, 1.10, 0.20, 1.10),
            Self::Filmic => (0.95, 1.05, 0.95, 0.18, 1.05),
            Self::Vibrant => (1.05, 1.10, 1.40, 0.0, 1.15),
            Self::Soft => (1.05, 0.90, 0.95, 0.05, 0.85),
            Self::HighContrast => (1.0, 1.40, 1.0, 0.10, 1.20),
        };
        EditSettings {
            filter: FilterKind::None,
            brightness,
            contrast,
            saturation,
            vignette,
            sharpness,
        }
    }
}

impl std::fmt::Display for Preset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
