//! Contract for whatever produces new source images.
//!
//! The session does not know how images are generated. It talks to an
//! [`ImageSource`], which either returns encoded bytes or one of a small,
//! closed set of [`SourceError`]s. Provider-specific error text is mapped
//! into that taxonomy with [`classify_upstream_error`].

use serde::{Deserialize, Serialize};

use retouch_pipeline::{PipelineError, RgbImage, codec};

/// Output framing requested from the source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "16:9")]
    Widescreen,
    #[serde(rename = "9:16")]
    Portrait,
    #[serde(rename = "4:3")]
    Standard,
    #[serde(rename = "3:4")]
    StandardPortrait,
}

impl AspectRatio {
    pub const ALL: [Self; 5] = [
        Self::Square,
        Self::Widescreen,
        Self::Portrait,
        Self::Standard,
        Self::StandardPortrait,
    ];

    /// The `W:H` label sent to providers.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Square => "1:1",
            Self::Widescreen => "16:9",
            Self::Portrait => "9:16",
            Self::Standard => "4:3",
            Self::StandardPortrait => "3:4",
        }
    }
}

impl std::fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lens style appended to the prompt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Lens {
    #[default]
    None,
    #[serde(rename = "Macro lens")]
    Macro,
    Fisheye,
    #[serde(rename = "Wide-angle")]
    WideAngle,
    Telephoto,
    #[serde(rename = "Telephoto zoom")]
    TelephotoZoom,
}

impl Lens {
    /// Prompt text, or `None` when no lens is selected.
    #[must_use]
    pub const fn label(self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Macro => Some("Macro lens"),
            Self::Fisheye => Some("Fisheye"),
            Self::WideAngle => Some("Wide-angle"),
            Self::Telephoto => Some("Telephoto"),
            Self::TelephotoZoom => Some("Telephoto zoom"),
        }
    }

    const fn is_telephoto(self) -> bool {
        matches!(self, Self::Telephoto | Self::TelephotoZoom)
    }
}

/// Focal length appended to the prompt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FocalLength {
    #[default]
    None,
    #[serde(rename = "10mm")]
    Mm10,
    #[serde(rename = "24mm")]
    Mm24,
    #[serde(rename = "35mm")]
    Mm35,
    #[serde(rename = "50mm")]
    Mm50,
    #[serde(rename = "85mm")]
    Mm85,
    #[serde(rename = "100mm")]
    Mm100,
    #[serde(rename = "200mm")]
    Mm200,
    #[serde(rename = "60-105mm")]
    Mm60To105,
}

impl FocalLength {
    /// Prompt text, or `None` when no focal length is selected.
    #[must_use]
    pub const fn label(self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Mm10 => Some("10mm"),
            Self::Mm24 => Some("24mm"),
            Self::Mm35 => Some("35mm"),
            Self::Mm50 => Some("50mm"),
            Self::Mm85 => Some("85mm"),
            Self::Mm100 => Some("100mm"),
            Self::Mm200 => Some("200mm"),
            Self::Mm60To105 => Some("60-105mm"),
        }
    }
}

/// Suffix appended to prompts when high resolution is requested.
pub const HIGH_RES_SUFFIX: &str = "in high resolution";

/// Append the lens and focal-length modifiers to a prompt.
///
/// Telephoto lenses read as "200mm, Telephoto"; everything else as
/// "35mm Wide-angle". The base prompt is trimmed first. With `high_res`
/// set, [`HIGH_RES_SUFFIX`] goes after the modifier.
#[must_use]
pub fn compose_prompt(base: &str, lens: Lens, focal: FocalLength, high_res: bool) -> String {
    let modifier = match (focal.label(), lens.label()) {
        (Some(f), Some(l)) if lens.is_telephoto() => Some(format!("{f}, {l}")),
        (Some(f), Some(l)) => Some(format!("{f} {l}")),
        (Some(only), None) | (None, Some(only)) => Some(only.to_owned()),
        (None, None) => None,
    };
    let suffix = high_res.then(|| HIGH_RES_SUFFIX.to_owned());

    let mut prompt = base.trim().to_owned();
    for part in modifier.into_iter().chain(suffix) {
        if !prompt.is_empty() {
            prompt.push_str(", ");
        }
        prompt.push_str(&part);
    }
    prompt
}

/// A freshly produced source image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generated {
    /// Encoded image.
    pub bytes: Vec<u8>,
    /// Which model (or fallback) produced it.
    pub model: String,
    /// Lines to overlay on the image, if the shell should explain something.
    pub notice: Option<Vec<String>>,
}

/// Why a source could not produce an image.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    /// No usable API key.
    #[error("no API credential is configured for the image service; add one in settings")]
    MissingCredential,

    /// The account must enable billing before generating.
    #[error("the image service requires billing to be enabled on this account")]
    BillingRequired,

    /// Every provider failed; carries the last provider's message.
    #[error("every image model failed; last error: {last_error}")]
    AllProvidersExhausted { last_error: String },
}

/// Produces encoded images from prompts.
pub trait ImageSource {
    /// Generate an image for `prompt` at `aspect_ratio`.
    ///
    /// # Errors
    ///
    /// See [`SourceError`].
    fn generate(&self, prompt: &str, aspect_ratio: AspectRatio) -> Result<Generated, SourceError>;
}

/// Map provider error text onto [`SourceError`].
///
/// Returns `None` for anything that is not recognizably a billing or
/// credential problem; callers treat those as a provider failure and move
/// on to the next one.
#[must_use]
pub fn classify_upstream_error(message: &str) -> Option<SourceError> {
    let lower = message.to_lowercase();
    if lower.contains("billing") || lower.contains("billed") {
        Some(SourceError::BillingRequired)
    } else if lower.contains("api key") || lower.contains("api_key") || lower.contains("credential")
    {
        Some(SourceError::MissingCredential)
    } else {
        None
    }
}

/// Placeholder raster width.
pub const PLACEHOLDER_WIDTH: u32 = 1024;
/// Placeholder raster height.
pub const PLACEHOLDER_HEIGHT: u32 = 768;

/// Placeholder background color.
pub const PLACEHOLDER_COLOR: [u8; 3] = [28, 28, 30];

/// Model name reported for placeholder images.
pub const PLACEHOLDER_MODEL: &str = "placeholder";

/// Notice wrap width in characters.
const NOTICE_COLUMNS: usize = 64;

/// Source wrapper that substitutes a placeholder when no image can be made.
///
/// Missing credentials and exhausted providers produce a dark placeholder
/// with the reason in [`Generated::notice`], so the editor stays usable
/// offline. Billing problems always surface: they need user action.
///
/// The placeholder raster itself is blank; shells must draw the
/// `notice` lines over it.
#[derive(Debug, Clone)]
pub struct WithPlaceholder<S> {
    inner: S,
}

impl<S> WithPlaceholder<S> {
    /// Wrap `inner`.
    pub const fn new(inner: S) -> Self {
        Self { inner }
    }

    /// Unwrap the inner source.
    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: ImageSource> ImageSource for WithPlaceholder<S> {
    fn generate(&self, prompt: &str, aspect_ratio: AspectRatio) -> Result<Generated, SourceError> {
        match self.inner.generate(prompt, aspect_ratio) {
            Err(err @ (SourceError::MissingCredential | SourceError::AllProvidersExhausted { .. })) => {
                log::warn!("falling back to placeholder image: {err}");
                match placeholder_png() {
                    Ok(bytes) => Ok(Generated {
                        bytes,
                        model: PLACEHOLDER_MODEL.to_owned(),
                        notice: Some(wrap_words(&err.to_string(), NOTICE_COLUMNS)),
                    }),
                    Err(encode_err) => {
                        log::error!("cannot build placeholder image: {encode_err}");
                        Err(err)
                    }
                }
            }
            other => other,
        }
    }
}

/// Encode the solid placeholder raster.
///
/// # Errors
///
/// Returns [`PipelineError::Encode`] if PNG encoding fails.
pub fn placeholder_png() -> Result<Vec<u8>, PipelineError> {
    let img = RgbImage::from_pixel(
        PLACEHOLDER_WIDTH,
        PLACEHOLDER_HEIGHT,
        image::Rgb(PLACEHOLDER_COLOR),
    );
    codec::encode_png(&img)
}

/// Greedy word wrap. Words longer than `columns` get a line of their own.
#[must_use]
pub fn wrap_words(text: &str, columns: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();
    for word in text.split_whitespace() {
        let fits = line.is_empty() || line.chars().count() + 1 + word.chars().count() <= columns;
        if !fits {
            lines.push(std::mem::take(&mut line));
        }
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(word);
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}
