//! Persisted application settings and prompt history.
//!
//! Both are small JSON files under the platform configuration directory.
//! Every function also takes an explicit path so callers (and tests) can
//! put them anywhere.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::source::{AspectRatio, FocalLength, Lens, compose_prompt};

/// Subdirectory of the platform config dir holding our files.
pub const APP_DIR: &str = "retouch";

/// File name of [`AppSettings`].
pub const SETTINGS_FILE: &str = "settings.json";

/// File name of [`PromptHistory`].
pub const PROMPT_HISTORY_FILE: &str = "prompt_history.json";

/// Errors reading or writing persisted files.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// The platform has no configuration directory.
    #[error("no configuration directory available on this platform")]
    NoConfigDir,

    /// Reading, writing or creating a directory failed.
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file exists but is not valid JSON for this type.
    #[error("malformed JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// `<config dir>/retouch`.
///
/// # Errors
///
/// Returns [`SettingsError::NoConfigDir`] if the platform has no config
/// directory.
pub fn config_dir() -> Result<PathBuf, SettingsError> {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR))
        .ok_or(SettingsError::NoConfigDir)
}

/// Last window placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowGeometry {
    /// Left edge in screen coordinates.
    pub x: i32,
    /// Top edge in screen coordinates.
    pub y: i32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// Preferences restored at startup.
///
/// Unknown keys are ignored and missing keys take their defaults, so
/// files written by other versions still load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Window placement, if one was saved.
    pub window: Option<WindowGeometry>,
    /// Selected lens modifier.
    pub lens: Lens,
    /// Selected focal-length modifier.
    pub focal_length: FocalLength,
    /// Aspect ratio requested from the image source.
    pub aspect_ratio: AspectRatio,
    /// Ask for high resolution in composed prompts.
    pub high_res: bool,
}

impl AppSettings {
    /// [`compose_prompt`] with the saved lens, focal length and high-res
    /// choice.
    #[must_use]
    pub fn compose_prompt(&self, base: &str) -> String {
        compose_prompt(base, self.lens, self.focal_length, self.high_res)
    }

    /// Load from `path`. A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Io`] or [`SettingsError::Json`] if the
    /// file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        Ok(read_json(path)?.unwrap_or_default())
    }

    /// Load, falling back to defaults (with a warning) on any error.
    #[must_use]
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_else(|err| {
            log::warn!("ignoring unreadable settings: {err}");
            Self::default()
        })
    }

    /// Write to `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Io`] if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        write_json(path, self)
    }

    /// `<config dir>/retouch/settings.json`.
    ///
    /// # Errors
    ///
    /// See [`config_dir`].
    pub fn default_path() -> Result<PathBuf, SettingsError> {
        Ok(config_dir()?.join(SETTINGS_FILE))
    }
}

/// Recently used prompts, most recent first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptHistory {
    entries: Vec<String>,
}

impl PromptHistory {
    /// Maximum number of prompts kept.
    pub const CAPACITY: usize = 50;

    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Build from stored entries: blanks dropped, duplicates collapsed to
    /// their first (most recent) occurrence, truncated to capacity.
    #[must_use]
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut history = Self::new();
        for entry in entries {
            let trimmed = entry.trim();
            if trimmed.is_empty() || history.entries.iter().any(|e| e == trimmed) {
                continue;
            }
            history.entries.push(trimmed.to_owned());
            if history.entries.len() == Self::CAPACITY {
                break;
            }
        }
        history
    }

    /// Put `prompt` at the front. Returns `false` for blank prompts.
    pub fn record(&mut self, prompt: &str) -> bool {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return false;
        }
        self.entries.retain(|e| e != prompt);
        self.entries.insert(0, prompt.to_owned());
        self.entries.truncate(Self::CAPACITY);
        true
    }

    #[must_use]
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    #[must_use]
    pub fn most_recent(&self) -> Option<&str> {
        self.entries.first().map(String::as_str)
    }

    /// Load from `path`. A missing file yields an empty history.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Io`] or [`SettingsError::Json`] if the
    /// file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let entries: Option<Vec<String>> = read_json(path)?;
        Ok(Self::from_entries(entries.unwrap_or_default()))
    }

    /// Write to `path` as a JSON array.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Io`] if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        write_json(path, &self.entries)
    }

    /// `<config dir>/retouch/prompt_history.json`.
    ///
    /// # Errors
    ///
    /// See [`config_dir`].
    pub fn default_path() -> Result<PathBuf, SettingsError> {
        Ok(config_dir()?.join(PROMPT_HISTORY_FILE))
    }
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<Option<T>, SettingsError> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(SettingsError::Io {
                path: path.to_owned(),
                source,
            });
        }
    };
    serde_json::from_str(&text)
        .map(Some)
        .map_err(|source| SettingsError::Json {
            path: path.to_owned(),
            source,
        })
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), SettingsError> {
    let io_err = |source| SettingsError::Io {
        path: path.to_owned(),
        source,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    let json = serde_json::to_string_pretty(value).map_err(|source| SettingsError::Json {
        path: path.to_owned(),
        source,
    })?;
    std::fs::write(path, json).map_err(io_err)
}
