//! The image being edited and its committed versions.

use std::sync::Arc;

use retouch_pipeline::EditSettings;

use crate::ImageBytes;
use crate::history::EditHistory;

/// Original and edited buffers plus undo history.
///
/// The *original* is the last committed version; previews are always
/// computed from it. The *edited* buffer is what the user currently sees:
/// either the original itself or the latest accepted preview of it.
#[derive(Debug, Clone, Default)]
pub struct EditSession {
    original: Option<ImageBytes>,
    edited: Option<ImageBytes>,
    settings: EditSettings,
    history: EditHistory,
}

impl EditSession {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            original: None,
            edited: None,
            settings: EditSettings::IDENTITY,
            history: EditHistory::new(),
        }
    }

    /// Start over with a brand-new image. Clears history and settings.
    pub fn load(&mut self, bytes: impl Into<ImageBytes>) {
        let bytes = bytes.into();
        self.edited = Some(Arc::clone(&bytes));
        self.original = Some(bytes);
        self.settings = EditSettings::IDENTITY;
        self.history.clear();
    }

    #[must_use]
    pub const fn original(&self) -> Option<&ImageBytes> {
        self.original.as_ref()
    }

    /// What should be displayed.
    #[must_use]
    pub const fn edited(&self) -> Option<&ImageBytes> {
        self.edited.as_ref()
    }

    #[must_use]
    pub const fn settings(&self) -> &EditSettings {
        &self.settings
    }

    /// Record the settings the user is working with.
    pub const fn set_settings(&mut self, settings: EditSettings) {
        self.settings = settings;
    }

    /// Whether the displayed image differs from the committed one.
    #[must_use]
    pub fn has_uncommitted_preview(&self) -> bool {
        match (&self.original, &self.edited) {
            (Some(original), Some(edited)) => !Arc::ptr_eq(original, edited),
            _ => false,
        }
    }

    /// Show a finished preview.
    pub fn accept_preview(&mut self, bytes: Vec<u8>) {
        if self.original.is_none() {
            log::debug!("ignoring preview with no image loaded");
            return;
        }
        self.edited = Some(Arc::from(bytes));
    }

    /// Commit the displayed preview as the new original.
    ///
    /// The previous original goes onto the undo stack and the settings
    /// return to identity, since their effect is now baked in. Returns
    /// `false` when there is nothing to commit.
    pub fn apply(&mut self) -> bool {
        if !self.has_uncommitted_preview() {
            return false;
        }
        let (Some(previous), Some(edited)) = (self.original.take(), self.edited.clone()) else {
            return false;
        };
        self.history.commit(previous);
        self.original = Some(edited);
        self.settings = EditSettings::IDENTITY;
        true
    }

    /// Throw away the uncommitted preview and return the sliders to
    /// identity. History is unaffected.
    pub fn reset_edits(&mut self) {
        self.edited.clone_from(&self.original);
        self.settings = EditSettings::IDENTITY;
    }

    /// Step back to the previous committed version.
    pub fn undo(&mut self) -> bool {
        self.step(EditHistory::undo)
    }

    /// Step forward again after an undo.
    pub fn redo(&mut self) -> bool {
        self.step(EditHistory::redo)
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    fn step(&mut self, walk: fn(&mut EditHistory, ImageBytes) -> Option<ImageBytes>) -> bool {
        let Some(current) = self.original.clone() else {
            return false;
        };
        let Some(target) = walk(&mut self.history, current) else {
            return false;
        };
        self.edited = Some(Arc::clone(&target));
        self.original = Some(target);
        self.settings = EditSettings::IDENTITY;
        true
    }
}
