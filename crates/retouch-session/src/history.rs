//! Undo/redo stacks over committed image versions.

use crate::ImageBytes;

/// Bounded-by-memory undo/redo history of committed originals.
///
/// The history holds the versions *around* the current original; the
/// current one itself is owned by the caller and passed in on every
/// transition. Buffers are shared (`Arc`), so moving between stacks never
/// copies pixels.
#[derive(Debug, Clone, Default)]
pub struct EditHistory {
    undo: Vec<ImageBytes>,
    redo: Vec<ImageBytes>,
}

impl EditHistory {
    /// Empty history.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            undo: Vec::new(),
            redo: Vec::new(),
        }
    }

    /// Record that `previous` was replaced by a new commit.
    ///
    /// Clears the redo stack: a new commit forks the timeline.
    pub fn commit(&mut self, previous: ImageBytes) {
        self.undo.push(previous);
        self.redo.clear();
    }

    /// Step back. Returns the version to make current, or `None` (and
    /// leaves `current` untouched) when there is nothing to undo.
    #[must_use]
    pub fn undo(&mut self, current: ImageBytes) -> Option<ImageBytes> {
        let previous = self.undo.pop()?;
        self.redo.push(current);
        Some(previous)
    }

    /// Step forward. Mirror of [`Self::undo`].
    #[must_use]
    pub fn redo(&mut self, current: ImageBytes) -> Option<ImageBytes> {
        let next = self.redo.pop()?;
        self.undo.push(current);
        Some(next)
    }

    /// Drop everything, e.g. when a brand-new image is loaded.
    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Number of versions available to undo.
    #[must_use]
    pub fn undo_depth(&self) -> usize {
        self.undo.len()
    }

    /// Number of versions available to redo.
    #[must_use]
    pub fn redo_depth(&self) -> usize {
        self.redo.len()
    }
}
