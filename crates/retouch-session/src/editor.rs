//! Interactive-thread facade over session, previews and exports.
//!
//! A shell (GUI, TUI, test) owns one [`Editor`], forwards user actions to
//! it and calls [`Editor::poll`] from its event loop. Everything here runs
//! on the caller's thread and never blocks on the pipeline.

use std::time::{Duration, Instant};

use retouch_pipeline::{EditSettings, PipelineError, Preset};

use crate::ImageBytes;
use crate::export::{ExportError, ExportEvent, ExportId, ExportRunner};
use crate::scheduler::{PreviewEvent, PreviewScheduler, SchedulerConfig};
use crate::session::EditSession;
use crate::source::Generated;

/// Something the shell should reflect.
#[derive(Debug)]
pub enum EditorEvent {
    /// The displayed image changed.
    PreviewUpdated,
    /// The preview for the current settings failed.
    PreviewFailed(PipelineError),
    /// An export finished.
    ExportFinished { id: ExportId, bytes: Vec<u8> },
    /// An export failed.
    ExportFailed { id: ExportId, error: ExportError },
}

/// Editing state plus its background workers.
pub struct Editor {
    session: EditSession,
    preview: PreviewScheduler,
    export: ExportRunner,
    /// Overlay text from the image source, if any.
    notice: Option<Vec<String>>,
}

impl Editor {
    /// Create an editor with its preview worker running.
    ///
    /// # Errors
    ///
    /// Returns the OS error if the preview thread cannot be spawned.
    pub fn new(config: SchedulerConfig) -> std::io::Result<Self> {
        Ok(Self {
            session: EditSession::new(),
            preview: PreviewScheduler::new(config)?,
            export: ExportRunner::new(),
            notice: None,
        })
    }

    #[must_use]
    pub const fn session(&self) -> &EditSession {
        &self.session
    }

    /// Bytes to display.
    #[must_use]
    pub const fn displayed(&self) -> Option<&ImageBytes> {
        self.session.edited()
    }

    #[must_use]
    pub fn notice(&self) -> Option<&[String]> {
        self.notice.as_deref()
    }

    /// Replace everything with a freshly loaded image.
    pub fn load(&mut self, bytes: impl Into<ImageBytes>) {
        self.session.load(bytes);
        self.notice = None;
        self.refresh_source();
    }

    /// Replace everything with a generated image, keeping its notice.
    pub fn load_generated(&mut self, generated: Generated) {
        log::info!("loaded image from {}", generated.model);
        self.load(generated.bytes);
        self.notice = generated.notice;
    }

    /// A slider moved. The preview follows after the debounce period.
    pub fn adjust(&mut self, settings: EditSettings, now: Instant) {
        self.session.set_settings(settings);
        self.preview.settings_changed(settings, now);
    }

    /// Load a preset's settings and preview them straight away.
    pub fn apply_preset(&mut self, preset: Preset) {
        let settings = preset.settings();
        self.session.set_settings(settings);
        self.preview.request(settings);
    }

    /// Commit the displayed preview.
    pub fn apply(&mut self) -> bool {
        let committed = self.session.apply();
        if committed {
            self.refresh_source();
        }
        committed
    }

    /// Drop the uncommitted preview.
    pub fn reset_edits(&mut self) {
        self.session.reset_edits();
        self.refresh_source();
    }

    pub fn undo(&mut self) -> bool {
        let moved = self.session.undo();
        if moved {
            self.refresh_source();
        }
        moved
    }

    pub fn redo(&mut self) -> bool {
        let moved = self.session.redo();
        if moved {
            self.refresh_source();
        }
        moved
    }

    /// Export the committed image with the current settings.
    ///
    /// Returns `Ok(None)` when no image is loaded.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::Spawn`] if the export thread cannot start.
    pub fn export(&mut self) -> Result<Option<ExportId>, ExportError> {
        let Some(original) = self.session.original().cloned() else {
            return Ok(None);
        };
        self.export
            .start(original, *self.session.settings())
            .map(Some)
    }

    /// Drain background results. Never blocks.
    pub fn poll(&mut self, now: Instant) -> Vec<EditorEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.preview.poll(now) {
            events.push(self.on_preview(event));
        }
        while let Some(event) = self.export.poll() {
            events.push(Self::on_export(event));
        }
        events
    }

    /// Block until the next preview outcome, for tools and tests.
    pub fn wait_preview(&mut self, timeout: Duration) -> Option<EditorEvent> {
        let event = self.preview.wait(timeout)?;
        Some(self.on_preview(event))
    }

    /// Block until the current export reports, for tools and tests.
    pub fn wait_export(&mut self, timeout: Duration) -> Option<EditorEvent> {
        self.export.wait(timeout).map(Self::on_export)
    }

    fn refresh_source(&mut self) {
        if let Some(original) = self.session.original() {
            self.preview.replace_source(ImageBytes::clone(original));
        }
    }

    fn on_preview(&mut self, event: PreviewEvent) -> EditorEvent {
        match event {
            PreviewEvent::Ready { bytes, .. } => {
                self.session.accept_preview(bytes);
                EditorEvent::PreviewUpdated
            }
            PreviewEvent::Failed { error, .. } => EditorEvent::PreviewFailed(error),
        }
    }

    fn on_export(event: ExportEvent) -> EditorEvent {
        match event {
            ExportEvent::Finished { id, bytes } => EditorEvent::ExportFinished { id, bytes },
            ExportEvent::Failed { id, error } => {
                log::warn!("{id} failed: {error}");
                EditorEvent::ExportFailed { id, error }
            }
        }
    }
}
