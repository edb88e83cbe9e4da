//! Full-resolution export off the interactive thread.
//!
//! Each export gets its own thread. Starting a new export raises the
//! previous one's cancellation flag and bumps the export id; whatever the
//! old thread eventually produces is dropped by id, so only the newest
//! export is ever reported.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossbeam::channel::{self, Receiver, Sender};
use retouch_pipeline::{EditSettings, PipelineError};

use crate::ImageBytes;

/// Identifier of one export request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ExportId(u64);

impl std::fmt::Display for ExportId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "export-{}", self.0)
    }
}

/// Errors from exporting.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// The pipeline rejected the image or settings.
    #[error("export pipeline failed: {0}")]
    Pipeline(#[from] PipelineError),

    /// The OS refused to spawn the export thread.
    #[error("failed to start export thread: {0}")]
    Spawn(#[source] std::io::Error),

    /// The export thread ended without sending a result.
    #[error("export thread exited without a result")]
    WorkerGone,

    /// Saving the PNG failed.
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Reported outcome of the newest export.
#[derive(Debug)]
pub enum ExportEvent {
    /// Encoded PNG of the committed image with the export settings.
    Finished { id: ExportId, bytes: Vec<u8> },
    /// The export could not be produced.
    Failed { id: ExportId, error: ExportError },
}

type Report = (ExportId, Option<Result<Vec<u8>, PipelineError>>);

struct Active {
    id: ExportId,
    cancel: Arc<AtomicBool>,
}

/// Runs exports on short-lived threads, reporting only the newest.
pub struct ExportRunner {
    next: ExportId,
    active: Option<Active>,
    report_tx: Sender<Report>,
    report_rx: Receiver<Report>,
}

impl Default for ExportRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ExportRunner {
    #[must_use]
    pub fn new() -> Self {
        let (report_tx, report_rx) = channel::unbounded();
        Self {
            next: ExportId::default(),
            active: None,
            report_tx,
            report_rx,
        }
    }

    /// Start exporting `source` with `settings`, superseding any export
    /// still running.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::Spawn`] if the thread cannot be created.
    pub fn start(
        &mut self,
        source: ImageBytes,
        settings: EditSettings,
    ) -> Result<ExportId, ExportError> {
        self.cancel();

        self.next = ExportId(self.next.0 + 1);
        let id = self.next;
        let cancel = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancel);
        let tx = self.report_tx.clone();

        std::thread::Builder::new()
            .name(id.to_string())
            .spawn(move || {
                // Checked at the boundaries only; the pipeline itself runs
                // to completion once started.
                let outcome = if flag.load(Ordering::Acquire) {
                    None
                } else {
                    Some(retouch_pipeline::run(&source, &settings))
                };
                let outcome = outcome.filter(|_| !flag.load(Ordering::Acquire));
                // The runner may already be gone; nothing to report to.
                let _ = tx.send((id, outcome));
            })
            .map_err(ExportError::Spawn)?;

        log::debug!("started {id}");
        self.active = Some(Active { id, cancel });
        Ok(id)
    }

    /// Ask the running export, if any, to stop. Its result will not be
    /// reported.
    pub fn cancel(&mut self) {
        if let Some(active) = self.active.take() {
            log::debug!("cancelling {}", active.id);
            active.cancel.store(true, Ordering::Release);
        }
    }

    /// Whether an export is in flight.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.active.is_some()
    }

    /// Take the newest export's outcome without blocking.
    pub fn poll(&mut self) -> Option<ExportEvent> {
        while let Ok(report) = self.report_rx.try_recv() {
            if let Some(event) = self.accept(report) {
                return Some(event);
            }
        }
        None
    }

    /// Block up to `timeout` for the newest export's outcome.
    pub fn wait(&mut self, timeout: Duration) -> Option<ExportEvent> {
        let deadline = std::time::Instant::now() + timeout;
        while self.active.is_some() {
            let remaining = deadline.saturating_duration_since(std::time::Instant::now());
            let report = self.report_rx.recv_timeout(remaining).ok()?;
            if let Some(event) = self.accept(report) {
                return Some(event);
            }
        }
        None
    }

    fn accept(&mut self, (id, outcome): Report) -> Option<ExportEvent> {
        if self.active.as_ref().is_none_or(|active| active.id != id) {
            log::debug!("dropping superseded {id}");
            return None;
        }
        self.active = None;
        Some(match outcome {
            Some(Ok(bytes)) => ExportEvent::Finished { id, bytes },
            Some(Err(err)) => ExportEvent::Failed {
                id,
                error: err.into(),
            },
            None => ExportEvent::Failed {
                id,
                error: ExportError::WorkerGone,
            },
        })
    }
}

/// Append `.png` unless `path` already ends in it (any case).
#[must_use]
pub fn ensure_png_extension(path: &Path) -> PathBuf {
    let is_png = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("png"));
    if is_png {
        path.to_owned()
    } else {
        let mut name = path.as_os_str().to_owned();
        name.push(".png");
        PathBuf::from(name)
    }
}

/// Write exported bytes to `path` (with a `.png` extension enforced).
///
/// # Errors
///
/// Returns [`ExportError::Write`] if the file cannot be written.
pub fn save_png(path: &Path, bytes: &[u8]) -> Result<PathBuf, ExportError> {
    let path = ensure_png_extension(path);
    std::fs::write(&path, bytes).map_err(|source| ExportError::Write {
        path: path.clone(),
        source,
    })?;
    log::info!("saved {} bytes to {}", bytes.len(), path.display());
    Ok(path)
}
