//! retouch-session: interactive editing state around `retouch-pipeline`.
//!
//! - [`EditSession`] / [`EditHistory`]: committed versions and undo/redo.
//! - [`PreviewScheduler`]: debounced, coalescing previews on a worker
//!   thread, with stale results filtered by [`Token`].
//! - [`ExportRunner`]: full-resolution exports that supersede each other.
//! - [`Editor`]: the three wired together for a shell's event loop.
//! - [`ImageSource`]: contract for producing new source images.
//! - [`settings`]: persisted preferences and prompt history.

use std::sync::Arc;

pub mod editor;
pub mod export;
pub mod history;
pub mod scheduler;
pub mod session;
pub mod settings;
pub mod source;
pub mod worker;

pub use editor::{Editor, EditorEvent};
pub use export::{ExportError, ExportEvent, ExportId, ExportRunner};
pub use history::EditHistory;
pub use scheduler::{PreviewEvent, PreviewScheduler, PreviewState, SchedulerConfig};
pub use session::EditSession;
pub use settings::{AppSettings, PromptHistory, SettingsError};
pub use source::{
    AspectRatio, FocalLength, Generated, ImageSource, Lens, SourceError, WithPlaceholder,
    classify_upstream_error, compose_prompt,
};
pub use worker::{PipelineWorker, Token};

/// Shared, immutable encoded image.
pub type ImageBytes = Arc<[u8]>;
