// Scribe Core Library
// Action routing, cross-context messaging, and local persistence for the text assistant

pub mod types;
pub mod error;
pub mod registry;
pub mod storage;
pub mod preferences;
pub mod mailbox;
pub mod csv;
pub mod history;
pub mod usage;
pub mod backend;
pub mod format;
pub mod clipboard;
pub mod router;
pub mod selection;
pub mod messenger;
pub mod menu;
pub mod capture;
pub mod surface;
pub mod export;

// Re-export commonly used types
pub use types::*;
pub use error::{AssistError, AssistResult, BackendError, StorageError, StorageResult, ValidationError};
pub use registry::{ActionRegistry, ActionSpec, Capability};
pub use storage::{Scope, Store};
pub use storage::memory::MemoryStore;
pub use storage::sqlite::SqliteStore;
pub use preferences::Preferences;
pub use mailbox::Mailbox;
pub use history::{HistoryFilter, HistoryRecorder, HistoryStats, Retention, SortOrder, TimeWindow};
pub use usage::UsageCounter;
pub use backend::{Capabilities, ProcessRequest, ProcessingBackend};
pub use clipboard::Clipboard;
pub use router::{ActionOutcome, ActionRouter};
pub use messenger::{Messenger, Request, SelectionResponse, SurfaceSignal};
pub use selection::{PageHandle, SelectionBuffer, SelectionSource};
pub use surface::{InputMode, OpenReport, Surface};
pub use export::{Backup, ExportWriter};
