//! # Classdraft Editor
//!
//! Autosave and version history for classroom documents.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ editor UI: on_change / on_blur / exit       │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ session: one task per open document         │
//! │  - SaveScheduler (debounce + min interval)  │
//! │  - SaveStatus (saved / saving / unsaved)    │
//! │  - sequence-checked save responses          │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ PersistenceClient: load, save, submit,      │
//! │ list_history, restore                       │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ history: HistoryLog → reconstruct →         │
//! │ RestoreWorkflow (preview, confirm)          │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **The last edit is never lost**: flushing on exit always sends it
//! 2. **Bounded save rate**: at most one save call per min interval, unless forced
//! 3. **Newest response wins**: responses carry sequence numbers
//! 4. **History is append-only**: a restore adds an entry, it never rewrites one
//!
//! ## Usage
//!
//! ```rust,ignore
//! use classdraft_editor::{EditSession, RestoreWorkflow};
//!
//! let session = EditSession::open(client, "doc-1".into(), None).await?;
//!
//! session.change(Content::paragraph("The mitochondria"))?;
//! session.blur()?;
//!
//! let mut workflow = RestoreWorkflow::new(session.history().await?);
//! let preview = workflow.preview(entry_id)?;
//! workflow.request_restore(&session.draft())?;
//! workflow.confirm(&session).await?;
//!
//! session.close().await?;
//! ```

mod client;
mod config;
mod errors;
mod history;
mod reconstruct;
mod restore;
mod scheduler;
mod session;
mod status;

pub use client::{PersistenceClient, PersistenceError};
pub use config::{ConfigError, SaveProfile, SchedulerConfig};
pub use errors::EditorError;
pub use history::{HistoryError, HistoryLog, TimelineItem};
pub use reconstruct::{reconstruct, try_reconstruct, Replay};
pub use restore::{Preview, RestoreState, RestoreWorkflow};
pub use scheduler::{Applied, Decision, DraftState, PendingSave, SaveScheduler};
pub use session::{DraftView, EditSession, EditSessionHandle};
pub use status::{SaveStatus, StatusEvent};

// Re-export common types for convenience
pub use classdraft_common::{
    Content, DocumentId, DocumentKind, DocumentRecord, HistoryEntry, HistoryEntryId, SaveRequest,
    SaveTrigger,
};
