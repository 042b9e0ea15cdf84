//! # Persistence Client
//!
//! The boundary to the durable backend. The editor core depends on exactly
//! these operations; wire format and transport belong to implementations.
//!
//! Implementations must be `Send + Sync + 'static` so one client can be
//! shared by every edit session and moved into spawned tasks.

use async_trait::async_trait;
use classdraft_common::{DocumentId, DocumentRecord, HistoryEntry, HistoryEntryId, SaveRequest};
use thiserror::Error;

/// Errors a backend can report
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PersistenceError {
    /// Malformed content or missing identifiers; never retried
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("document not found: {0}")]
    NotFound(DocumentId),

    /// The document is submitted (or otherwise read-only)
    #[error("document {0} is locked")]
    Locked(DocumentId),

    /// The referenced history entry is not in the document's history
    #[error("history entry {entry_id} not found for document {document_id}")]
    StaleReference {
        document_id: DocumentId,
        entry_id: HistoryEntryId,
    },

    /// Network or server failure
    #[error("backend unavailable: {0}")]
    Transient(String),
}

impl PersistenceError {
    /// Whether a later edit or flush may succeed by retrying
    pub fn is_retryable(&self) -> bool {
        matches!(self, PersistenceError::Transient(_))
    }
}

#[async_trait]
pub trait PersistenceClient: Send + Sync + 'static {
    /// Fetch the current document
    async fn load(&self, document_id: &DocumentId) -> Result<DocumentRecord, PersistenceError>;

    /// Persist content; idempotent when the content is unchanged
    async fn save(
        &self,
        document_id: &DocumentId,
        request: SaveRequest,
    ) -> Result<DocumentRecord, PersistenceError>;

    /// Mark the document submitted. Callers flush pending edits first.
    async fn submit(&self, document_id: &DocumentId) -> Result<DocumentRecord, PersistenceError>;

    async fn unsubmit(&self, document_id: &DocumentId) -> Result<DocumentRecord, PersistenceError>;

    /// History entries, newest first
    async fn list_history(
        &self,
        document_id: &DocumentId,
    ) -> Result<Vec<HistoryEntry>, PersistenceError>;

    /// Make the content of `entry_id` current again, appending a new entry
    async fn restore(
        &self,
        document_id: &DocumentId,
        entry_id: HistoryEntryId,
    ) -> Result<DocumentRecord, PersistenceError>;
}
