//! Error types for the editor

use crate::client::PersistenceError;
use crate::config::ConfigError;
use crate::history::HistoryError;
use classdraft_common::{DocumentId, HistoryEntryId};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EditorError {
    #[error("Validation error: {0}")]
    Validation(String),

    /// Network or server failure; the draft stays unsaved
    #[error("Could not reach the server: {0}")]
    Transient(String),

    #[error("Version {entry_id} is no longer available")]
    StaleReference { entry_id: HistoryEntryId },

    #[error("Document {0} is read-only")]
    Locked(DocumentId),

    #[error("Document {0} not found")]
    NotFound(DocumentId),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("History error: {0}")]
    History(#[from] HistoryError),

    #[error("Edit session has closed")]
    SessionClosed,
}

impl From<PersistenceError> for EditorError {
    fn from(e: PersistenceError) -> Self {
        match e {
            PersistenceError::Validation(message) => EditorError::Validation(message),
            PersistenceError::NotFound(id) => EditorError::NotFound(id),
            PersistenceError::Locked(id) => EditorError::Locked(id),
            PersistenceError::StaleReference { entry_id, .. } => {
                EditorError::StaleReference { entry_id }
            }
            PersistenceError::Transient(message) => EditorError::Transient(message),
        }
    }
}
