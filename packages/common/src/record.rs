//! Records exchanged with the persistence backend.

use crate::content::Content;
use crate::patch::ContentPatch;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque document identifier (e.g. an assignment-submission id)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for DocumentId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// History entry identifier, strictly increasing in creation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HistoryEntryId(pub u64);

impl fmt::Display for HistoryEntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which workflow owns a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    /// A student's response to an assignment
    AssignmentResponse,
    /// A teacher's instructions for an assignment
    AssignmentInstructions,
}

/// Why a save was requested
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveTrigger {
    Autosave,
    Blur,
    Force,
}

impl fmt::Display for SaveTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SaveTrigger::Autosave => write!(f, "autosave"),
            SaveTrigger::Blur => write!(f, "blur"),
            SaveTrigger::Force => write!(f, "force"),
        }
    }
}

/// The value a caller wants persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveRequest {
    pub content: Content,
    pub trigger: SaveTrigger,
}

/// One persisted unit of editable content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: DocumentId,
    pub kind: DocumentKind,
    pub content: Content,
    pub char_count: usize,
    pub is_submitted: bool,
    pub submitted_at: Option<DateTime<Utc>>,
    pub graded_at: Option<DateTime<Utc>>,
    pub returned_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl DocumentRecord {
    /// Create a fresh, empty document
    pub fn new(id: DocumentId, kind: DocumentKind, now: DateTime<Utc>) -> Self {
        Self {
            id,
            kind,
            content: Content::empty(),
            char_count: 0,
            is_submitted: false,
            submitted_at: None,
            graded_at: None,
            returned_at: None,
            updated_at: now,
        }
    }

    /// Submitted documents are read-only until unsubmitted
    pub fn is_locked(&self) -> bool {
        self.is_submitted
    }

    /// Graded work may only be unsubmitted once it has been returned
    pub fn can_unsubmit(&self) -> bool {
        self.is_submitted && (self.graded_at.is_none() || self.returned_at.is_some())
    }
}

/// What produced a history entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntrySource {
    Autosave,
    Blur,
    Force,
    Restore,
}

impl From<SaveTrigger> for EntrySource {
    fn from(trigger: SaveTrigger) -> Self {
        match trigger {
            SaveTrigger::Autosave => EntrySource::Autosave,
            SaveTrigger::Blur => EntrySource::Blur,
            SaveTrigger::Force => EntrySource::Force,
        }
    }
}

/// How an entry encodes its content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HistoryPayload {
    /// The full content at this point
    Snapshot { content: Content },
    /// Changes against the previous entry's content
    Delta { patch: ContentPatch },
}

/// Immutable record of one committed save
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: HistoryEntryId,
    pub document_id: DocumentId,
    pub created_at: DateTime<Utc>,
    pub char_count: usize,
    pub source: EntrySource,
    /// Entry whose content a restore replayed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restored_from: Option<HistoryEntryId>,
    pub payload: HistoryPayload,
}

impl HistoryEntry {
    /// Total order of entries within a document
    pub fn sort_key(&self) -> (DateTime<Utc>, HistoryEntryId) {
        (self.created_at, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_document_lock_gates() {
        let mut doc = DocumentRecord::new("sub-1".into(), DocumentKind::AssignmentResponse, Utc::now());
        assert!(!doc.is_locked());
        assert!(!doc.can_unsubmit());

        doc.is_submitted = true;
        assert!(doc.is_locked());
        assert!(doc.can_unsubmit());

        doc.graded_at = Some(Utc::now());
        assert!(!doc.can_unsubmit());

        doc.returned_at = Some(Utc::now());
        assert!(doc.can_unsubmit());
    }

    #[test]
    fn test_history_entry_wire_format() {
        let entry = HistoryEntry {
            id: HistoryEntryId(7),
            document_id: "sub-1".into(),
            created_at: "2026-01-05T10:00:00Z".parse().unwrap(),
            char_count: 2,
            source: EntrySource::Blur,
            restored_from: None,
            payload: HistoryPayload::Snapshot {
                content: Content::from("hi"),
            },
        };

        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["id"], json!(7));
        assert_eq!(value["source"], json!("blur"));
        assert_eq!(value["payload"], json!({ "kind": "snapshot", "content": "hi" }));
        assert!(value.get("restored_from").is_none());

        let back: HistoryEntry = serde_json::from_value(value).unwrap();
        assert_eq!(back, entry);
    }

    #[test]
    fn test_save_request_rejects_malformed_content() {
        let err = serde_json::from_value::<SaveRequest>(json!({ "content": 3, "trigger": "force" }));
        assert!(err.is_err());
    }
}
