//! # In-memory Document Store
//!
//! Reference backend for the editor: keeps every document and its
//! append-only history behind one `RwLock`, so a history listing never
//! observes a half-written entry.
//!
//! ## History encoding
//!
//! ```text
//! Snapshot:          [S] [S] [S] [S] [S] ...
//! Delta (every 3):   [S] [Δ] [Δ] [S] [Δ] [Δ] [S] ...
//! ```
//!
//! Either way `classdraft_editor::reconstruct` recovers the content as of
//! any entry.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use classdraft_common::{
    Content, ContentPatch, DocumentId, DocumentKind, DocumentRecord, EntrySource, HistoryEntry,
    HistoryEntryId, HistoryPayload, SaveRequest,
};
use classdraft_editor::{try_reconstruct, PersistenceClient, PersistenceError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// How history payloads are stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum HistoryStrategy {
    /// Every entry carries the full content
    #[default]
    Snapshot,
    /// Entries carry a patch against the previous one; every
    /// `keyframe_every`-th entry is a full snapshot
    Delta { keyframe_every: usize },
}

impl HistoryStrategy {
    fn payload(&self, position: usize, previous: &Content, content: &Content) -> HistoryPayload {
        match *self {
            HistoryStrategy::Delta { keyframe_every } if position % keyframe_every.max(1) != 0 => {
                HistoryPayload::Delta {
                    patch: ContentPatch::diff(previous, content),
                }
            }
            _ => HistoryPayload::Snapshot {
                content: content.clone(),
            },
        }
    }
}

#[derive(Debug)]
struct StoredDocument {
    record: DocumentRecord,
    history: Vec<HistoryEntry>,
}

#[derive(Debug, Default)]
struct StoreState {
    documents: HashMap<DocumentId, StoredDocument>,
    next_entry_id: u64,
}

impl StoreState {
    fn document(&self, id: &DocumentId) -> Result<&StoredDocument, PersistenceError> {
        self.documents
            .get(id)
            .ok_or_else(|| PersistenceError::NotFound(id.clone()))
    }

    fn document_mut(&mut self, id: &DocumentId) -> Result<&mut StoredDocument, PersistenceError> {
        self.documents
            .get_mut(id)
            .ok_or_else(|| PersistenceError::NotFound(id.clone()))
    }

    fn allocate_entry_id(&mut self) -> HistoryEntryId {
        self.next_entry_id += 1;
        HistoryEntryId(self.next_entry_id)
    }
}

/// Thread-safe in-memory store implementing [`PersistenceClient`]
#[derive(Debug, Default)]
pub struct MemoryStore {
    strategy: HistoryStrategy,
    state: RwLock<StoreState>,
}

impl MemoryStore {
    pub fn new(strategy: HistoryStrategy) -> Self {
        Self {
            strategy,
            state: RwLock::new(StoreState::default()),
        }
    }

    pub fn strategy(&self) -> HistoryStrategy {
        self.strategy
    }

    /// Create an empty document
    pub async fn create_document(
        &self,
        id: DocumentId,
        kind: DocumentKind,
    ) -> Result<DocumentRecord, PersistenceError> {
        if id.as_str().trim().is_empty() {
            return Err(PersistenceError::Validation("document id is empty".to_string()));
        }

        let mut state = self.state.write().await;
        if state.documents.contains_key(&id) {
            return Err(PersistenceError::Validation(format!(
                "document {} already exists",
                id
            )));
        }

        let record = DocumentRecord::new(id.clone(), kind, Utc::now());
        state.documents.insert(
            id.clone(),
            StoredDocument {
                record: record.clone(),
                history: Vec::new(),
            },
        );
        tracing::info!(document_id = %id, ?kind, "created document");
        Ok(record)
    }

    /// Record a grade on a submitted document
    pub async fn grade(&self, id: &DocumentId) -> Result<DocumentRecord, PersistenceError> {
        let mut state = self.state.write().await;
        let document = state.document_mut(id)?;
        if !document.record.is_submitted {
            return Err(PersistenceError::Validation(format!(
                "document {} has not been submitted",
                id
            )));
        }
        document.record.graded_at = Some(Utc::now());
        Ok(document.record.clone())
    }

    /// Hand a graded document back to the student
    pub async fn return_to_student(
        &self,
        id: &DocumentId,
    ) -> Result<DocumentRecord, PersistenceError> {
        let mut state = self.state.write().await;
        let document = state.document_mut(id)?;
        if document.record.graded_at.is_none() {
            return Err(PersistenceError::Validation(format!(
                "document {} has not been graded",
                id
            )));
        }
        document.record.returned_at = Some(Utc::now());
        Ok(document.record.clone())
    }

    /// History entries, oldest first
    pub async fn entries(&self, id: &DocumentId) -> Result<Vec<HistoryEntry>, PersistenceError> {
        let state = self.state.read().await;
        Ok(state.document(id)?.history.clone())
    }

    pub async fn document_ids(&self) -> Vec<DocumentId> {
        let state = self.state.read().await;
        let mut ids: Vec<DocumentId> = state.documents.keys().cloned().collect();
        ids.sort();
        ids
    }

    fn commit(
        &self,
        state: &mut StoreState,
        id: &DocumentId,
        content: Content,
        source: EntrySource,
        restored_from: Option<HistoryEntryId>,
    ) -> Result<DocumentRecord, PersistenceError> {
        let entry_id = state.allocate_entry_id();
        let strategy = self.strategy;
        let document = state.document_mut(id)?;

        // Entry order is (created_at, id); never let the clock step back
        let created_at = latest_time(&document.history, Utc::now());
        let payload = strategy.payload(document.history.len(), &document.record.content, &content);

        document.history.push(HistoryEntry {
            id: entry_id,
            document_id: id.clone(),
            created_at,
            char_count: content.char_count(),
            source,
            restored_from,
            payload,
        });

        document.record.char_count = content.char_count();
        document.record.content = content;
        document.record.updated_at = created_at;

        tracing::info!(
            document_id = %id,
            entry_id = %entry_id,
            ?source,
            chars = document.record.char_count,
            "committed history entry"
        );
        Ok(document.record.clone())
    }
}

fn latest_time(history: &[HistoryEntry], now: DateTime<Utc>) -> DateTime<Utc> {
    match history.last() {
        Some(last) if last.created_at > now => last.created_at,
        _ => now,
    }
}

#[async_trait]
impl PersistenceClient for MemoryStore {
    async fn load(&self, document_id: &DocumentId) -> Result<DocumentRecord, PersistenceError> {
        let state = self.state.read().await;
        Ok(state.document(document_id)?.record.clone())
    }

    async fn save(
        &self,
        document_id: &DocumentId,
        request: SaveRequest,
    ) -> Result<DocumentRecord, PersistenceError> {
        let mut state = self.state.write().await;
        let document = state.document(document_id)?;
        if document.record.is_locked() {
            tracing::warn!(document_id = %document_id, "rejecting save to a locked document");
            return Err(PersistenceError::Locked(document_id.clone()));
        }
        if document.record.content == request.content {
            tracing::debug!(document_id = %document_id, trigger = %request.trigger, "content unchanged");
            return Ok(document.record.clone());
        }

        self.commit(
            &mut state,
            document_id,
            request.content,
            request.trigger.into(),
            None,
        )
    }

    async fn submit(&self, document_id: &DocumentId) -> Result<DocumentRecord, PersistenceError> {
        let mut state = self.state.write().await;
        let document = state.document_mut(document_id)?;
        if document.record.kind == DocumentKind::AssignmentInstructions {
            return Err(PersistenceError::Validation(
                "assignment instructions cannot be submitted".to_string(),
            ));
        }
        if document.record.is_submitted {
            return Ok(document.record.clone());
        }

        document.record.is_submitted = true;
        document.record.submitted_at = Some(Utc::now());
        document.record.graded_at = None;
        document.record.returned_at = None;
        tracing::info!(document_id = %document_id, "submitted");
        Ok(document.record.clone())
    }

    async fn unsubmit(&self, document_id: &DocumentId) -> Result<DocumentRecord, PersistenceError> {
        let mut state = self.state.write().await;
        let document = state.document_mut(document_id)?;
        if !document.record.is_submitted {
            return Err(PersistenceError::Validation(format!(
                "document {} is not submitted",
                document_id
            )));
        }
        if !document.record.can_unsubmit() {
            return Err(PersistenceError::Validation(format!(
                "document {} is graded and has not been returned",
                document_id
            )));
        }

        document.record.is_submitted = false;
        document.record.submitted_at = None;
        tracing::info!(document_id = %document_id, "unsubmitted");
        Ok(document.record.clone())
    }

    async fn list_history(
        &self,
        document_id: &DocumentId,
    ) -> Result<Vec<HistoryEntry>, PersistenceError> {
        let state = self.state.read().await;
        let mut entries = state.document(document_id)?.history.clone();
        entries.reverse();
        Ok(entries)
    }

    async fn restore(
        &self,
        document_id: &DocumentId,
        entry_id: HistoryEntryId,
    ) -> Result<DocumentRecord, PersistenceError> {
        let mut state = self.state.write().await;
        let document = state.document(document_id)?;
        if document.record.is_locked() {
            return Err(PersistenceError::Locked(document_id.clone()));
        }

        let content = try_reconstruct(&document.history, entry_id)
            .map_err(|err| {
                tracing::error!(document_id = %document_id, %entry_id, error = %err, "history replay failed");
                PersistenceError::Transient(format!("history for {} is unreadable", document_id))
            })?
            .ok_or_else(|| PersistenceError::StaleReference {
                document_id: document_id.clone(),
                entry_id,
            })?;

        self.commit(
            &mut state,
            document_id,
            content,
            EntrySource::Restore,
            Some(entry_id),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use classdraft_common::SaveTrigger;

    fn save(text: &str) -> SaveRequest {
        SaveRequest {
            content: Content::paragraph(text),
            trigger: SaveTrigger::Autosave,
        }
    }

    async fn store_with_doc(strategy: HistoryStrategy) -> (MemoryStore, DocumentId) {
        let store = MemoryStore::new(strategy);
        let id = DocumentId::new("essay");
        store
            .create_document(id.clone(), DocumentKind::AssignmentResponse)
            .await
            .unwrap();
        (store, id)
    }

    #[tokio::test]
    async fn test_identical_save_adds_no_entry() {
        let (store, id) = store_with_doc(HistoryStrategy::Snapshot).await;

        store.save(&id, save("hello")).await.unwrap();
        store.save(&id, save("hello")).await.unwrap();

        assert_eq!(store.entries(&id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delta_strategy_inserts_keyframes() {
        let (store, id) = store_with_doc(HistoryStrategy::Delta { keyframe_every: 3 }).await;
        for text in ["a", "ab", "abc", "abcd", "abcde"] {
            store.save(&id, save(text)).await.unwrap();
        }

        let kinds: Vec<bool> = store
            .entries(&id)
            .await
            .unwrap()
            .iter()
            .map(|entry| matches!(entry.payload, HistoryPayload::Snapshot { .. }))
            .collect();
        assert_eq!(kinds, vec![true, false, false, true, false]);
    }

    #[tokio::test]
    async fn test_history_is_listed_newest_first() {
        let (store, id) = store_with_doc(HistoryStrategy::Snapshot).await;
        store.save(&id, save("one")).await.unwrap();
        store.save(&id, save("two")).await.unwrap();

        let listing = store.list_history(&id).await.unwrap();
        assert!(listing[0].id > listing[1].id);
        assert!(listing[0].created_at >= listing[1].created_at);
    }

    #[tokio::test]
    async fn test_submitted_document_rejects_saves() {
        let (store, id) = store_with_doc(HistoryStrategy::Snapshot).await;
        store.submit(&id).await.unwrap();

        assert_eq!(
            store.save(&id, save("late")).await,
            Err(PersistenceError::Locked(id.clone()))
        );
    }

    #[tokio::test]
    async fn test_graded_document_cannot_be_unsubmitted_until_returned() {
        let (store, id) = store_with_doc(HistoryStrategy::Snapshot).await;
        store.submit(&id).await.unwrap();
        store.grade(&id).await.unwrap();

        assert!(matches!(
            store.unsubmit(&id).await,
            Err(PersistenceError::Validation(_))
        ));

        store.return_to_student(&id).await.unwrap();
        let record = store.unsubmit(&id).await.unwrap();
        assert!(!record.is_locked());
    }

    #[tokio::test]
    async fn test_instructions_cannot_be_submitted() {
        let store = MemoryStore::default();
        let id = DocumentId::new("prompt");
        store
            .create_document(id.clone(), DocumentKind::AssignmentInstructions)
            .await
            .unwrap();

        assert!(matches!(
            store.submit(&id).await,
            Err(PersistenceError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_unknown_document_is_not_found() {
        let store = MemoryStore::default();
        let id = DocumentId::new("missing");
        assert_eq!(store.load(&id).await, Err(PersistenceError::NotFound(id)));
    }

    #[tokio::test]
    async fn test_duplicate_document_is_rejected() {
        let (store, id) = store_with_doc(HistoryStrategy::Snapshot).await;
        assert!(store
            .create_document(id, DocumentKind::AssignmentResponse)
            .await
            .is_err());
    }
}
