//! # History Log
//!
//! The ordered, append-only list of save records for one document.
//!
//! Backends list history newest-first; the log keeps it oldest-first, which
//! is the order the [reconstructor](crate::reconstruct) replays it in.

use crate::reconstruct;
use chrono::{DateTime, Utc};
use classdraft_common::{Content, DocumentId, EntrySource, HistoryEntry, HistoryEntryId};
use serde::Serialize;
use std::collections::HashSet;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum HistoryError {
    #[error("entry {id} does not sort after the latest entry {latest}")]
    OutOfOrder {
        id: HistoryEntryId,
        latest: HistoryEntryId,
    },

    #[error("entry {id} belongs to document {document_id}")]
    ForeignEntry {
        id: HistoryEntryId,
        document_id: DocumentId,
    },

    #[error("entry {0} appears more than once")]
    DuplicateEntry(HistoryEntryId),
}

/// One row of the history browser
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineItem {
    pub id: HistoryEntryId,
    pub created_at: DateTime<Utc>,
    pub char_count: usize,
    /// Change in visible characters against the previous entry
    pub char_delta: i64,
    pub source: EntrySource,
    pub restored_from: Option<HistoryEntryId>,
}

/// Ordered history of one document, oldest first
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryLog {
    document_id: DocumentId,
    entries: Vec<HistoryEntry>,
}

impl HistoryLog {
    pub fn new(document_id: DocumentId) -> Self {
        Self {
            document_id,
            entries: Vec::new(),
        }
    }

    /// Build from a backend listing (newest first)
    pub fn from_newest_first(
        document_id: DocumentId,
        mut entries: Vec<HistoryEntry>,
    ) -> Result<Self, HistoryError> {
        entries.reverse();
        entries.sort_by_key(HistoryEntry::sort_key);

        let mut seen = HashSet::with_capacity(entries.len());
        if let Some(duplicate) = entries.iter().find(|entry| !seen.insert(entry.id)) {
            return Err(HistoryError::DuplicateEntry(duplicate.id));
        }
        if let Some(foreign) = entries.iter().find(|entry| entry.document_id != document_id) {
            return Err(HistoryError::ForeignEntry {
                id: foreign.id,
                document_id: foreign.document_id.clone(),
            });
        }

        Ok(Self {
            document_id,
            entries,
        })
    }

    /// Append a newly committed entry
    pub fn append(&mut self, entry: HistoryEntry) -> Result<(), HistoryError> {
        if entry.document_id != self.document_id {
            return Err(HistoryError::ForeignEntry {
                id: entry.id,
                document_id: entry.document_id,
            });
        }
        if let Some(latest) = self.entries.last() {
            if entry.sort_key() <= latest.sort_key() {
                return Err(HistoryError::OutOfOrder {
                    id: entry.id,
                    latest: latest.id,
                });
            }
        }
        self.entries.push(entry);
        Ok(())
    }

    pub fn document_id(&self) -> &DocumentId {
        &self.document_id
    }

    /// Entries, oldest first
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn get(&self, id: HistoryEntryId) -> Option<&HistoryEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    pub fn latest(&self) -> Option<&HistoryEntry> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Content as of `id`
    pub fn reconstruct(&self, id: HistoryEntryId) -> Option<Content> {
        reconstruct::reconstruct(&self.entries, id)
    }

    /// Per-entry summaries, oldest first
    pub fn timeline(&self) -> Vec<TimelineItem> {
        let mut previous = 0usize;
        self.entries
            .iter()
            .map(|entry| {
                let item = TimelineItem {
                    id: entry.id,
                    created_at: entry.created_at,
                    char_count: entry.char_count,
                    char_delta: entry.char_count as i64 - previous as i64,
                    source: entry.source,
                    restored_from: entry.restored_from,
                };
                previous = entry.char_count;
                item
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use classdraft_common::HistoryPayload;

    fn entry(id: u64, seconds: i64, text: &str) -> HistoryEntry {
        let content = Content::paragraph(text);
        HistoryEntry {
            id: HistoryEntryId(id),
            document_id: "doc".into(),
            created_at: Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap() + Duration::seconds(seconds),
            char_count: content.char_count(),
            source: EntrySource::Autosave,
            restored_from: None,
            payload: HistoryPayload::Snapshot { content },
        }
    }

    #[test]
    fn test_listing_is_reversed() {
        let log = HistoryLog::from_newest_first(
            "doc".into(),
            vec![entry(3, 30, "c"), entry(2, 20, "b"), entry(1, 10, "a")],
        )
        .unwrap();

        let ids: Vec<u64> = log.entries().iter().map(|e| e.id.0).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(log.latest().map(|e| e.id), Some(HistoryEntryId(3)));
    }

    #[test]
    fn test_timestamp_ties_break_by_id() {
        let log = HistoryLog::from_newest_first(
            "doc".into(),
            vec![entry(5, 10, "b"), entry(4, 10, "a")],
        )
        .unwrap();
        assert_eq!(log.entries()[0].id, HistoryEntryId(4));
        assert_eq!(log.reconstruct(HistoryEntryId(5)), Some(Content::paragraph("b")));
    }

    #[test]
    fn test_rejects_foreign_and_duplicate_entries() {
        let mut other = entry(2, 20, "x");
        other.document_id = "other".into();
        assert!(matches!(
            HistoryLog::from_newest_first("doc".into(), vec![other, entry(1, 10, "a")]),
            Err(HistoryError::ForeignEntry { .. })
        ));

        assert_eq!(
            HistoryLog::from_newest_first("doc".into(), vec![entry(1, 10, "a"), entry(1, 10, "a")]),
            Err(HistoryError::DuplicateEntry(HistoryEntryId(1)))
        );
    }

    #[test]
    fn test_rejects_duplicate_id_with_other_timestamp() {
        let listing = vec![entry(1, 30, "a again"), entry(2, 20, "b"), entry(1, 10, "a")];
        assert_eq!(
            HistoryLog::from_newest_first("doc".into(), listing),
            Err(HistoryError::DuplicateEntry(HistoryEntryId(1)))
        );
    }

    #[test]
    fn test_append_only_moves_forward() {
        let mut log = HistoryLog::new("doc".into());
        log.append(entry(1, 10, "a")).unwrap();
        log.append(entry(2, 20, "ab")).unwrap();

        assert_eq!(
            log.append(entry(3, 5, "late")),
            Err(HistoryError::OutOfOrder {
                id: HistoryEntryId(3),
                latest: HistoryEntryId(2)
            })
        );
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_timeline_reports_char_deltas() {
        let log = HistoryLog::from_newest_first(
            "doc".into(),
            vec![entry(3, 30, "abc"), entry(2, 20, "abcdef"), entry(1, 10, "ab")],
        )
        .unwrap();

        let deltas: Vec<i64> = log.timeline().iter().map(|item| item.char_delta).collect();
        assert_eq!(deltas, vec![2, 4, -3]);
    }
}
