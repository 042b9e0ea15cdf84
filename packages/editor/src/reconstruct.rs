//! # Point-in-time Reconstruction
//!
//! Replays an oldest-first history prefix to recover the content as of any
//! recorded entry. Works the same over snapshot payloads (replay degenerates
//! to "take that entry's snapshot") and delta payloads (apply each patch in
//! order, starting from the empty document).
//!
//! Replay starts at the last snapshot at or before the target; a snapshot
//! discards everything accumulated before it, so this yields the same value
//! as replaying from the very first entry.

use classdraft_common::{Content, HistoryEntry, HistoryEntryId, HistoryPayload, PatchError};

/// Accumulates content while walking entries oldest-first
#[derive(Debug, Clone, Default)]
pub struct Replay {
    content: Content,
}

impl Replay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one entry into the accumulated content
    pub fn apply(&mut self, entry: &HistoryEntry) -> Result<&Content, PatchError> {
        self.content = match &entry.payload {
            HistoryPayload::Snapshot { content } => content.clone(),
            HistoryPayload::Delta { patch } => patch.apply(&self.content)?,
        };
        Ok(&self.content)
    }

    pub fn content(&self) -> &Content {
        &self.content
    }

    pub fn into_content(self) -> Content {
        self.content
    }
}

/// Content as of `target`, or `None` when `target` is not in `entries`
///
/// A log whose deltas no longer apply also yields `None`; use
/// [`try_reconstruct`] to see the patch error.
pub fn reconstruct(entries: &[HistoryEntry], target: HistoryEntryId) -> Option<Content> {
    match try_reconstruct(entries, target) {
        Ok(content) => content,
        Err(err) => {
            tracing::error!(entry_id = %target, error = %err, "history replay failed");
            None
        }
    }
}

/// Like [`reconstruct`], reporting corrupt deltas as errors
pub fn try_reconstruct(
    entries: &[HistoryEntry],
    target: HistoryEntryId,
) -> Result<Option<Content>, PatchError> {
    let Some(target_index) = entries.iter().position(|entry| entry.id == target) else {
        return Ok(None);
    };

    let start = entries[..=target_index]
        .iter()
        .rposition(|entry| matches!(entry.payload, HistoryPayload::Snapshot { .. }))
        .unwrap_or(0);

    let mut replay = Replay::new();
    for entry in &entries[start..=target_index] {
        replay.apply(entry)?;
    }
    Ok(Some(replay.into_content()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use classdraft_common::{ContentPatch, EntrySource};

    fn entry(id: u64, payload: HistoryPayload) -> HistoryEntry {
        let content_chars = match &payload {
            HistoryPayload::Snapshot { content } => content.char_count(),
            HistoryPayload::Delta { .. } => 0,
        };
        HistoryEntry {
            id: HistoryEntryId(id),
            document_id: "doc".into(),
            created_at: Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap() + Duration::seconds(id as i64),
            char_count: content_chars,
            source: EntrySource::Autosave,
            restored_from: None,
            payload,
        }
    }

    fn snapshots(contents: &[Content]) -> Vec<HistoryEntry> {
        contents
            .iter()
            .enumerate()
            .map(|(i, content)| {
                entry(i as u64 + 1, HistoryPayload::Snapshot { content: content.clone() })
            })
            .collect()
    }

    fn deltas(contents: &[Content]) -> Vec<HistoryEntry> {
        let mut previous = Content::empty();
        contents
            .iter()
            .enumerate()
            .map(|(i, content)| {
                let patch = ContentPatch::diff(&previous, content);
                previous = content.clone();
                entry(i as u64 + 1, HistoryPayload::Delta { patch })
            })
            .collect()
    }

    fn versions() -> Vec<Content> {
        vec![
            Content::paragraph("The mitochondria"),
            Content::paragraph("The mitochondria is the powerhouse"),
            Content::paragraph("Mitochondria are the powerhouse of the cell."),
            Content::empty(),
            Content::from("plain text answer"),
        ]
    }

    #[test]
    fn test_empty_log_yields_none() {
        assert_eq!(reconstruct(&[], HistoryEntryId(1)), None);
    }

    #[test]
    fn test_unknown_target_yields_none() {
        let entries = snapshots(&versions());
        assert_eq!(reconstruct(&entries, HistoryEntryId(99)), None);
    }

    #[test]
    fn test_first_entry_is_its_own_state() {
        let entries = deltas(&versions());
        assert_eq!(
            reconstruct(&entries, HistoryEntryId(1)),
            Some(Content::paragraph("The mitochondria"))
        );
    }

    #[test]
    fn test_round_trip_under_both_strategies() {
        let contents = versions();
        for entries in [snapshots(&contents), deltas(&contents)] {
            for (k, expected) in contents.iter().enumerate() {
                let id = HistoryEntryId(k as u64 + 1);
                assert_eq!(reconstruct(&entries, id).as_ref(), Some(expected), "entry {id}");
            }
        }
    }

    #[test]
    fn test_keyframes_mixed_with_deltas() {
        let contents = versions();
        let mut entries = deltas(&contents);
        // Re-encode the third entry as a keyframe
        entries[2].payload = HistoryPayload::Snapshot {
            content: contents[2].clone(),
        };

        for (k, expected) in contents.iter().enumerate() {
            assert_eq!(reconstruct(&entries, HistoryEntryId(k as u64 + 1)).as_ref(), Some(expected));
        }
    }

    #[test]
    fn test_replay_is_deterministic() {
        let entries = deltas(&versions());
        let first = reconstruct(&entries, HistoryEntryId(3));
        let second = reconstruct(&entries, HistoryEntryId(3));
        assert_eq!(first, second);
    }

    #[test]
    fn test_corrupt_delta_is_reported() {
        let mut entries = deltas(&versions());
        entries.remove(0);
        assert!(try_reconstruct(&entries, HistoryEntryId(2)).is_err());
        assert_eq!(reconstruct(&entries, HistoryEntryId(2)), None);
    }
}
