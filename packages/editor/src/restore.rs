//! # Preview / Restore
//!
//! Lets a student browse earlier versions without touching the live draft,
//! and make one of them current again.
//!
//! ```text
//!            preview(id)              request_restore
//!   Editing ────────────▶ Previewing ────────────────▶ ConfirmingRestore
//!      ▲                   │   ▲  ◀──────── cancel ────────┘   │
//!      └────── exit ───────┘   └──── confirm fails ────────────┤
//!      ▲                                                       │
//!      └──────────────────── confirm succeeds ─────────────────┘
//! ```
//!
//! Previews are reconstructed from the fetched [`HistoryLog`]; restoring
//! goes through the [`EditSessionHandle`] so it is ordered after any save
//! still in flight.

use crate::errors::EditorError;
use crate::history::HistoryLog;
use crate::session::{DraftView, EditSessionHandle};
use chrono::{DateTime, Utc};
use classdraft_common::{Content, DocumentRecord, HistoryEntryId};

/// A reconstructed historical version
#[derive(Debug, Clone, PartialEq)]
pub struct Preview {
    pub entry_id: HistoryEntryId,
    pub created_at: DateTime<Utc>,
    pub char_count: usize,
    pub content: Content,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum RestoreState {
    #[default]
    Editing,
    Previewing(Preview),
    ConfirmingRestore(Preview),
}

#[derive(Debug, Clone)]
pub struct RestoreWorkflow {
    log: HistoryLog,
    state: RestoreState,
    error: Option<EditorError>,
}

impl RestoreWorkflow {
    pub fn new(log: HistoryLog) -> Self {
        Self {
            log,
            state: RestoreState::Editing,
            error: None,
        }
    }

    pub fn state(&self) -> &RestoreState {
        &self.state
    }

    /// Inline error for the current state
    pub fn error(&self) -> Option<&EditorError> {
        self.error.as_ref()
    }

    pub fn log(&self) -> &HistoryLog {
        &self.log
    }

    /// The version being shown, if any
    pub fn current_preview(&self) -> Option<&Preview> {
        match &self.state {
            RestoreState::Editing => None,
            RestoreState::Previewing(preview) | RestoreState::ConfirmingRestore(preview) => {
                Some(preview)
            }
        }
    }

    /// Show the content as of `entry_id`
    ///
    /// An id missing from the log leaves the state unchanged.
    pub fn preview(&mut self, entry_id: HistoryEntryId) -> Result<Preview, EditorError> {
        let Some(entry) = self.log.get(entry_id) else {
            return Err(self.fail(EditorError::StaleReference { entry_id }));
        };
        let created_at = entry.created_at;
        let Some(content) = self.log.reconstruct(entry_id) else {
            return Err(self.fail(EditorError::Validation(format!(
                "version {} could not be rebuilt",
                entry_id
            ))));
        };

        let preview = Preview {
            entry_id,
            created_at,
            char_count: content.char_count(),
            content,
        };
        self.error = None;
        self.state = RestoreState::Previewing(preview.clone());
        Ok(preview)
    }

    /// Ask for confirmation before restoring the previewed version
    pub fn request_restore(&mut self, draft: &DraftView) -> Result<(), EditorError> {
        let RestoreState::Previewing(preview) = &self.state else {
            return Err(self.fail(EditorError::Validation(
                "no version is being previewed".to_string(),
            )));
        };
        let preview = preview.clone();
        if draft.is_locked {
            return Err(self.fail(EditorError::Locked(draft.document_id.clone())));
        }

        self.error = None;
        self.state = RestoreState::ConfirmingRestore(preview);
        Ok(())
    }

    /// Text for the confirmation dialog
    pub fn confirmation_prompt(&self) -> Option<String> {
        match &self.state {
            RestoreState::ConfirmingRestore(preview) => Some(format!(
                "Restore the version saved {}? Your current draft stays in the version history.",
                preview.created_at.format("%b %-d, %Y at %H:%M UTC")
            )),
            _ => None,
        }
    }

    /// Back out of the confirmation dialog
    pub fn cancel(&mut self) {
        if let RestoreState::ConfirmingRestore(preview) = &self.state {
            self.state = RestoreState::Previewing(preview.clone());
        }
    }

    /// Leave history browsing; the live draft is untouched
    pub fn exit(&mut self) {
        self.state = RestoreState::Editing;
        self.error = None;
    }

    /// Restore the version awaiting confirmation
    pub async fn confirm(
        &mut self,
        session: &EditSessionHandle,
    ) -> Result<DocumentRecord, EditorError> {
        let RestoreState::ConfirmingRestore(preview) = &self.state else {
            return Err(self.fail(EditorError::Validation(
                "restore has not been requested".to_string(),
            )));
        };
        let preview = preview.clone();

        match session.restore(preview.entry_id).await {
            Ok(record) => {
                match session.history().await {
                    Ok(log) => self.log = log,
                    Err(err) => {
                        tracing::warn!(document_id = %record.id, error = %err, "could not refresh history")
                    }
                }
                self.state = RestoreState::Editing;
                self.error = None;
                Ok(record)
            }
            Err(err) => {
                self.state = RestoreState::Previewing(preview);
                Err(self.fail(err))
            }
        }
    }

    /// Replace the log with a fresh listing
    pub fn refresh(&mut self, log: HistoryLog) {
        self.log = log;
    }

    fn fail(&mut self, err: EditorError) -> EditorError {
        tracing::debug!(error = %err, "restore workflow refused");
        self.error = Some(err.clone());
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::SaveStatus;
    use chrono::{Duration, TimeZone};
    use classdraft_common::{DocumentKind, EntrySource, HistoryEntry, HistoryPayload};

    fn log() -> HistoryLog {
        let base = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        let entries = ["Draft one", "Draft two"]
            .iter()
            .enumerate()
            .map(|(i, text)| {
                let content = Content::paragraph(*text);
                HistoryEntry {
                    id: HistoryEntryId(i as u64 + 1),
                    document_id: "doc".into(),
                    created_at: base + Duration::minutes(i as i64),
                    char_count: content.char_count(),
                    source: EntrySource::Autosave,
                    restored_from: None,
                    payload: HistoryPayload::Snapshot { content },
                }
            })
            .rev()
            .collect();
        HistoryLog::from_newest_first("doc".into(), entries).unwrap()
    }

    fn draft(is_locked: bool) -> DraftView {
        DraftView {
            document_id: "doc".into(),
            kind: DocumentKind::AssignmentResponse,
            content: Content::paragraph("Live draft"),
            status: SaveStatus::Unsaved,
            char_count: 10,
            is_locked,
            is_submitted: is_locked,
            pending_saves: 0,
            last_error: None,
            last_saved_at: None,
        }
    }

    #[test]
    fn test_preview_reconstructs_entry() {
        let mut workflow = RestoreWorkflow::new(log());
        let preview = workflow.preview(HistoryEntryId(1)).unwrap();
        assert_eq!(preview.content, Content::paragraph("Draft one"));
        assert_eq!(preview.char_count, 9);
        assert!(matches!(workflow.state(), RestoreState::Previewing(_)));
    }

    #[test]
    fn test_unknown_entry_keeps_state() {
        let mut workflow = RestoreWorkflow::new(log());
        workflow.preview(HistoryEntryId(2)).unwrap();

        let err = workflow.preview(HistoryEntryId(42)).unwrap_err();
        assert_eq!(
            err,
            EditorError::StaleReference {
                entry_id: HistoryEntryId(42)
            }
        );
        assert_eq!(workflow.current_preview().map(|p| p.entry_id), Some(HistoryEntryId(2)));
        assert_eq!(workflow.error(), Some(&err));
    }

    #[test]
    fn test_confirmation_flow() {
        let mut workflow = RestoreWorkflow::new(log());
        workflow.preview(HistoryEntryId(1)).unwrap();
        workflow.request_restore(&draft(false)).unwrap();

        assert!(matches!(workflow.state(), RestoreState::ConfirmingRestore(_)));
        let prompt = workflow.confirmation_prompt().unwrap();
        assert!(prompt.contains("Mar 1, 2026 at 09:00 UTC"), "{prompt}");

        workflow.cancel();
        assert!(matches!(workflow.state(), RestoreState::Previewing(_)));
        assert_eq!(workflow.confirmation_prompt(), None);

        workflow.exit();
        assert_eq!(workflow.state(), &RestoreState::Editing);
    }

    #[test]
    fn test_locked_document_refuses_restore() {
        let mut workflow = RestoreWorkflow::new(log());
        workflow.preview(HistoryEntryId(1)).unwrap();

        let err = workflow.request_restore(&draft(true)).unwrap_err();
        assert_eq!(err, EditorError::Locked("doc".into()));
        assert!(matches!(workflow.state(), RestoreState::Previewing(_)));
    }

    #[test]
    fn test_restore_requires_preview() {
        let mut workflow = RestoreWorkflow::new(log());
        assert!(workflow.request_restore(&draft(false)).is_err());
        assert_eq!(workflow.state(), &RestoreState::Editing);
    }
}
