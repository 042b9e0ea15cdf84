//! # Save Status
//!
//! `saved | saving | unsaved`, as shown to the user and as consulted by
//! flush-on-exit.
//!
//! ```text
//!            edit                 issue
//!   saved ─────────▶ unsaved ─────────────▶ saving
//!     ▲                ▲  ▲                   │
//!     │                │  └── failure ────────┤
//!     │                └── newer edit ────────┤
//!     └───────────── success, draft matches ──┘
//! ```
//!
//! Only edits, scheduler decisions and responses move the machine. Time
//! passing on its own never does.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveStatus {
    #[default]
    Saved,
    Saving,
    Unsaved,
}

/// Inputs to the status machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusEvent {
    /// A local edit arrived
    Edited,
    /// The scheduler issued a save call
    Issued,
    /// The scheduler skipped a save because nothing changed
    Unchanged { matches_draft: bool },
    /// A save response was applied
    Succeeded {
        matches_draft: bool,
        newer_in_flight: bool,
    },
    /// A save failed, or was abandoned after an unexpected error
    Failed { newer_in_flight: bool },
    /// A restore replaced the draft with server content
    Restored,
}

impl SaveStatus {
    /// Pure transition function
    pub fn on(self, event: StatusEvent) -> SaveStatus {
        match event {
            StatusEvent::Edited => SaveStatus::Unsaved,
            StatusEvent::Issued => SaveStatus::Saving,
            StatusEvent::Unchanged { matches_draft } => saved_if(matches_draft),
            StatusEvent::Succeeded {
                newer_in_flight: true,
                ..
            } => self,
            StatusEvent::Succeeded { matches_draft, .. } => saved_if(matches_draft),
            StatusEvent::Failed {
                newer_in_flight: true,
            } => self,
            StatusEvent::Failed { .. } => SaveStatus::Unsaved,
            StatusEvent::Restored => SaveStatus::Saved,
        }
    }

    pub fn is_dirty(self) -> bool {
        self != SaveStatus::Saved
    }
}

fn saved_if(matches_draft: bool) -> SaveStatus {
    if matches_draft {
        SaveStatus::Saved
    } else {
        SaveStatus::Unsaved
    }
}

impl fmt::Display for SaveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SaveStatus::Saved => write!(f, "saved"),
            SaveStatus::Saving => write!(f, "saving"),
            SaveStatus::Unsaved => write!(f, "unsaved"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edit_always_dirties() {
        for status in [SaveStatus::Saved, SaveStatus::Saving, SaveStatus::Unsaved] {
            assert_eq!(status.on(StatusEvent::Edited), SaveStatus::Unsaved);
        }
    }

    #[test]
    fn test_success_paths() {
        let saving = SaveStatus::Unsaved.on(StatusEvent::Issued);
        assert_eq!(saving, SaveStatus::Saving);

        let done = StatusEvent::Succeeded {
            matches_draft: true,
            newer_in_flight: false,
        };
        assert_eq!(saving.on(done), SaveStatus::Saved);

        let overtaken = StatusEvent::Succeeded {
            matches_draft: false,
            newer_in_flight: false,
        };
        assert_eq!(saving.on(overtaken), SaveStatus::Unsaved);
    }

    #[test]
    fn test_newer_save_keeps_current_status() {
        let event = StatusEvent::Succeeded {
            matches_draft: true,
            newer_in_flight: true,
        };
        assert_eq!(SaveStatus::Saving.on(event), SaveStatus::Saving);
        assert_eq!(
            SaveStatus::Saving.on(StatusEvent::Failed {
                newer_in_flight: true
            }),
            SaveStatus::Saving
        );
    }

    #[test]
    fn test_failure_leaves_unsaved() {
        assert_eq!(
            SaveStatus::Saving.on(StatusEvent::Failed {
                newer_in_flight: false
            }),
            SaveStatus::Unsaved
        );
    }

    #[test]
    fn test_restore_is_saved() {
        assert_eq!(SaveStatus::Unsaved.on(StatusEvent::Restored), SaveStatus::Saved);
        assert!(!SaveStatus::Saved.is_dirty());
        assert!(SaveStatus::Saving.is_dirty());
    }
}
