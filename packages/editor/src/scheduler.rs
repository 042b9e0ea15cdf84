//! # Save Scheduler
//!
//! Turns a high-frequency stream of edit notifications into a low-frequency
//! stream of save calls, without ever dropping the final edit.
//!
//! ## Design
//!
//! - Synchronous and clock-injected: every operation takes `now`, timers are
//!   deadlines exposed through [`SaveScheduler::next_deadline`] and fired by
//!   [`SaveScheduler::poll`]
//! - Never performs I/O: a decision to save comes back as a [`PendingSave`]
//!   ticket, and the driver reports the outcome through
//!   [`SaveScheduler::complete_success`] / [`SaveScheduler::complete_failure`]
//! - The throttle deadline always saves whatever `pending_value` holds when it
//!   fires, not the value seen when it was armed
//! - Every ticket carries a sequence number; a response is applied only if no
//!   newer response has been applied already
//!
//! ## Example
//!
//! ```rust,ignore
//! let mut scheduler = SaveScheduler::new(id, SaveProfile::Response.config(), Content::empty());
//!
//! scheduler.notify_edit(Content::paragraph("Hi"), now);
//! if let Decision::Issue(ticket) = scheduler.poll(now + debounce) {
//!     match client.save(&id, ticket.request.clone()).await {
//!         Ok(_) => scheduler.complete_success(ticket.seq),
//!         Err(_) => scheduler.complete_failure(ticket.seq),
//!     };
//! }
//! ```

use crate::config::SchedulerConfig;
use crate::status::{SaveStatus, StatusEvent};
use classdraft_common::{Content, DocumentId, SaveRequest, SaveTrigger};
use std::collections::BTreeMap;
use tokio::time::Instant;

/// In-memory editing state for one open document
#[derive(Debug, Clone, PartialEq)]
pub struct DraftState {
    /// What the editor currently shows
    pub content: Content,

    pub status: SaveStatus,

    /// Last value known to be durably stored
    pub last_saved_snapshot: Content,

    /// Most recent edit not yet confirmed as stored
    pub pending_value: Option<Content>,
}

impl DraftState {
    /// State for freshly loaded, fully persisted content
    pub fn loaded(content: Content) -> Self {
        Self {
            last_saved_snapshot: content.clone(),
            content,
            status: SaveStatus::Saved,
            pending_value: None,
        }
    }
}

/// Instruction to perform exactly one save call
#[derive(Debug, Clone, PartialEq)]
pub struct PendingSave {
    pub seq: u64,
    pub request: SaveRequest,
}

/// What the scheduler decided
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Perform this save call now
    Issue(PendingSave),
    /// The value matches the stored snapshot, no call needed
    Unchanged,
    /// Throttled; the save will be issued by `poll` at `until`
    Deferred { until: Instant },
    /// Nothing to do
    Idle,
}

/// Result of reporting a response back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Accepted,
    /// Unknown, or overtaken by a newer applied response
    Stale,
}

#[derive(Debug, Clone, Copy)]
struct Throttle {
    fire_at: Instant,
    trigger: SaveTrigger,
}

/// Debounce + min-interval save scheduler for one document
#[derive(Debug)]
pub struct SaveScheduler {
    document_id: DocumentId,
    config: SchedulerConfig,
    draft: DraftState,
    debounce_at: Option<Instant>,
    throttle: Option<Throttle>,
    last_attempt_at: Option<Instant>,

    /// Highest sequence number issued
    issued_seq: u64,

    /// Highest sequence number whose response was applied
    applied_seq: u64,

    /// Sent content of each outstanding call, by sequence number
    in_flight: BTreeMap<u64, Content>,
}

impl SaveScheduler {
    pub fn new(document_id: DocumentId, config: SchedulerConfig, content: Content) -> Self {
        Self {
            document_id,
            config,
            draft: DraftState::loaded(content),
            debounce_at: None,
            throttle: None,
            last_attempt_at: None,
            issued_seq: 0,
            applied_seq: 0,
            in_flight: BTreeMap::new(),
        }
    }

    pub fn draft(&self) -> &DraftState {
        &self.draft
    }

    pub fn status(&self) -> SaveStatus {
        self.draft.status
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn document_id(&self) -> &DocumentId {
        &self.document_id
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    /// Earliest armed timer, if any
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.debounce_at, self.throttle.map(|t| t.fire_at)) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Record a local edit and (re)arm the debounce timer
    pub fn notify_edit(&mut self, content: Content, now: Instant) {
        self.record_edit(content);
        self.debounce_at = Some(now + self.config.debounce());
    }

    /// Save `content` now if the min interval allows it (or `force` is set),
    /// otherwise arm the throttle timer for the remaining wait
    pub fn schedule(
        &mut self,
        content: Content,
        trigger: SaveTrigger,
        force: bool,
        now: Instant,
    ) -> Decision {
        if content != self.draft.content || self.draft.pending_value.is_none() {
            self.record_edit(content);
        }

        let ready_at = self
            .last_attempt_at
            .map(|last| last + self.config.min_interval());

        match ready_at {
            Some(until) if !force && now < until => {
                tracing::debug!(
                    document_id = %self.document_id,
                    %trigger,
                    wait_ms = (until - now).as_millis() as u64,
                    "save throttled"
                );
                self.throttle = Some(Throttle {
                    fire_at: until,
                    trigger,
                });
                Decision::Deferred { until }
            }
            _ => {
                self.throttle = None;
                self.issue(trigger, now)
            }
        }
    }

    /// Force any pending edit out immediately, cancelling both timers
    pub fn flush(&mut self, trigger: SaveTrigger, now: Instant) -> Decision {
        if self.draft.status != SaveStatus::Unsaved {
            return Decision::Idle;
        }
        let Some(pending) = self.draft.pending_value.clone() else {
            return Decision::Idle;
        };

        self.debounce_at = None;
        self.throttle = None;
        self.schedule(pending, trigger, true, now)
    }

    /// Fire whichever timer is due
    pub fn poll(&mut self, now: Instant) -> Decision {
        if let Some(throttle) = self.throttle {
            if throttle.fire_at <= now {
                self.throttle = None;
                return self.issue(throttle.trigger, now);
            }
        }

        if let Some(debounce_at) = self.debounce_at {
            if debounce_at <= now {
                self.debounce_at = None;
                if let Some(pending) = self.draft.pending_value.clone() {
                    return self.schedule(pending, SaveTrigger::Autosave, false, now);
                }
            }
        }

        Decision::Idle
    }

    /// Apply a successful save response
    pub fn complete_success(&mut self, seq: u64) -> Applied {
        let Some(sent) = self.in_flight.remove(&seq) else {
            tracing::warn!(document_id = %self.document_id, seq, "discarding unknown save response");
            return Applied::Stale;
        };
        if seq <= self.applied_seq {
            tracing::warn!(document_id = %self.document_id, seq, applied = self.applied_seq, "discarding stale save response");
            return Applied::Stale;
        }

        // Older calls can no longer win
        self.applied_seq = seq;
        self.in_flight.retain(|pending_seq, _| *pending_seq > seq);
        let newer_in_flight = !self.in_flight.is_empty();

        let matches_draft = self.draft.content == sent;
        if self.draft.pending_value.as_ref() == Some(&sent) {
            self.draft.pending_value = None;
        }
        if !matches_draft && self.draft.pending_value.is_none() {
            self.draft.pending_value = Some(self.draft.content.clone());
        }
        self.draft.last_saved_snapshot = sent;

        self.transition(StatusEvent::Succeeded {
            matches_draft,
            newer_in_flight,
        });
        Applied::Accepted
    }

    /// Apply a failed save response; the pending edit stays queued for the
    /// next edit or flush
    pub fn complete_failure(&mut self, seq: u64) -> Applied {
        if self.in_flight.remove(&seq).is_none() {
            return Applied::Stale;
        }
        let newer_in_flight = self.in_flight.keys().any(|pending_seq| *pending_seq > seq);

        if self.draft.content != self.draft.last_saved_snapshot && self.draft.pending_value.is_none() {
            self.draft.pending_value = Some(self.draft.content.clone());
        }

        self.transition(StatusEvent::Failed { newer_in_flight });
        Applied::Accepted
    }

    /// Cleanup path for a call that ended with an unexpected error
    pub fn abort(&mut self, seq: u64) -> Applied {
        self.complete_failure(seq)
    }

    /// Replace the draft with content the server restored
    ///
    /// Any response still in flight is invalidated.
    pub fn apply_restored(&mut self, content: Content) {
        self.draft.content = content.clone();
        self.draft.last_saved_snapshot = content;
        self.draft.pending_value = None;
        self.debounce_at = None;
        self.throttle = None;
        self.applied_seq = self.issued_seq;
        self.in_flight.clear();
        self.transition(StatusEvent::Restored);
    }

    fn record_edit(&mut self, content: Content) {
        self.draft.content = content.clone();
        self.draft.pending_value = Some(content);
        self.transition(StatusEvent::Edited);
    }

    fn issue(&mut self, trigger: SaveTrigger, now: Instant) -> Decision {
        let Some(value) = self.draft.pending_value.clone() else {
            return Decision::Idle;
        };

        if value == self.draft.last_saved_snapshot && self.in_flight.is_empty() {
            self.draft.pending_value = None;
            let matches_draft = self.draft.content == self.draft.last_saved_snapshot;
            self.transition(StatusEvent::Unchanged { matches_draft });
            tracing::debug!(document_id = %self.document_id, %trigger, "content unchanged, skipping save");
            return Decision::Unchanged;
        }

        self.issued_seq += 1;
        let seq = self.issued_seq;
        self.last_attempt_at = Some(now);
        self.in_flight.insert(seq, value.clone());
        self.transition(StatusEvent::Issued);

        tracing::debug!(
            document_id = %self.document_id,
            seq,
            %trigger,
            chars = value.char_count(),
            "issuing save"
        );

        Decision::Issue(PendingSave {
            seq,
            request: SaveRequest {
                content: value,
                trigger,
            },
        })
    }

    fn transition(&mut self, event: StatusEvent) {
        self.draft.status = self.draft.status.on(event);
    }
}
