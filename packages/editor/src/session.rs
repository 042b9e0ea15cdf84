//! # Edit Session
//!
//! Drives one open document: a single task owns the [`SaveScheduler`], turns
//! its decisions into persistence calls and feeds responses back.
//!
//! ```text
//!   EditSessionHandle ──commands──▶ ┌──────────────────────────┐
//!   (change, blur, flush,           │ EditSession task          │──save──▶ PersistenceClient
//!    submit, restore, ...)          │  select! {                │◀─result─┘
//!                                   │    command,               │
//!   watch::Receiver<DraftView> ◀────│    next scheduler deadline│
//!                                   │    in-flight save done    │
//!                                   │  }                        │
//!                                   └──────────────────────────┘
//! ```
//!
//! Autosaves run concurrently with new edits. Operations that must not race
//! a save (flush, submit, restore, close) first push out any pending edit and
//! wait for every in-flight save to settle; commands sent meanwhile are
//! queued. A client that panics mid-save fails that save instead of taking
//! the session down.

use crate::client::{PersistenceClient, PersistenceError};
use crate::config::{SaveProfile, SchedulerConfig};
use crate::errors::EditorError;
use crate::history::HistoryLog;
use crate::scheduler::{Applied, Decision, PendingSave, SaveScheduler};
use crate::status::SaveStatus;
use chrono::{DateTime, Utc};
use classdraft_common::{Content, DocumentId, DocumentKind, DocumentRecord, HistoryEntryId, SaveTrigger};
use futures::future::BoxFuture;
use futures::stream::FuturesUnordered;
use futures::{FutureExt, StreamExt};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;

/// What the editor UI renders
#[derive(Debug, Clone, PartialEq)]
pub struct DraftView {
    pub document_id: DocumentId,
    pub kind: DocumentKind,
    pub content: Content,
    pub status: SaveStatus,
    pub char_count: usize,
    pub is_locked: bool,
    pub is_submitted: bool,
    /// Save calls not yet answered
    pub pending_saves: usize,
    /// Most recent failure, cleared by the next successful call
    pub last_error: Option<EditorError>,
    pub last_saved_at: Option<DateTime<Utc>>,
}

type Reply<T> = oneshot::Sender<Result<T, EditorError>>;

enum Command {
    Change(Content),
    Blur,
    Flush(Reply<SaveStatus>),
    Submit(Reply<DocumentRecord>),
    Unsubmit(Reply<DocumentRecord>),
    Restore(HistoryEntryId, Reply<DocumentRecord>),
    History(Reply<HistoryLog>),
    Close(Reply<SaveStatus>),
}

/// How a save call ended
enum SaveOutcome {
    Finished(Result<DocumentRecord, PersistenceError>),
    /// The client panicked mid-call
    Panicked,
}

type SaveFuture = BoxFuture<'static, (u64, SaveOutcome)>;

/// The task state behind an [`EditSessionHandle`]
pub struct EditSession {
    client: Arc<dyn PersistenceClient>,
    record: DocumentRecord,
    scheduler: SaveScheduler,
    commands: mpsc::UnboundedReceiver<Command>,
    view: watch::Sender<DraftView>,
    in_flight: FuturesUnordered<SaveFuture>,
    last_error: Option<EditorError>,
    last_saved_at: Option<DateTime<Utc>>,
}

impl EditSession {
    /// Load `document_id` and spawn its session task
    ///
    /// Without an explicit `config` the scheduler uses the profile for the
    /// document's kind.
    pub async fn open(
        client: Arc<dyn PersistenceClient>,
        document_id: DocumentId,
        config: Option<SchedulerConfig>,
    ) -> Result<EditSessionHandle, EditorError> {
        let record = client.load(&document_id).await?;
        let config = match config {
            Some(config) => {
                config.validate()?;
                config
            }
            None => SaveProfile::for_kind(record.kind).config(),
        };

        tracing::info!(
            document_id = %document_id,
            debounce_ms = config.debounce_ms,
            min_interval_ms = config.min_interval_ms,
            locked = record.is_locked(),
            "opening edit session"
        );

        let scheduler = SaveScheduler::new(document_id.clone(), config, record.content.clone());
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let last_saved_at = Some(record.updated_at);
        let (view_tx, view_rx) = watch::channel(render(&record, &scheduler, None, last_saved_at));

        let session = EditSession {
            client,
            record,
            scheduler,
            commands: command_rx,
            view: view_tx,
            in_flight: FuturesUnordered::new(),
            last_error: None,
            last_saved_at,
        };
        tokio::spawn(session.run());

        Ok(EditSessionHandle {
            document_id,
            commands: command_tx,
            view: view_rx,
        })
    }

    async fn run(mut self) {
        loop {
            let deadline = self.scheduler.next_deadline();
            let sleep = tokio::time::sleep_until(deadline.unwrap_or_else(far_future));

            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(command) => {
                        if self.handle(command).await {
                            break;
                        }
                    }
                    None => {
                        // Every handle dropped
                        let _ = self.flush(SaveTrigger::Force).await;
                        break;
                    }
                },
                _ = sleep, if deadline.is_some() => {
                    let decision = self.scheduler.poll(Instant::now());
                    self.dispatch(decision);
                }
                Some((seq, outcome)) = self.in_flight.next(), if !self.in_flight.is_empty() => {
                    self.complete(seq, outcome);
                }
            }

            self.publish();
        }

        tracing::debug!(document_id = %self.record.id, "edit session stopped");
    }

    /// Returns true once the session should stop
    async fn handle(&mut self, command: Command) -> bool {
        match command {
            Command::Change(content) => self.change(content),
            Command::Blur => {
                let decision = self.scheduler.flush(SaveTrigger::Blur, Instant::now());
                self.dispatch(decision);
            }
            Command::Flush(reply) => {
                let result = self.flush(SaveTrigger::Force).await;
                self.respond(reply, result);
            }
            Command::Submit(reply) => {
                let result = self.submit().await;
                self.respond(reply, result);
            }
            Command::Unsubmit(reply) => {
                let result = self.client.unsubmit(&self.record.id).await;
                let result = self.accept_record(result);
                self.respond(reply, result);
            }
            Command::Restore(entry_id, reply) => {
                let result = self.restore(entry_id).await;
                self.respond(reply, result);
            }
            Command::History(reply) => {
                let result = self.history().await;
                self.respond(reply, result);
            }
            Command::Close(reply) => {
                let result = self.flush(SaveTrigger::Force).await;
                self.respond(reply, result);
                return true;
            }
        }
        false
    }

    fn change(&mut self, content: Content) {
        if self.record.is_locked() {
            tracing::warn!(document_id = %self.record.id, "ignoring edit to a locked document");
            self.last_error = Some(EditorError::Locked(self.record.id.clone()));
            return;
        }
        self.scheduler.notify_edit(content, Instant::now());
    }

    /// Push out any pending edit and wait for every save to settle
    async fn flush(&mut self, trigger: SaveTrigger) -> Result<SaveStatus, EditorError> {
        if !self.record.is_locked() {
            let decision = self.scheduler.flush(trigger, Instant::now());
            self.dispatch(decision);
        }
        self.drain().await;

        let status = self.scheduler.status();
        match (&self.last_error, status) {
            (Some(err), SaveStatus::Unsaved) => Err(err.clone()),
            _ => Ok(status),
        }
    }

    async fn submit(&mut self) -> Result<DocumentRecord, EditorError> {
        if self.record.is_locked() {
            return Err(EditorError::Locked(self.record.id.clone()));
        }
        let status = self.flush(SaveTrigger::Force).await?;
        if status != SaveStatus::Saved {
            return Err(EditorError::Validation(format!(
                "cannot submit with {} changes",
                status
            )));
        }

        let result = self.client.submit(&self.record.id).await;
        let record = self.accept_record(result)?;
        tracing::info!(document_id = %record.id, "document submitted");
        Ok(record)
    }

    async fn restore(&mut self, entry_id: HistoryEntryId) -> Result<DocumentRecord, EditorError> {
        if self.record.is_locked() {
            return Err(EditorError::Locked(self.record.id.clone()));
        }
        // Pending edits reach history first; a pre-restore save must not
        // land after the restore
        self.flush(SaveTrigger::Force).await?;

        let result = self.client.restore(&self.record.id, entry_id).await;
        let record = self.accept_record(result)?;
        self.scheduler.apply_restored(record.content.clone());
        self.last_saved_at = Some(record.updated_at);

        tracing::info!(document_id = %record.id, %entry_id, "restored history entry");
        Ok(record)
    }

    async fn history(&mut self) -> Result<HistoryLog, EditorError> {
        let entries = self
            .client
            .list_history(&self.record.id)
            .await
            .map_err(EditorError::from)?;
        Ok(HistoryLog::from_newest_first(self.record.id.clone(), entries)?)
    }

    fn dispatch(&mut self, decision: Decision) {
        let Decision::Issue(PendingSave { seq, request }) = decision else {
            return;
        };

        tracing::info!(
            document_id = %self.record.id,
            seq,
            trigger = %request.trigger,
            "saving"
        );

        let client = Arc::clone(&self.client);
        let document_id = self.record.id.clone();
        let save = async move { client.save(&document_id, request).await };
        self.in_flight.push(
            async move {
                let outcome = match AssertUnwindSafe(save).catch_unwind().await {
                    Ok(result) => SaveOutcome::Finished(result),
                    Err(_) => SaveOutcome::Panicked,
                };
                (seq, outcome)
            }
            .boxed(),
        );
    }

    async fn drain(&mut self) {
        while let Some((seq, outcome)) = self.in_flight.next().await {
            self.complete(seq, outcome);
        }
    }

    fn complete(&mut self, seq: u64, outcome: SaveOutcome) {
        let result = match outcome {
            SaveOutcome::Finished(result) => result,
            SaveOutcome::Panicked => {
                tracing::error!(document_id = %self.record.id, seq, "save call panicked");
                if self.scheduler.abort(seq) == Applied::Accepted {
                    self.last_error = Some(EditorError::Transient("save call panicked".to_string()));
                }
                return;
            }
        };

        match result {
            Ok(record) => {
                if self.scheduler.complete_success(seq) == Applied::Accepted {
                    self.last_saved_at = Some(record.updated_at);
                    self.last_error = None;
                    self.record = record;
                }
            }
            Err(err) => {
                tracing::warn!(
                    document_id = %self.record.id,
                    seq,
                    error = %err,
                    retryable = err.is_retryable(),
                    "save failed"
                );
                if let PersistenceError::Locked(_) = err {
                    self.record.is_submitted = true;
                }
                if self.scheduler.complete_failure(seq) == Applied::Accepted {
                    self.last_error = Some(err.into());
                }
            }
        }
    }

    /// Adopt a record returned by a lifecycle call, or remember its error
    fn accept_record(
        &mut self,
        result: Result<DocumentRecord, PersistenceError>,
    ) -> Result<DocumentRecord, EditorError> {
        match result {
            Ok(record) => {
                self.record = record.clone();
                self.last_error = None;
                Ok(record)
            }
            Err(err) => {
                tracing::warn!(document_id = %self.record.id, error = %err, "request failed");
                let err = EditorError::from(err);
                self.last_error = Some(err.clone());
                Err(err)
            }
        }
    }

    /// Publish the view before answering so callers observe the outcome
    fn respond<T>(&self, reply: Reply<T>, result: Result<T, EditorError>) {
        self.publish();
        let _ = reply.send(result);
    }

    fn publish(&self) {
        self.view.send_replace(render(
            &self.record,
            &self.scheduler,
            self.last_error.clone(),
            self.last_saved_at,
        ));
    }
}

fn render(
    record: &DocumentRecord,
    scheduler: &SaveScheduler,
    last_error: Option<EditorError>,
    last_saved_at: Option<DateTime<Utc>>,
) -> DraftView {
    let content = scheduler.draft().content.clone();
    DraftView {
        document_id: record.id.clone(),
        kind: record.kind,
        char_count: content.char_count(),
        content,
        status: scheduler.status(),
        is_locked: record.is_locked(),
        is_submitted: record.is_submitted,
        pending_saves: scheduler.in_flight_count(),
        last_error,
        last_saved_at,
    }
}

fn far_future() -> Instant {
    Instant::now() + Duration::from_secs(60 * 60 * 24 * 365)
}

/// Cheap, cloneable access to a running [`EditSession`]
#[derive(Clone)]
pub struct EditSessionHandle {
    document_id: DocumentId,
    commands: mpsc::UnboundedSender<Command>,
    view: watch::Receiver<DraftView>,
}

impl EditSessionHandle {
    pub fn document_id(&self) -> &DocumentId {
        &self.document_id
    }

    /// Editor `on_change`
    pub fn change(&self, content: Content) -> Result<(), EditorError> {
        self.send(Command::Change(content))
    }

    /// Editor `on_blur`: save any pending edit now
    pub fn blur(&self) -> Result<(), EditorError> {
        self.send(Command::Blur)
    }

    /// Save any pending edit and wait until no save is in flight
    pub async fn flush(&self) -> Result<SaveStatus, EditorError> {
        self.request(Command::Flush).await
    }

    pub async fn submit(&self) -> Result<DocumentRecord, EditorError> {
        self.request(Command::Submit).await
    }

    pub async fn unsubmit(&self) -> Result<DocumentRecord, EditorError> {
        self.request(Command::Unsubmit).await
    }

    /// Make a history entry's content current; appends a new entry
    pub async fn restore(&self, entry_id: HistoryEntryId) -> Result<DocumentRecord, EditorError> {
        self.request(|reply| Command::Restore(entry_id, reply)).await
    }

    pub async fn history(&self) -> Result<HistoryLog, EditorError> {
        self.request(Command::History).await
    }

    /// Current view of the draft
    pub fn draft(&self) -> DraftView {
        self.view.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<DraftView> {
        self.view.clone()
    }

    /// Flush, then stop the session task
    pub async fn close(self) -> Result<SaveStatus, EditorError> {
        self.request(Command::Close).await
    }

    fn send(&self, command: Command) -> Result<(), EditorError> {
        self.commands
            .send(command)
            .map_err(|_| EditorError::SessionClosed)
    }

    async fn request<T>(&self, command: impl FnOnce(Reply<T>) -> Command) -> Result<T, EditorError> {
        let (reply, response) = oneshot::channel();
        self.send(command(reply))?;
        response.await.map_err(|_| EditorError::SessionClosed)?
    }
}
