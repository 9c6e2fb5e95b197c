//! Note list (home) screen flow.
//!
//! # Responsibility
//! - Dispatch store calls to the blocking pool and fold their results back
//!   into the list controller on the owning task.
//! - Consume pending results published by child screens.
//! - Drive the two-phase delete.
//!
//! # Invariants
//! - Controller state is only mutated in `apply`, on the owning task.
//! - Failed loads and deletes leave the displayed list unchanged.
//! - Completions that arrive after `close` are dropped without effect.
//! - Every dispatched call carries a sequence number. Once a list exists, a
//!   load older than the newest applied load, delete or fetch is dropped, so
//!   a snapshot read before a delete cannot bring the row back. The first
//!   load is always applied.
//!
//! Spawning methods must be called from within a tokio runtime.

use crate::list::controller::{
    DeleteFailure, DeleteOutcome, NoteListController, RowAction, UpdateInstruction,
};
use crate::model::note::{Note, NoteId};
use crate::screen::handoff::{PendingResult, ResultSlot};
use crate::store::{NoteStore, StoreResult};
use log::{debug, warn};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Result of a background store call, delivered to the owning task.
#[derive(Debug)]
pub enum Completion {
    Loaded {
        seq: u64,
        mode: LoadMode,
        notes: StoreResult<Vec<Note>>,
    },
    Deleted {
        seq: u64,
        outcome: DeleteOutcome,
    },
    /// Note fetched in response to an added/updated handoff.
    Fetched {
        seq: u64,
        result: PendingResult,
        note: StoreResult<Option<Note>>,
    },
}

/// How a loaded snapshot is folded into the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    /// Replace everything and clear the selection.
    Replace,
    /// Diff against the current rows, keeping surviving selection.
    Reconcile,
}

/// Transient, user-visible failure notice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserMessage {
    LoadFailed(String),
    DeleteFailed(NoteId),
    HandoffFailed(String),
}

/// What the rendering layer should do after a completion was applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScreenUpdate {
    Instructions(Vec<UpdateInstruction>),
    Message(UserMessage),
    Unchanged,
}

/// Gesture result: the resolved action plus any immediate view updates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GestureResponse {
    pub action: RowAction,
    pub instructions: Vec<UpdateInstruction>,
}

pub struct HomeScreen {
    store: NoteStore,
    results: ResultSlot,
    controller: NoteListController,
    completion_tx: UnboundedSender<Completion>,
    completion_rx: UnboundedReceiver<Completion>,
    next_seq: AtomicU64,
    last_load_seq: Option<u64>,
    last_edit_seq: u64,
}

impl HomeScreen {
    pub fn new(store: NoteStore, results: ResultSlot) -> Self {
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();
        Self {
            store,
            results,
            controller: NoteListController::new(),
            completion_tx,
            completion_rx,
            next_seq: AtomicU64::new(0),
            last_load_seq: None,
            last_edit_seq: 0,
        }
    }

    pub fn controller(&self) -> &NoteListController {
        &self.controller
    }

    /// Slot child screens publish into.
    pub fn results(&self) -> ResultSlot {
        self.results.clone()
    }

    /// Starts a full reload of the list.
    pub fn request_load(&self) {
        self.dispatch_load(LoadMode::Replace);
    }

    /// Starts a reload that is diffed against the rows already shown.
    pub fn request_refresh(&self) {
        self.dispatch_load(LoadMode::Reconcile);
    }

    fn dispatch_load(&self, mode: LoadMode) {
        self.dispatch(move |store, seq| Completion::Loaded {
            seq,
            mode,
            notes: store.get_all_notes(),
        });
    }

    /// Starts the storage phase of a two-phase delete.
    pub fn request_delete(&self, id: NoteId, index: usize) {
        self.dispatch(move |store, seq| {
            let outcome = match store.delete_note(id) {
                Ok(0) => DeleteOutcome::Failed {
                    id,
                    reason: DeleteFailure::NoRowsAffected,
                },
                Ok(_) => DeleteOutcome::Success { id, index },
                Err(err) => DeleteOutcome::Failed {
                    id,
                    reason: DeleteFailure::Storage(err.to_string()),
                },
            };
            Completion::Deleted { seq, outcome }
        });
    }

    /// Consumes pending child-screen results and starts the matching work.
    ///
    /// Returns the number of background calls started.
    pub fn consume_handoff(&self) -> usize {
        let pending = self.results.take_all();
        for result in &pending {
            match *result {
                PendingResult::NoteAdded(id) | PendingResult::NoteUpdated(id) => {
                    let result = *result;
                    self.dispatch(move |store, seq| Completion::Fetched {
                        seq,
                        result,
                        note: store.get_note(id),
                    });
                }
                PendingResult::RefreshRequested => self.request_refresh(),
            }
        }
        pending.len()
    }

    pub fn tap(&mut self, id: NoteId) -> GestureResponse {
        let action = self.controller.on_row_tap(id);
        self.respond(action)
    }

    pub fn long_press(&mut self, id: NoteId) -> GestureResponse {
        let action = self.controller.on_row_long_press(id);
        self.respond(action)
    }

    /// Delete icon tap; the list changes only once the store confirms.
    pub fn delete_icon_tap(&mut self, id: NoteId, index: usize) -> GestureResponse {
        let action = self.controller.on_delete_icon_tap(id, index);
        self.respond(action)
    }

    fn respond(&mut self, action: RowAction) -> GestureResponse {
        let instructions = match action {
            RowAction::ToggleSelection(id) => self.controller.toggle_selection(id),
            RowAction::RequestDelete { id, index } => {
                self.request_delete(id, index);
                Vec::new()
            }
            RowAction::OpenNote(_) => Vec::new(),
        };
        GestureResponse {
            action,
            instructions,
        }
    }

    /// Waits for the next background completion.
    pub async fn next_completion(&mut self) -> Option<Completion> {
        self.completion_rx.recv().await
    }

    /// Waits for the next completion and applies it.
    pub async fn process_next(&mut self) -> Option<ScreenUpdate> {
        let completion = self.next_completion().await?;
        Some(self.apply(completion))
    }

    /// Folds one completion into the list state.
    pub fn apply(&mut self, completion: Completion) -> ScreenUpdate {
        match completion {
            Completion::Loaded { seq, mode, notes } => self.apply_loaded(seq, mode, notes),
            Completion::Deleted { seq, outcome } => self.apply_delete(seq, outcome),
            Completion::Fetched { seq, result, note } => self.apply_fetched(seq, result, note),
        }
    }

    fn apply_loaded(
        &mut self,
        seq: u64,
        mode: LoadMode,
        notes: StoreResult<Vec<Note>>,
    ) -> ScreenUpdate {
        if let Some(last_load_seq) = self.last_load_seq {
            if seq < last_load_seq.max(self.last_edit_seq) {
                debug!(
                    "event=list_load module=screen status=skipped reason=stale seq={}",
                    seq
                );
                return ScreenUpdate::Unchanged;
            }
        }

        let notes = match notes {
            Ok(notes) => notes,
            Err(err) => {
                warn!(
                    "event=list_load module=screen status=error error={}",
                    err
                );
                return ScreenUpdate::Message(UserMessage::LoadFailed(err.to_string()));
            }
        };
        self.last_load_seq = Some(seq);
        let instructions = match mode {
            LoadMode::Replace => self.controller.load(notes),
            LoadMode::Reconcile => self.controller.submit(notes),
        };
        ScreenUpdate::Instructions(instructions)
    }

    fn apply_delete(&mut self, seq: u64, outcome: DeleteOutcome) -> ScreenUpdate {
        if let DeleteOutcome::Failed { id, reason } = &outcome {
            warn!(
                "event=note_delete module=screen status=error note_id={} reason={:?}",
                id, reason
            );
            return ScreenUpdate::Message(UserMessage::DeleteFailed(*id));
        }
        self.last_edit_seq = self.last_edit_seq.max(seq);
        match self.controller.apply_delete_outcome(&outcome) {
            Ok(Some(instruction)) => ScreenUpdate::Instructions(vec![instruction]),
            Ok(None) => ScreenUpdate::Unchanged,
            Err(err) => {
                warn!("event=note_delete module=screen status=error error={}", err);
                ScreenUpdate::Unchanged
            }
        }
    }

    fn apply_fetched(
        &mut self,
        seq: u64,
        result: PendingResult,
        note: StoreResult<Option<Note>>,
    ) -> ScreenUpdate {
        let note = match note {
            Ok(Some(note)) => note,
            Ok(None) => {
                debug!(
                    "event=handoff module=screen status=skipped reason=note_missing key={:?}",
                    result.key()
                );
                return ScreenUpdate::Unchanged;
            }
            Err(err) => {
                warn!("event=handoff module=screen status=error error={}", err);
                return ScreenUpdate::Message(UserMessage::HandoffFailed(err.to_string()));
            }
        };

        self.last_edit_seq = self.last_edit_seq.max(seq);
        let instructions = match result {
            PendingResult::NoteAdded(_) => self.controller.insert_at_top(note),
            _ => vec![self.controller.upsert_by_id(note).1],
        };
        ScreenUpdate::Instructions(instructions)
    }

    /// Tears the screen down; outstanding completions are discarded.
    pub fn close(self) {
        debug!(
            "event=screen_close module=screen status=ok rows={}",
            self.controller.len()
        );
    }

    fn dispatch<F>(&self, work: F)
    where
        F: FnOnce(&NoteStore, u64) -> Completion + Send + 'static,
    {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed) + 1;
        let store = self.store.clone();
        let completion_tx = self.completion_tx.clone();
        tokio::task::spawn_blocking(move || {
            let completion = work(&store, seq);
            if completion_tx.send(completion).is_err() {
                debug!("event=completion_dropped module=screen status=skipped reason=screen_closed");
            }
        });
    }
}
