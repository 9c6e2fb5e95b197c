//! Create/edit screen flow.
//!
//! # Responsibility
//! - Validate drafts and persist them as adds or updates.
//! - Publish the affected id to the list screen's pending-result slot.
//! - Resolve the keep/discard confirmation shown when leaving with edits.
//!
//! # Invariants
//! - Updates read before they write: a missing note is `NotFound`, never an
//!   add.
//! - Nothing is published unless the store confirmed the write.

use crate::model::note::{NoteDraft, NoteId, NoteValidationError};
use crate::screen::handoff::{PendingResult, ResultSlot};
use crate::store::{NoteStore, StoreError};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Added(NoteId),
    Updated(NoteId),
    /// The draft targets a note that no longer exists.
    NotFound(NoteId),
}

#[derive(Debug)]
pub enum SaveError {
    Empty(NoteValidationError),
    /// The note exists but the update reported zero affected rows.
    UpdateFailed(NoteId),
    Store(StoreError),
    /// The background task running the save did not complete.
    Interrupted(String),
}

impl Display for SaveError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty(err) => write!(f, "{err}"),
            Self::UpdateFailed(id) => write!(f, "update of note {id} affected no rows"),
            Self::Store(err) => write!(f, "{err}"),
            Self::Interrupted(details) => write!(f, "save interrupted: {details}"),
        }
    }
}

impl Error for SaveError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Empty(err) => Some(err),
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<NoteValidationError> for SaveError {
    fn from(value: NoteValidationError) -> Self {
        Self::Empty(value)
    }
}

impl From<StoreError> for SaveError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

/// Persists `draft` synchronously.
///
/// Drafts targeting an existing id are updated after confirming the row is
/// still there; other drafts are inserted.
pub fn save_note(store: &NoteStore, draft: &NoteDraft) -> Result<SaveOutcome, SaveError> {
    draft.validate()?;
    let title = draft.stored_title();

    if !draft.targets_existing() {
        let id = store.add_note(title, draft.content.as_str())?;
        return Ok(SaveOutcome::Added(id));
    }

    if store.get_note(draft.id)?.is_none() {
        return Ok(SaveOutcome::NotFound(draft.id));
    }
    match store.update_note(draft.id, title, draft.content.as_str())? {
        0 => Err(SaveError::UpdateFailed(draft.id)),
        _ => Ok(SaveOutcome::Updated(draft.id)),
    }
}

/// Answer to the keep/discard confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitChoice {
    Keep,
    Discard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitOutcome {
    /// The draft had no edits; nothing was asked or written.
    Unchanged,
    Discarded,
    Saved(SaveOutcome),
}

/// Edit screen bound to the store and the list screen's result slot.
#[derive(Clone)]
pub struct EditScreen {
    store: NoteStore,
    results: ResultSlot,
}

impl EditScreen {
    pub fn new(store: NoteStore, results: ResultSlot) -> Self {
        Self { store, results }
    }

    /// Whether leaving with `draft` should ask keep/discard first.
    pub fn needs_exit_confirmation(draft: &NoteDraft) -> bool {
        draft.edited
    }

    /// Saves `draft` off the calling task and publishes the result.
    pub async fn save(&self, draft: NoteDraft) -> Result<SaveOutcome, SaveError> {
        let store = self.store.clone();
        let outcome = tokio::task::spawn_blocking(move || save_note(&store, &draft))
            .await
            .map_err(|err| SaveError::Interrupted(err.to_string()))?;

        match &outcome {
            Ok(SaveOutcome::Added(id)) => {
                info!(
                    "event=note_save module=screen status=ok kind=added note_id={}",
                    id
                );
                self.results.publish(PendingResult::NoteAdded(*id));
            }
            Ok(SaveOutcome::Updated(id)) => {
                info!(
                    "event=note_save module=screen status=ok kind=updated note_id={}",
                    id
                );
                self.results.publish(PendingResult::NoteUpdated(*id));
            }
            Ok(SaveOutcome::NotFound(id)) => {
                warn!(
                    "event=note_save module=screen status=error error_code=not_found note_id={}",
                    id
                );
            }
            Err(err) => {
                warn!("event=note_save module=screen status=error error={}", err);
            }
        }
        outcome
    }

    /// Applies the user's answer to the keep/discard confirmation.
    pub async fn resolve_exit(
        &self,
        draft: NoteDraft,
        choice: ExitChoice,
    ) -> Result<ExitOutcome, SaveError> {
        if !Self::needs_exit_confirmation(&draft) {
            return Ok(ExitOutcome::Unchanged);
        }
        match choice {
            ExitChoice::Discard => Ok(ExitOutcome::Discarded),
            ExitChoice::Keep => self.save(draft).await.map(ExitOutcome::Saved),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{save_note, SaveError, SaveOutcome};
    use crate::model::note::NoteDraft;
    use crate::store::NoteStore;

    #[test]
    fn save_rejects_blank_draft_without_writing() {
        let store = NoteStore::open_in_memory().unwrap();
        let err = save_note(&store, &NoteDraft::new(" ", "")).unwrap_err();
        assert!(matches!(err, SaveError::Empty(_)));
        assert_eq!(store.count_notes().unwrap(), 0);
    }

    #[test]
    fn save_of_vanished_note_reports_not_found_and_adds_nothing() {
        let store = NoteStore::open_in_memory().unwrap();
        let id = store.add_note(None, "doomed").unwrap();
        let mut draft = NoteDraft::from_note(&store.get_note(id).unwrap().unwrap());
        store.delete_note(id).unwrap();

        draft.set_content("edited");
        assert_eq!(save_note(&store, &draft).unwrap(), SaveOutcome::NotFound(id));
        assert_eq!(store.count_notes().unwrap(), 0);
    }

    #[test]
    fn identical_update_still_counts_as_updated() {
        let store = NoteStore::open_in_memory().unwrap();
        let id = store.add_note(Some("t"), "same").unwrap();
        let draft = NoteDraft::from_note(&store.get_note(id).unwrap().unwrap());
        assert_eq!(save_note(&store, &draft).unwrap(), SaveOutcome::Updated(id));
    }
}
