//! Note domain model.
//!
//! # Responsibility
//! - Define the persisted note record and the edit-screen draft.
//! - Provide draft validation shared by every save path.
//!
//! # Invariants
//! - `id` is stable once persisted and never reused for another note.
//! - `created_at` is assigned once at insert time and never rewritten.
//! - An id `<= 0` means "not yet persisted".

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::{SystemTime, UNIX_EPOCH};

/// Row identifier assigned by the store on insert.
pub type NoteId = i64;

/// Id carried by notes that have not been written yet.
pub const UNSAVED_NOTE_ID: NoteId = 0;

/// Persisted note record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    pub title: Option<String>,
    pub content: String,
    /// Unix epoch milliseconds. Rows migrated from schema v1 carry `0`.
    pub created_at: i64,
}

impl Note {
    /// Returns whether this note carries a store-assigned id.
    pub fn is_persisted(&self) -> bool {
        is_persisted_id(self.id)
    }

    /// Returns whether title and content match `other`, ignoring identity.
    pub fn same_contents(&self, other: &Note) -> bool {
        self.title == other.title && self.content == other.content
    }
}

/// Returns whether `id` can refer to a stored row.
pub fn is_persisted_id(id: NoteId) -> bool {
    id > 0
}

/// Unsaved or in-progress note input coming from the edit screen.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NoteDraft {
    /// Target note, or `UNSAVED_NOTE_ID` for a new note.
    pub id: NoteId,
    pub title: String,
    pub content: String,
    /// Set once the user has touched either field.
    #[serde(default)]
    pub edited: bool,
}

impl NoteDraft {
    /// Starts a draft for a brand-new note.
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: UNSAVED_NOTE_ID,
            title: title.into(),
            content: content.into(),
            edited: true,
        }
    }

    /// Starts an untouched draft from an existing note.
    pub fn from_note(note: &Note) -> Self {
        Self {
            id: note.id,
            title: note.title.clone().unwrap_or_default(),
            content: note.content.clone(),
            edited: false,
        }
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
        self.edited = true;
    }

    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = content.into();
        self.edited = true;
    }

    pub fn targets_existing(&self) -> bool {
        is_persisted_id(self.id)
    }

    /// Rejects drafts with nothing worth saving.
    pub fn validate(&self) -> Result<(), NoteValidationError> {
        if self.title.trim().is_empty() && self.content.trim().is_empty() {
            return Err(NoteValidationError::Empty);
        }
        Ok(())
    }

    /// Title as stored: blank titles become `NULL`.
    pub fn stored_title(&self) -> Option<&str> {
        if self.title.trim().is_empty() {
            None
        } else {
            Some(self.title.as_str())
        }
    }
}

/// Validation error for note drafts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteValidationError {
    /// Title and content are both blank.
    Empty,
}

impl Display for NoteValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "note title and content are both empty"),
        }
    }
}

impl Error for NoteValidationError {}

/// Current wall-clock time in epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::{is_persisted_id, Note, NoteDraft, NoteValidationError, UNSAVED_NOTE_ID};

    #[test]
    fn sentinel_ids_are_not_persisted() {
        assert!(!is_persisted_id(UNSAVED_NOTE_ID));
        assert!(!is_persisted_id(-1));
        assert!(is_persisted_id(1));
        let draft_only = Note {
            id: UNSAVED_NOTE_ID,
            title: None,
            content: "x".to_string(),
            created_at: 0,
        };
        assert!(!draft_only.is_persisted());
    }

    #[test]
    fn blank_draft_is_rejected() {
        let draft = NoteDraft::new("  ", "\n\t");
        assert_eq!(draft.validate(), Err(NoteValidationError::Empty));
        assert!(NoteDraft::new("", "body").validate().is_ok());
        assert!(NoteDraft::new("title", "").validate().is_ok());
    }

    #[test]
    fn blank_title_is_stored_as_null() {
        assert_eq!(NoteDraft::new(" ", "body").stored_title(), None);
        assert_eq!(NoteDraft::new("t", "body").stored_title(), Some("t"));
    }

    #[test]
    fn draft_from_note_starts_unedited() {
        let note = Note {
            id: 4,
            title: None,
            content: "body".to_string(),
            created_at: 10,
        };
        let mut draft = NoteDraft::from_note(&note);
        assert!(!draft.edited);
        assert!(draft.targets_existing());
        draft.set_content("changed");
        assert!(draft.edited);
    }
}
