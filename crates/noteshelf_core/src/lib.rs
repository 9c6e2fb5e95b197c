//! Core logic for Noteshelf.
//! Owns note persistence, list/selection state and the screen flows that
//! connect them; rendering lives outside this crate.

pub mod config;
pub mod db;
pub mod list;
pub mod logging;
pub mod model;
pub mod repo;
pub mod screen;
pub mod store;

pub use config::CoreConfig;
pub use list::controller::{
    DeleteFailure, DeleteOutcome, ListError, NoteListController, RowAction, RowState,
    UpdateInstruction,
};
pub use logging::{default_log_level, init_logging, init_logging_from_config, logging_status};
pub use model::note::{Note, NoteDraft, NoteId, NoteValidationError, UNSAVED_NOTE_ID};
pub use repo::note_repo::{NoteRepository, RepoError, RepoResult, SqliteNoteRepository};
pub use screen::edit::{save_note, EditScreen, ExitChoice, ExitOutcome, SaveError, SaveOutcome};
pub use screen::handoff::{HandoffKey, PendingResult, ResultSlot};
pub use screen::home::{
    Completion, GestureResponse, HomeScreen, LoadMode, ScreenUpdate, UserMessage,
};
pub use store::{NoteStore, StoreError, StoreResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
