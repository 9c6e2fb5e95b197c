//! Shared note store handle.
//!
//! # Responsibility
//! - Own the single SQLite connection used by every screen.
//! - Expose synchronous note CRUD with the store-level error taxonomy.
//!
//! # Invariants
//! - The handle is constructed explicitly and cloned into each consumer;
//!   all clones share one connection guarded by a mutex.
//! - After `close()` every clone fails with `StoreError::StoreClosed`.
//! - Operations never retry and never span more than one row write.
//!
//! Callers must run these methods off latency-sensitive contexts (see
//! `screen`, which dispatches them through `spawn_blocking`).

use crate::db::migrations::{current_user_version, latest_version};
use crate::db::{open_db_at_version, open_db_in_memory, DbError};
use crate::model::note::{now_epoch_ms, Note, NoteId};
use crate::repo::note_repo::{NoteRepository, RepoError, SqliteNoteRepository};
use log::{debug, warn};
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub type StoreResult<T> = Result<T, StoreError>;

/// Store-level failure taxonomy surfaced to callers.
#[derive(Debug)]
pub enum StoreError {
    /// The underlying database could not be opened or migrated.
    StorageUnavailable(DbError),
    /// An insert/update/delete did not take effect.
    WriteFailed(String),
    /// Lookup by id returned nothing.
    NotFound(NoteId),
    /// Operation on a handle that has been closed.
    StoreClosed,
    /// Statement-level failure on an open connection.
    Repo(RepoError),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StorageUnavailable(err) => write!(f, "note storage unavailable: {err}"),
            Self::WriteFailed(details) => write!(f, "{details}"),
            Self::NotFound(id) => write!(f, "note not found: {id}"),
            Self::StoreClosed => write!(f, "note store is closed"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::StorageUnavailable(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for StoreError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::WriteFailed(details) => Self::WriteFailed(details.to_string()),
            other => Self::Repo(other),
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Repo(RepoError::from(value))
    }
}

/// Cloneable handle to the note database.
#[derive(Clone)]
pub struct NoteStore {
    conn: Arc<Mutex<Option<Connection>>>,
}

impl NoteStore {
    /// Opens (creating if absent) the database at `path`, migrated to the
    /// latest schema version.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Self::initialize(path, latest_version())
    }

    /// Opens the database at `path` and migrates it up to `schema_version`.
    ///
    /// # Errors
    /// - `StorageUnavailable` when the file cannot be opened, the schema is
    ///   newer than supported, or a migration step fails.
    pub fn initialize(path: impl AsRef<Path>, schema_version: u32) -> StoreResult<Self> {
        let conn = open_db_at_version(path, schema_version).map_err(|err| {
            warn!(
                "event=store_open module=store status=error error_code=storage_unavailable error={}",
                err
            );
            StoreError::StorageUnavailable(err)
        })?;
        Ok(Self::from_connection(conn))
    }

    /// Opens a private in-memory store at the latest schema version.
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = open_db_in_memory().map_err(StoreError::StorageUnavailable)?;
        Ok(Self::from_connection(conn))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(Some(conn))),
        }
    }

    /// Inserts a note stamped with the current time and returns its id.
    pub fn add_note(&self, title: Option<&str>, content: &str) -> StoreResult<NoteId> {
        let created_at = now_epoch_ms();
        let id = self.with_repo(|repo| repo.create_note(title, content, created_at))?;
        debug!("event=note_add module=store status=ok note_id={}", id);
        Ok(id)
    }

    /// Replaces title and content of `id`; `createdAt` is left untouched.
    ///
    /// Returns the affected row count. `0` means no row matched.
    pub fn update_note(&self, id: NoteId, title: Option<&str>, content: &str) -> StoreResult<usize> {
        let changed = self.with_repo(|repo| repo.update_note(id, title, content))?;
        debug!(
            "event=note_update module=store status=ok note_id={} rows={}",
            id, changed
        );
        Ok(changed)
    }

    /// Removes `id`. Returns the affected row count; `0` means no such id.
    pub fn delete_note(&self, id: NoteId) -> StoreResult<usize> {
        let changed = self.with_repo(|repo| repo.delete_note(id))?;
        debug!(
            "event=note_delete module=store status=ok note_id={} rows={}",
            id, changed
        );
        Ok(changed)
    }

    pub fn get_note(&self, id: NoteId) -> StoreResult<Option<Note>> {
        self.with_repo(|repo| repo.get_note(id))
    }

    /// Like [`NoteStore::get_note`] but maps absence to `NotFound`.
    pub fn require_note(&self, id: NoteId) -> StoreResult<Note> {
        self.get_note(id)?.ok_or(StoreError::NotFound(id))
    }

    /// Returns every note ordered by `createdAt` descending.
    pub fn get_all_notes(&self) -> StoreResult<Vec<Note>> {
        self.with_repo(|repo| repo.list_notes())
    }

    pub fn count_notes(&self) -> StoreResult<u64> {
        self.with_repo(|repo| repo.count_notes())
    }

    /// Reads the on-disk schema version.
    pub fn schema_version(&self) -> StoreResult<u32> {
        let guard = self.lock();
        let conn = guard.as_ref().ok_or(StoreError::StoreClosed)?;
        current_user_version(conn).map_err(StoreError::StorageUnavailable)
    }

    /// Releases the connection for every clone of this handle.
    ///
    /// Closing an already closed store is a no-op.
    pub fn close(&self) -> StoreResult<()> {
        let taken = self.lock().take();
        match taken {
            Some(conn) => {
                conn.close().map_err(|(_, err)| StoreError::from(err))?;
                debug!("event=store_close module=store status=ok");
                Ok(())
            }
            None => Ok(()),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.lock().is_none()
    }

    fn with_repo<T>(
        &self,
        op: impl FnOnce(&SqliteNoteRepository<'_>) -> Result<T, RepoError>,
    ) -> StoreResult<T> {
        let guard = self.lock();
        let conn = guard.as_ref().ok_or(StoreError::StoreClosed)?;
        let repo = SqliteNoteRepository::try_new(conn)?;
        Ok(op(&repo)?)
    }

    fn lock(&self) -> MutexGuard<'_, Option<Connection>> {
        // Statements are single-row autocommits; a poisoned guard still
        // holds a consistent connection.
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::{NoteStore, StoreError};

    #[test]
    fn clones_share_one_connection() {
        let store = NoteStore::open_in_memory().unwrap();
        let other = store.clone();
        let id = store.add_note(None, "shared").unwrap();
        assert_eq!(other.get_note(id).unwrap().unwrap().content, "shared");
    }

    #[test]
    fn close_is_visible_to_every_clone_and_idempotent() {
        let store = NoteStore::open_in_memory().unwrap();
        let other = store.clone();
        store.close().unwrap();
        store.close().unwrap();

        assert!(other.is_closed());
        assert!(matches!(
            other.get_all_notes().unwrap_err(),
            StoreError::StoreClosed
        ));
        assert!(matches!(
            other.add_note(None, "late").unwrap_err(),
            StoreError::StoreClosed
        ));
    }

    #[test]
    fn require_note_maps_absence_to_not_found() {
        let store = NoteStore::open_in_memory().unwrap();
        assert!(matches!(
            store.require_note(42).unwrap_err(),
            StoreError::NotFound(42)
        ));
    }
}
