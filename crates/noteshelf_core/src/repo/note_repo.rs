//! Note repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide single-row CRUD over the `notes` table.
//! - Keep SQL and column naming inside the persistence boundary.
//!
//! # Invariants
//! - Every statement touches at most one row, except full-list reads.
//! - Updates never write `createdAt`.
//! - List order is `createdAt DESC, _id ASC`, so ties keep insertion order.

use crate::db::DbError;
use crate::model::note::{Note, NoteId};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};

const NOTE_SELECT_SQL: &str = "SELECT
    _id,
    title,
    content,
    createdAt
FROM notes";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for note persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    /// A write statement completed but produced no usable row id.
    WriteFailed(&'static str),
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::WriteFailed(details) => write!(f, "note write failed: {details}"),
            Self::MissingRequiredTable(table) => write!(f, "missing required table `{table}`"),
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "missing required column `{table}.{column}`")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface for note CRUD operations.
pub trait NoteRepository {
    /// Inserts one row and returns the generated id.
    fn create_note(&self, title: Option<&str>, content: &str, created_at: i64)
        -> RepoResult<NoteId>;
    /// Replaces title and content; returns affected row count.
    fn update_note(&self, id: NoteId, title: Option<&str>, content: &str) -> RepoResult<usize>;
    /// Hard-deletes one row; returns affected row count.
    fn delete_note(&self, id: NoteId) -> RepoResult<usize>;
    fn get_note(&self, id: NoteId) -> RepoResult<Option<Note>>;
    /// Lists every note, most recently created first.
    fn list_notes(&self) -> RepoResult<Vec<Note>>;
    fn count_notes(&self) -> RepoResult<u64>;
}

/// SQLite-backed note repository.
pub struct SqliteNoteRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteNoteRepository<'conn> {
    /// Constructs a repository after verifying the connection is migrated.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_note_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl NoteRepository for SqliteNoteRepository<'_> {
    fn create_note(
        &self,
        title: Option<&str>,
        content: &str,
        created_at: i64,
    ) -> RepoResult<NoteId> {
        self.conn.execute(
            "INSERT INTO notes (title, content, createdAt) VALUES (?1, ?2, ?3);",
            params![title, content, created_at],
        )?;

        let id = self.conn.last_insert_rowid();
        if id <= 0 {
            return Err(RepoError::WriteFailed("insert returned no row id"));
        }
        Ok(id)
    }

    fn update_note(&self, id: NoteId, title: Option<&str>, content: &str) -> RepoResult<usize> {
        let changed = self.conn.execute(
            "UPDATE notes SET title = ?2, content = ?3 WHERE _id = ?1;",
            params![id, title, content],
        )?;
        Ok(changed)
    }

    fn delete_note(&self, id: NoteId) -> RepoResult<usize> {
        let changed = self
            .conn
            .execute("DELETE FROM notes WHERE _id = ?1;", params![id])?;
        Ok(changed)
    }

    fn get_note(&self, id: NoteId) -> RepoResult<Option<Note>> {
        let sql = format!("{NOTE_SELECT_SQL} WHERE _id = ?1;");
        let note = self
            .conn
            .query_row(&sql, params![id], parse_note_row)
            .optional()?;
        Ok(note)
    }

    fn list_notes(&self) -> RepoResult<Vec<Note>> {
        let sql = format!("{NOTE_SELECT_SQL} ORDER BY createdAt DESC, _id ASC;");
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([])?;
        let mut notes = Vec::new();
        while let Some(row) = rows.next()? {
            notes.push(parse_note_row(row)?);
        }
        Ok(notes)
    }

    fn count_notes(&self) -> RepoResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM notes;", [], |row| row.get(0))?;
        Ok(u64::try_from(count).unwrap_or(0))
    }
}

fn parse_note_row(row: &Row<'_>) -> rusqlite::Result<Note> {
    Ok(Note {
        id: row.get("_id")?,
        title: row.get("title")?,
        content: row.get("content")?,
        created_at: row.get("createdAt")?,
    })
}

fn ensure_note_connection_ready(conn: &Connection) -> RepoResult<()> {
    if !table_exists(conn, "notes")? {
        return Err(RepoError::MissingRequiredTable("notes"));
    }

    for column in ["_id", "title", "content", "createdAt"] {
        if !table_has_column(conn, "notes", column)? {
            return Err(RepoError::MissingRequiredColumn {
                table: "notes",
                column,
            });
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::{NoteRepository, RepoError, SqliteNoteRepository};
    use crate::db::{open_db_in_memory, open_db_at_version};

    #[test]
    fn repository_rejects_connection_without_created_at() {
        let dir = tempfile::tempdir().unwrap();
        let conn = open_db_at_version(dir.path().join("v1.db"), 1).unwrap();
        let err = SqliteNoteRepository::try_new(&conn).err().unwrap();
        assert!(matches!(
            err,
            RepoError::MissingRequiredColumn {
                table: "notes",
                column: "createdAt"
            }
        ));
    }

    #[test]
    fn ties_on_created_at_keep_insertion_order() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqliteNoteRepository::try_new(&conn).unwrap();
        let first = repo.create_note(None, "first", 500).unwrap();
        let second = repo.create_note(None, "second", 500).unwrap();
        let newest = repo.create_note(None, "newest", 900).unwrap();

        let ids: Vec<_> = repo.list_notes().unwrap().iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![newest, first, second]);
        assert_eq!(repo.count_notes().unwrap(), 3);
    }
}
