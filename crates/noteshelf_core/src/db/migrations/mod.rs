//! SQLite migration registry and executor.
//!
//! # Responsibility
//! - Register schema migrations in strictly increasing order.
//! - Apply pending migrations atomically, up to a requested target.
//!
//! # Invariants
//! - `version` values must remain monotonic.
//! - Every step is additive: it may add tables, columns or indexes, never
//!   drop or retype existing data.
//! - Applied migration version is mirrored to `PRAGMA user_version`.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::Connection;

#[derive(Debug, Clone, Copy)]
struct Migration {
    version: u32,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    // Base `notes` table.
    Migration {
        version: 1,
        sql: include_str!("0001_init.sql"),
    },
    // `createdAt` column with default 0 plus its ordering index.
    Migration {
        version: 2,
        sql: include_str!("0002_created_at.sql"),
    },
];

/// Returns the latest migration version known by this binary.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Applies all pending migrations on the provided connection.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    apply_migrations_to(conn, latest_version())
}

/// Applies pending migrations up to and including `target`.
///
/// A database already at or beyond `target` (but not beyond the latest
/// known version) is left untouched.
///
/// # Errors
/// - `UnknownTargetVersion` when `target` exceeds the latest known version.
/// - `UnsupportedSchemaVersion` when the database is newer than this binary.
pub fn apply_migrations_to(conn: &mut Connection, target: u32) -> DbResult<()> {
    let latest = latest_version();
    if target > latest {
        return Err(DbError::UnknownTargetVersion {
            requested: target,
            latest_supported: latest,
        });
    }

    let current_version = current_user_version(conn)?;
    if current_version > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: current_version,
            latest_supported: latest,
        });
    }

    if current_version >= target {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for migration in MIGRATIONS {
        if migration.version <= current_version || migration.version > target {
            continue;
        }

        tx.execute_batch(migration.sql)?;
        tx.execute_batch(&format!("PRAGMA user_version = {};", migration.version))?;
    }
    tx.commit()?;

    info!(
        "event=db_migrate module=db status=ok from_version={} to_version={}",
        current_version, target
    );
    Ok(())
}

/// Reads the schema version recorded in `PRAGMA user_version`.
pub fn current_user_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::{apply_migrations_to, current_user_version, latest_version, MIGRATIONS};
    use crate::db::DbError;
    use rusqlite::Connection;

    #[test]
    fn migration_versions_are_strictly_increasing() {
        let versions: Vec<u32> = MIGRATIONS.iter().map(|m| m.version).collect();
        assert!(versions.windows(2).all(|pair| pair[0] < pair[1]));
        assert_eq!(latest_version(), 2);
    }

    #[test]
    fn partial_target_stops_at_requested_version() {
        let mut conn = Connection::open_in_memory().unwrap();
        apply_migrations_to(&mut conn, 1).unwrap();
        assert_eq!(current_user_version(&conn).unwrap(), 1);

        apply_migrations_to(&mut conn, 2).unwrap();
        assert_eq!(current_user_version(&conn).unwrap(), 2);
    }

    #[test]
    fn unknown_target_is_rejected_before_touching_schema() {
        let mut conn = Connection::open_in_memory().unwrap();
        let err = apply_migrations_to(&mut conn, 9).unwrap_err();
        assert!(matches!(
            err,
            DbError::UnknownTargetVersion { requested: 9, .. }
        ));
        assert_eq!(current_user_version(&conn).unwrap(), 0);
    }
}
