//! `SQLite` run store utilities.
//!
//! Runtime defaults:
//! - `journal_mode = WAL` so readers never block the writer
//! - `busy_timeout = 5s` to absorb transient lock failures between processes
//! - `foreign_keys = ON` so deleting gear cascades to its runs

pub mod migrations;
pub mod schema;
pub mod sqlite;

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::{path::Path, time::Duration};

pub use sqlite::SqliteStore;

/// Busy timeout used for store connections.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Open (or create) the store database, apply runtime pragmas, and migrate
/// the schema to the latest version.
///
/// # Errors
///
/// Returns an error if opening/configuring/migrating the database fails.
pub fn open_store(path: &Path) -> Result<SqliteStore> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create store directory {}", parent.display()))?;
    }

    let mut conn =
        Connection::open(path).with_context(|| format!("open store database {}", path.display()))?;

    configure_connection(&conn).context("configure sqlite pragmas")?;
    migrations::migrate(&mut conn).context("apply store migrations")?;
    tracing::debug!(path = %path.display(), "opened run store");

    Ok(SqliteStore::from_connection(conn))
}

/// Open a private in-memory store with the latest schema.
///
/// # Errors
///
/// Returns an error if `SQLite` cannot create or migrate the database.
pub fn open_in_memory() -> Result<SqliteStore> {
    let mut conn = Connection::open_in_memory().context("open in-memory store")?;
    conn.pragma_update(None, "foreign_keys", "ON")
        .context("enable foreign keys")?;
    migrations::migrate(&mut conn).context("apply store migrations")?;
    Ok(SqliteStore::from_connection(conn))
}

fn configure_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    let _journal_mode: String =
        conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
    conn.busy_timeout(DEFAULT_BUSY_TIMEOUT)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{DEFAULT_BUSY_TIMEOUT, configure_connection, open_store};
    use crate::db::migrations;
    use crate::store::RunStore;
    use rusqlite::Connection;
    use tempfile::TempDir;

    fn temp_db_path() -> (TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("nested/treadlog.sqlite3");
        (dir, path)
    }

    #[test]
    fn configure_sets_wal_busy_timeout_and_fk() {
        let (_dir, path) = temp_db_path();
        std::fs::create_dir_all(path.parent().expect("parent")).expect("create parent");
        let conn = Connection::open(&path).expect("open db");
        configure_connection(&conn).expect("configure");

        let journal_mode: String = conn
            .pragma_query_value(None, "journal_mode", |row| row.get(0))
            .expect("query journal_mode");
        assert_eq!(journal_mode.to_ascii_lowercase(), "wal");

        let busy_timeout_ms: u64 = conn
            .pragma_query_value(None, "busy_timeout", |row| row.get(0))
            .expect("query busy_timeout");
        assert_eq!(u128::from(busy_timeout_ms), DEFAULT_BUSY_TIMEOUT.as_millis());

        let foreign_keys: i64 = conn
            .pragma_query_value(None, "foreign_keys", |row| row.get(0))
            .expect("query foreign_keys");
        assert_eq!(foreign_keys, 1);
    }

    #[test]
    fn open_store_creates_parent_dirs_and_migrates() {
        let (_dir, path) = temp_db_path();
        let store = open_store(&path).expect("open store");
        assert!(path.exists());
        assert_eq!(store.revision().expect("revision"), 0);

        let version = store
            .with_connection(|conn| migrations::current_schema_version(conn))
            .expect("schema version");
        assert_eq!(version, migrations::LATEST_SCHEMA_VERSION);
    }
}
