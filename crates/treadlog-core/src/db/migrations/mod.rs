//! Forward-only schema migrations for the run store.
//!
//! The applied version lives in `PRAGMA user_version` and is mirrored into
//! `store_meta.schema_version`. A file stamped by a newer build is refused
//! rather than opened with a schema this build does not know.

use rusqlite::{Connection, Transaction};

use super::schema;

/// Schema version written by the newest step in [`STEPS`].
pub const LATEST_SCHEMA_VERSION: u32 = 2;

/// `(version, DDL)` pairs in application order.
const STEPS: [(u32, &str); 2] = [(1, schema::MIGRATION_V1_SQL), (2, schema::MIGRATION_V2_SQL)];

#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error("store schema v{found} is newer than the supported v{supported}")]
    NewerSchema { found: u32, supported: u32 },

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}

/// Version stamped in the database header; a fresh file reports 0.
///
/// # Errors
///
/// Returns an error if the pragma cannot be read or holds a negative value.
pub fn current_schema_version(conn: &Connection) -> rusqlite::Result<u32> {
    let raw: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    u32::try_from(raw).map_err(|_| rusqlite::Error::IntegralValueOutOfRange(0, raw))
}

/// Bring the store up to [`LATEST_SCHEMA_VERSION`], one transaction per step.
/// Returns the version the store ends at.
///
/// # Errors
///
/// Returns [`MigrationError::NewerSchema`] for a store written by a newer
/// build, or the first failing step's error. Steps before it stay applied.
pub fn migrate(conn: &mut Connection) -> Result<u32, MigrationError> {
    let from = current_schema_version(conn)?;
    if from > LATEST_SCHEMA_VERSION {
        return Err(MigrationError::NewerSchema {
            found: from,
            supported: LATEST_SCHEMA_VERSION,
        });
    }

    let mut at = from;
    for &(version, ddl) in STEPS.iter().filter(|(version, _)| *version > from) {
        let tx = conn.transaction()?;
        apply_step(&tx, version, ddl)?;
        tx.commit()?;
        tracing::info!(from = at, to = version, "migrated run store schema");
        at = version;
    }
    Ok(at)
}

fn apply_step(tx: &Transaction<'_>, version: u32, ddl: &str) -> rusqlite::Result<()> {
    tx.execute_batch(ddl)?;
    tx.pragma_update(None, "user_version", version)?;
    tx.execute(
        "UPDATE store_meta SET schema_version = ?1 WHERE id = 1",
        [version],
    )?;
    Ok(())
}
