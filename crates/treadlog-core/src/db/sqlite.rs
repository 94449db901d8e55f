//! [`RunStore`] implementation over a single `SQLite` connection.
//!
//! Every write runs in its own transaction together with the
//! `store_meta.revision` bump, so a reader that sees a new revision also sees
//! the write that produced it.

use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rusqlite::{Connection, OptionalExtension, Row, Transaction, params, types::Type};

use crate::error::{RecordId, StoreError};
use crate::model::{Gear, GearId, NewGear, NewRun, Run, RunId};
use crate::store::{RunStore, StoreResult};

const RUN_COLUMNS: &str = "run_id, gear_id, run_at_us, distance";
const GEAR_COLUMNS: &str = "gear_id, name, start_distance, total_distance, max_distance, \
                            ordering_value, is_retired, created_at_us, expires_on";
const EXPIRY_FORMAT: &str = "%Y-%m-%d";

/// A `SQLite`-backed run store. Open one with [`super::open_store`].
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore").finish_non_exhaustive()
    }
}

impl SqliteStore {
    pub(crate) fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// Run a read-only closure against the underlying connection.
    ///
    /// # Errors
    ///
    /// Returns the closure's error, or [`StoreError::Unavailable`] if the
    /// connection lock is poisoned.
    pub fn with_connection<T>(
        &self,
        f: impl FnOnce(&Connection) -> rusqlite::Result<T>,
    ) -> StoreResult<T> {
        let conn = self.lock()?;
        Ok(f(&conn)?)
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Unavailable("sqlite connection lock poisoned".into()))
    }

    fn write<T>(&self, f: impl FnOnce(&Transaction<'_>) -> StoreResult<T>) -> StoreResult<T> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let value = f(&tx)?;
        tx.execute(
            "UPDATE store_meta SET revision = revision + 1 WHERE id = 1",
            [],
        )?;
        tx.commit()?;
        Ok(value)
    }
}

impl RunStore for SqliteStore {
    fn create_run(&self, run: &NewRun) -> StoreResult<Run> {
        self.write(|tx| {
            if !gear_exists(tx, run.gear_id)? {
                return Err(StoreError::NotFound(RecordId::Gear(run.gear_id)));
            }
            tx.execute(
                "INSERT INTO runs (gear_id, run_at_us, distance) VALUES (?1, ?2, ?3)",
                params![run.gear_id.0, to_micros(run.date), run.distance],
            )?;
            let id = RunId(tx.last_insert_rowid());
            tracing::debug!(run_id = %id, gear_id = %run.gear_id, "inserted run");
            Ok(Run {
                id,
                gear_id: run.gear_id,
                date: run.date,
                distance: run.distance,
            })
        })
    }

    fn update_run(&self, run: &Run) -> StoreResult<()> {
        self.write(|tx| {
            let changed = tx.execute(
                "UPDATE runs SET run_at_us = ?1, distance = ?2 WHERE run_id = ?3",
                params![to_micros(run.date), run.distance, run.id.0],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound(RecordId::Run(run.id)));
            }
            Ok(())
        })
    }

    fn delete_run(&self, id: RunId) -> StoreResult<Run> {
        self.write(|tx| {
            let run = tx
                .query_row(
                    &format!("SELECT {RUN_COLUMNS} FROM runs WHERE run_id = ?1"),
                    [id.0],
                    row_to_run,
                )
                .optional()?
                .ok_or(StoreError::NotFound(RecordId::Run(id)))?;
            tx.execute("DELETE FROM runs WHERE run_id = ?1", [id.0])?;
            Ok(run)
        })
    }

    fn delete_runs_for_gear(&self, gear_id: GearId) -> StoreResult<usize> {
        self.write(|tx| Ok(tx.execute("DELETE FROM runs WHERE gear_id = ?1", [gear_id.0])?))
    }

    fn get_run(&self, id: RunId) -> StoreResult<Option<Run>> {
        self.with_connection(|conn| {
            conn.query_row(
                &format!("SELECT {RUN_COLUMNS} FROM runs WHERE run_id = ?1"),
                [id.0],
                row_to_run,
            )
            .optional()
        })
    }

    fn runs_for_gear(&self, gear_id: GearId) -> StoreResult<Vec<Run>> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {RUN_COLUMNS} FROM runs WHERE gear_id = ?1 \
                 ORDER BY run_at_us DESC, run_id DESC"
            ))?;
            let rows = stmt.query_map([gear_id.0], row_to_run)?;
            rows.collect()
        })
    }

    fn all_runs(&self) -> StoreResult<Vec<Run>> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {RUN_COLUMNS} FROM runs ORDER BY run_at_us DESC, run_id DESC"
            ))?;
            let rows = stmt.query_map([], row_to_run)?;
            rows.collect()
        })
    }

    fn sum_distance(&self, gear_id: GearId) -> StoreResult<f64> {
        self.with_connection(|conn| {
            conn.query_row(
                "SELECT COALESCE(SUM(distance), 0.0) FROM runs WHERE gear_id = ?1",
                [gear_id.0],
                |row| row.get(0),
            )
        })
    }

    fn create_gear(&self, gear: &NewGear, ordering_value: f64) -> StoreResult<Gear> {
        self.write(|tx| {
            tx.execute(
                "INSERT INTO gear (name, start_distance, total_distance, max_distance, \
                 ordering_value, is_retired, created_at_us, expires_on) \
                 VALUES (?1, ?2, ?2, ?3, ?4, 0, ?5, ?6)",
                params![
                    gear.name,
                    gear.start_distance,
                    gear.max_distance,
                    ordering_value,
                    to_micros(gear.created_at),
                    gear.expires_on.map(format_expiry),
                ],
            )?;
            Ok(Gear {
                id: GearId(tx.last_insert_rowid()),
                name: gear.name.clone(),
                start_distance: gear.start_distance,
                total_distance: gear.start_distance,
                max_distance: gear.max_distance,
                ordering_value,
                retired: false,
                created_at: gear.created_at,
                expires_on: gear.expires_on,
            })
        })
    }

    fn update_gear(&self, gear: &Gear) -> StoreResult<()> {
        self.write(|tx| {
            let changed = tx.execute(
                "UPDATE gear SET name = ?1, start_distance = ?2, total_distance = ?3, \
                 max_distance = ?4, ordering_value = ?5, is_retired = ?6, expires_on = ?7 \
                 WHERE gear_id = ?8",
                params![
                    gear.name,
                    gear.start_distance,
                    gear.total_distance,
                    gear.max_distance,
                    gear.ordering_value,
                    i64::from(gear.retired),
                    gear.expires_on.map(format_expiry),
                    gear.id.0,
                ],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound(RecordId::Gear(gear.id)));
            }
            Ok(())
        })
    }

    fn get_gear(&self, id: GearId) -> StoreResult<Option<Gear>> {
        self.with_connection(|conn| {
            conn.query_row(
                &format!("SELECT {GEAR_COLUMNS} FROM gear WHERE gear_id = ?1"),
                [id.0],
                row_to_gear,
            )
            .optional()
        })
    }

    fn list_gear(&self) -> StoreResult<Vec<Gear>> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {GEAR_COLUMNS} FROM gear ORDER BY ordering_value ASC, gear_id ASC"
            ))?;
            let rows = stmt.query_map([], row_to_gear)?;
            rows.collect()
        })
    }

    fn delete_gear(&self, id: GearId) -> StoreResult<Gear> {
        self.write(|tx| {
            let gear = tx
                .query_row(
                    &format!("SELECT {GEAR_COLUMNS} FROM gear WHERE gear_id = ?1"),
                    [id.0],
                    row_to_gear,
                )
                .optional()?
                .ok_or(StoreError::NotFound(RecordId::Gear(id)))?;
            tx.execute("DELETE FROM gear WHERE gear_id = ?1", [id.0])?;
            Ok(gear)
        })
    }

    fn max_ordering_value(&self) -> StoreResult<Option<f64>> {
        self.with_connection(|conn| {
            conn.query_row("SELECT MAX(ordering_value) FROM gear", [], |row| row.get(0))
        })
    }

    fn revision(&self) -> StoreResult<u64> {
        let revision: i64 = self.with_connection(|conn| {
            conn.query_row("SELECT revision FROM store_meta WHERE id = 1", [], |row| {
                row.get(0)
            })
        })?;
        u64::try_from(revision).map_err(|_| {
            StoreError::Sqlite(rusqlite::Error::IntegralValueOutOfRange(0, revision))
        })
    }
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

fn gear_exists(conn: &Connection, gear_id: GearId) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM gear WHERE gear_id = ?1)",
        [gear_id.0],
        |row| row.get(0),
    )
}

fn to_micros(at: NaiveDateTime) -> i64 {
    at.and_utc().timestamp_micros()
}

fn from_micros(column: usize, micros: i64) -> rusqlite::Result<NaiveDateTime> {
    DateTime::from_timestamp_micros(micros)
        .map(|at| at.naive_utc())
        .ok_or(rusqlite::Error::IntegralValueOutOfRange(column, micros))
}

fn format_expiry(date: NaiveDate) -> String {
    date.format(EXPIRY_FORMAT).to_string()
}

fn parse_expiry(column: usize, raw: Option<String>) -> rusqlite::Result<Option<NaiveDate>> {
    raw.map(|raw| {
        NaiveDate::parse_from_str(&raw, EXPIRY_FORMAT).map_err(|error| {
            rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(error))
        })
    })
    .transpose()
}

fn row_to_run(row: &Row<'_>) -> rusqlite::Result<Run> {
    Ok(Run {
        id: RunId(row.get(0)?),
        gear_id: GearId(row.get(1)?),
        date: from_micros(2, row.get(2)?)?,
        distance: row.get(3)?,
    })
}

fn row_to_gear(row: &Row<'_>) -> rusqlite::Result<Gear> {
    Ok(Gear {
        id: GearId(row.get(0)?),
        name: row.get(1)?,
        start_distance: row.get(2)?,
        total_distance: row.get(3)?,
        max_distance: row.get(4)?,
        ordering_value: row.get(5)?,
        retired: row.get::<_, i64>(6)? != 0,
        created_at: from_micros(7, row.get(7)?)?,
        expires_on: parse_expiry(8, row.get(8)?)?,
    })
}
