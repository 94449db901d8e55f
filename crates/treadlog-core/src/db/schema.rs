//! Canonical `SQLite` schema for the run store.
//!
//! - `gear` holds one row per trackable item, including the cached total
//! - `runs` holds the authoritative distance entries, cascading on gear delete
//! - `store_meta` tracks the schema version and the write revision counter

/// Migration v1: core tables plus store metadata.
pub const MIGRATION_V1_SQL: &str = r"
CREATE TABLE IF NOT EXISTS gear (
    gear_id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL CHECK (length(trim(name)) > 0),
    start_distance REAL NOT NULL DEFAULT 0 CHECK (start_distance >= 0),
    total_distance REAL NOT NULL DEFAULT 0,
    max_distance REAL NOT NULL DEFAULT 0 CHECK (max_distance >= 0),
    ordering_value REAL NOT NULL,
    is_retired INTEGER NOT NULL DEFAULT 0 CHECK (is_retired IN (0, 1)),
    created_at_us INTEGER NOT NULL,
    expires_on TEXT
);

CREATE TABLE IF NOT EXISTS runs (
    run_id INTEGER PRIMARY KEY AUTOINCREMENT,
    gear_id INTEGER NOT NULL REFERENCES gear(gear_id) ON DELETE CASCADE,
    run_at_us INTEGER NOT NULL,
    distance REAL NOT NULL CHECK (distance > 0)
);

CREATE TABLE IF NOT EXISTS store_meta (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    schema_version INTEGER NOT NULL,
    revision INTEGER NOT NULL DEFAULT 0
);

INSERT OR IGNORE INTO store_meta (id, schema_version, revision) VALUES (1, 1, 0);
";

/// Migration v2: read-path indexes for per-gear history and ordering.
pub const MIGRATION_V2_SQL: &str = r"
CREATE INDEX IF NOT EXISTS idx_runs_gear_run_at
    ON runs(gear_id, run_at_us DESC);

CREATE INDEX IF NOT EXISTS idx_runs_run_at
    ON runs(run_at_us DESC);

CREATE INDEX IF NOT EXISTS idx_gear_ordering
    ON gear(ordering_value, gear_id);

UPDATE store_meta
SET schema_version = 2
WHERE id = 1;
";

/// Indexes expected by history and listing query paths.
pub const REQUIRED_INDEXES: &[&str] = &[
    "idx_runs_gear_run_at",
    "idx_runs_run_at",
    "idx_gear_ordering",
];
