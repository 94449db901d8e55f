use std::fmt;

use crate::model::{GearId, RunId};

/// Machine-readable error codes for scripting against the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigParseError,
    InvalidDistance,
    GearNotFound,
    RunNotFound,
    InvalidOrdering,
    NothingToChange,
    StoreUnavailable,
    CorruptStore,
    StaleTotal,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ConfigParseError => "E1001",
            Self::InvalidDistance => "E2001",
            Self::GearNotFound => "E2002",
            Self::RunNotFound => "E2003",
            Self::InvalidOrdering => "E2004",
            Self::NothingToChange => "E2005",
            Self::StoreUnavailable => "E3001",
            Self::CorruptStore => "E3002",
            Self::StaleTotal => "E3003",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ConfigParseError => "Config file parse error",
            Self::InvalidDistance => "Distance out of range",
            Self::GearNotFound => "Gear not found",
            Self::RunNotFound => "Run not found",
            Self::InvalidOrdering => "Ordering value out of range",
            Self::NothingToChange => "Nothing to change",
            Self::StoreUnavailable => "Run store unavailable",
            Self::CorruptStore => "Corrupt SQLite store",
            Self::StaleTotal => "Gear total is stale",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to users.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ConfigParseError => Some("Fix syntax in treadlog/config.toml and retry."),
            Self::InvalidDistance => {
                Some("Runs need a distance above zero; gear distances cannot be negative.")
            }
            Self::GearNotFound => Some("Run `tread gear list --all` to see known gear."),
            Self::RunNotFound => Some("Run `tread run list --gear <ID>` to see logged runs."),
            Self::InvalidOrdering => Some("Pass a finite number to `--order`."),
            Self::NothingToChange => Some("Pass at least one field to change, e.g. `--distance`."),
            Self::StoreUnavailable => Some("Check the database path and write permissions."),
            Self::CorruptStore => Some("Restore the database from a backup."),
            Self::StaleTotal => Some("Run `tread recompute <ID>` to repair the total."),
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Which kind of record a lookup missed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordId {
    Gear(GearId),
    Run(RunId),
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gear(id) => write!(f, "gear {id}"),
            Self::Run(id) => write!(f, "run {id}"),
        }
    }
}

/// Failures reported by a [`crate::store::RunStore`] implementation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{0} does not exist")]
    NotFound(RecordId),

    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("i/o: {0}")]
    Io(#[from] std::io::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound(RecordId::Gear(_)) => ErrorCode::GearNotFound,
            Self::NotFound(RecordId::Run(_)) => ErrorCode::RunNotFound,
            Self::Sqlite(_) => ErrorCode::CorruptStore,
            Self::Io(_) | Self::Unavailable(_) => ErrorCode::StoreUnavailable,
        }
    }
}

/// Errors returned by the maintainer's mutation operations.
#[derive(Debug, thiserror::Error)]
pub enum TrackError {
    /// The distance was out of range or not a number. Nothing was written.
    #[error("invalid distance {distance}")]
    InvalidDistance { distance: f64 },

    /// The ordering value was infinite or NaN. Nothing was written.
    #[error("invalid ordering value {value}")]
    InvalidOrdering { value: f64 },

    #[error("{0} not found")]
    NotFound(RecordId),

    /// The store failed while applying the write half of a mutation.
    #[error("store failure: {0}")]
    Store(#[source] StoreError),
}

impl From<StoreError> for TrackError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => Self::NotFound(id),
            other => Self::Store(other),
        }
    }
}

impl TrackError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidDistance { .. } => ErrorCode::InvalidDistance,
            Self::InvalidOrdering { .. } => ErrorCode::InvalidOrdering,
            Self::NotFound(RecordId::Gear(_)) => ErrorCode::GearNotFound,
            Self::NotFound(RecordId::Run(_)) => ErrorCode::RunNotFound,
            Self::Store(err) => err.code(),
        }
    }

    /// Remediation text for the CLI, falling back to the code's summary.
    #[must_use]
    pub fn suggestion(&self) -> String {
        let code = self.code();
        code.hint().unwrap_or_else(|| code.message()).to_string()
    }
}
