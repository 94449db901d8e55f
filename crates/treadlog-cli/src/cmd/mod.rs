pub mod gear;
pub mod history;
pub mod recompute;
pub mod run;

use std::path::PathBuf;

use anyhow::Context as _;
use chrono::{Local, NaiveDate, NaiveDateTime};
use treadlog_core::Maintainer;
use treadlog_core::config::Config;
use treadlog_core::db::{SqliteStore, open_store};
use treadlog_core::error::{ErrorCode, TrackError};
use treadlog_core::maintain::Mutation;

use crate::output::{CliError, OutputMode, render_error, render_warning};

/// Resolved settings shared by every command.
#[derive(Debug)]
pub struct Context {
    pub config: Config,
    pub db_path: PathBuf,
    pub output: OutputMode,
}

impl Context {
    /// Open the run store and wrap it in a maintainer.
    ///
    /// # Errors
    ///
    /// Renders a store-unavailable error and returns it if the database
    /// cannot be opened or migrated.
    pub fn open(&self) -> anyhow::Result<Maintainer<SqliteStore>> {
        match open_store(&self.db_path) {
            Ok(store) => Ok(Maintainer::new(store)),
            Err(err) => {
                render_error(
                    self.output,
                    &CliError::from_code(
                        ErrorCode::StoreUnavailable,
                        format!("cannot open {}: {err:#}", self.db_path.display()),
                    ),
                )?;
                Err(err).with_context(|| format!("open store {}", self.db_path.display()))
            }
        }
    }

    /// Render a maintainer error and hand it back for propagation.
    pub fn fail(&self, err: TrackError) -> anyhow::Error {
        if let Err(render_err) = render_error(self.output, &CliError::from(&err)) {
            return render_err;
        }
        anyhow::Error::new(err)
    }

    /// Surface a stale-total warning, if any, without failing the command.
    ///
    /// # Errors
    ///
    /// Returns an error only if writing the warning fails.
    pub fn warn_if_stale<T>(&self, mutation: &Mutation<T>) -> anyhow::Result<Option<CliError>> {
        let Some(stale) = mutation.warning() else {
            return Ok(None);
        };
        let warning = CliError::from(stale);
        if !self.output.is_json() {
            render_warning(self.output, &warning)?;
        }
        Ok(Some(warning))
    }
}

/// Parse a run timestamp: `YYYY-MM-DD`, `YYYY-MM-DDTHH:MM` or
/// `YYYY-MM-DDTHH:MM:SS` (a space may replace the `T`). A bare date means
/// local midnight.
pub fn parse_run_date(raw: &str) -> Result<NaiveDateTime, String> {
    let raw = raw.trim();
    for format in [
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(at) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(at);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .ok_or_else(|| format!("invalid date '{raw}': expected YYYY-MM-DD[THH:MM[:SS]]"))
}

/// Current local wall-clock time.
#[must_use]
pub fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_dates_are_midnight() {
        let at = parse_run_date("2024-01-03").expect("parse");
        assert_eq!(at.to_string(), "2024-01-03 00:00:00");
    }

    #[test]
    fn times_are_accepted_with_t_or_space() {
        let a = parse_run_date("2024-01-03T06:45").expect("parse");
        let b = parse_run_date("2024-01-03 06:45:00").expect("parse");
        assert_eq!(a, b);
    }

    #[test]
    fn garbage_is_rejected() {
        let err = parse_run_date("yesterday").expect_err("not a date");
        assert!(err.contains("yesterday"));
    }
}
