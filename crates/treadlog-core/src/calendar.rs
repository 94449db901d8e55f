//! Calendar week bucketing.
//!
//! A week is identified by the date of its first day. Dates are local
//! calendar days, so a [`NaiveDate`] stands for local midnight of that day.

use anyhow::bail;
use chrono::{Datelike, Days, NaiveDate, NaiveDateTime, Weekday};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

const ONE_WEEK: Days = Days::new(7);

/// User preference for the weekday that opens a week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FirstDayOfWeek {
    Sunday,
    #[default]
    Monday,
}

impl FirstDayOfWeek {
    #[must_use]
    pub const fn weekday(self) -> Weekday {
        match self {
            Self::Sunday => Weekday::Sun,
            Self::Monday => Weekday::Mon,
        }
    }

    const fn as_str(self) -> &'static str {
        match self {
            Self::Sunday => "sunday",
            Self::Monday => "monday",
        }
    }
}

impl fmt::Display for FirstDayOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FirstDayOfWeek {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sunday" | "sun" => Ok(Self::Sunday),
            "monday" | "mon" => Ok(Self::Monday),
            other => bail!("unknown first day of week '{other}': expected monday or sunday"),
        }
    }
}

/// Latest date on or before `date` that falls on `first_day`.
///
/// Idempotent: `week_start(week_start(d, f), f) == week_start(d, f)`. Dates
/// within a week of [`NaiveDate::MIN`] clamp to it.
#[must_use]
pub fn week_start(date: NaiveDate, first_day: FirstDayOfWeek) -> NaiveDate {
    let offset = (7 + date.weekday().num_days_from_monday()
        - first_day.weekday().num_days_from_monday())
        % 7;
    date.checked_sub_days(Days::new(u64::from(offset)))
        .unwrap_or(NaiveDate::MIN)
}

/// Week start of a timestamp, truncating the time of day.
#[must_use]
pub fn week_start_of(at: NaiveDateTime, first_day: FirstDayOfWeek) -> NaiveDate {
    week_start(at.date(), first_day)
}

/// Week starts strictly between the weeks of `start` and `end`, ascending.
///
/// Empty when `end` is in the same week as `start` or earlier.
#[must_use]
pub fn weeks_between(start: NaiveDate, end: NaiveDate, first_day: FirstDayOfWeek) -> Vec<NaiveDate> {
    let last = week_start(end, first_day);
    let mut weeks = Vec::new();
    let mut candidate = week_start(start, first_day).checked_add_days(ONE_WEEK);
    while let Some(week) = candidate.filter(|week| *week < last) {
        weeks.push(week);
        candidate = week.checked_add_days(ONE_WEEK);
    }
    weeks
}
