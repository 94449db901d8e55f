//! Weekly history collation.
//!
//! [`collate`] turns an unordered set of runs into one [`WeeklyBucket`] per
//! calendar week, inserting zero-distance buckets for weeks without runs so
//! that a trend chart has no holes.
//!
//! # Descending order
//!
//! Gap filling compares the current bucket's week (as the start) with the
//! next run's week (as the end). Walking runs newest-first inverts that
//! interval, so the plain loop emits no zero weeks. [`DescendingPolicy`]
//! chooses between reversing an ascending collation (zero weeks kept) and the
//! plain newest-first loop (zero weeks omitted).

use anyhow::bail;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::calendar::{FirstDayOfWeek, week_start_of, weeks_between};
use crate::model::{Run, WeeklyBucket};

/// Chronological order of the produced buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Oldest week first.
    #[default]
    Ascending,
    /// Newest week first.
    Descending,
}

impl Direction {
    #[must_use]
    pub const fn from_ascending(ascending: bool) -> Self {
        if ascending {
            Self::Ascending
        } else {
            Self::Descending
        }
    }

    #[must_use]
    pub const fn flipped(self) -> Self {
        match self {
            Self::Ascending => Self::Descending,
            Self::Descending => Self::Ascending,
        }
    }
}

/// How a descending collation treats weeks without runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DescendingPolicy {
    /// Collate ascending, then reverse. Zero-distance weeks are kept.
    #[default]
    Reverse,
    /// Walk runs newest-first. Zero-distance weeks are omitted.
    OmitGapFill,
}

impl fmt::Display for DescendingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reverse => f.write_str("reverse"),
            Self::OmitGapFill => f.write_str("omit-gap-fill"),
        }
    }
}

impl FromStr for DescendingPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reverse" => Ok(Self::Reverse),
            "omit-gap-fill" | "omit_gap_fill" | "legacy" => Ok(Self::OmitGapFill),
            other => bail!("unknown descending policy '{other}': expected reverse or omit-gap-fill"),
        }
    }
}

/// Collation settings: where weeks begin and how descending output is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Collator {
    pub first_day: FirstDayOfWeek,
    pub descending: DescendingPolicy,
}

impl Collator {
    #[must_use]
    pub const fn new(first_day: FirstDayOfWeek) -> Self {
        Self {
            first_day,
            descending: DescendingPolicy::Reverse,
        }
    }

    #[must_use]
    pub const fn with_descending(mut self, policy: DescendingPolicy) -> Self {
        self.descending = policy;
        self
    }

    /// Bucket `runs` by week in the requested `direction`.
    #[must_use]
    pub fn collate<'a>(
        &self,
        runs: impl IntoIterator<Item = &'a Run>,
        direction: Direction,
    ) -> Vec<WeeklyBucket> {
        let mut sorted: Vec<&Run> = runs.into_iter().collect();
        sorted.sort_by(|a, b| a.date.cmp(&b.date));

        match (direction, self.descending) {
            (Direction::Ascending, _) => self.walk(&sorted),
            (Direction::Descending, DescendingPolicy::Reverse) => {
                let mut buckets = self.walk(&sorted);
                buckets.reverse();
                buckets
            }
            (Direction::Descending, DescendingPolicy::OmitGapFill) => {
                sorted.reverse();
                self.walk(&sorted)
            }
        }
    }

    fn walk(&self, sorted: &[&Run]) -> Vec<WeeklyBucket> {
        let mut buckets = Vec::new();
        let mut current: Option<WeeklyBucket> = None;

        for run in sorted {
            let week = week_start_of(run.date, self.first_day);
            current = Some(match current {
                None => WeeklyBucket {
                    week_start: week,
                    distance: run.distance,
                },
                Some(open) if open.week_start == week => WeeklyBucket {
                    week_start: week,
                    distance: open.distance + run.distance,
                },
                Some(open) => {
                    buckets.push(open);
                    buckets.extend(
                        weeks_between(open.week_start, week, self.first_day)
                            .into_iter()
                            .map(WeeklyBucket::empty),
                    );
                    WeeklyBucket {
                        week_start: week,
                        distance: run.distance,
                    }
                }
            });
        }

        buckets.extend(current);
        buckets
    }
}

/// Collate with the default descending policy ([`DescendingPolicy::Reverse`]).
#[must_use]
pub fn collate<'a>(
    runs: impl IntoIterator<Item = &'a Run>,
    direction: Direction,
    first_day: FirstDayOfWeek,
) -> Vec<WeeklyBucket> {
    Collator::new(first_day).collate(runs, direction)
}
