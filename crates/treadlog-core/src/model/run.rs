use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::{GearId, RunId};
use crate::error::TrackError;

/// A dated distance entry logged against one gear item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub id: RunId,
    pub gear_id: GearId,
    /// Local wall-clock time of the run.
    pub date: NaiveDateTime,
    pub distance: f64,
}

/// A run that has not been persisted yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRun {
    pub gear_id: GearId,
    pub date: NaiveDateTime,
    pub distance: f64,
}

/// In-place edit of a logged run.
///
/// The owning gear is not part of the edit: a run never moves between gear.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunEdit {
    pub date: Option<NaiveDateTime>,
    pub distance: Option<f64>,
}

impl RunEdit {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.date.is_none() && self.distance.is_none()
    }

    /// Apply the edit on top of `run`.
    #[must_use]
    pub fn apply(&self, run: &Run) -> Run {
        Run {
            id: run.id,
            gear_id: run.gear_id,
            date: self.date.unwrap_or(run.date),
            distance: self.distance.unwrap_or(run.distance),
        }
    }
}

/// Reject zero, negative and non-finite distances.
///
/// # Errors
///
/// Returns [`TrackError::InvalidDistance`] when `distance` is not a positive
/// finite number.
pub fn validate_distance(distance: f64) -> Result<f64, TrackError> {
    if distance.is_finite() && distance > 0.0 {
        Ok(distance)
    } else {
        Err(TrackError::InvalidDistance { distance })
    }
}

/// Total distance logged in one calendar week.
///
/// Buckets are produced fresh by [`crate::history::collate`] and never stored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeeklyBucket {
    /// First day of the week; the bucket starts at local midnight of this day.
    pub week_start: NaiveDate,
    pub distance: f64,
}

impl WeeklyBucket {
    #[must_use]
    pub const fn empty(week_start: NaiveDate) -> Self {
        Self {
            week_start,
            distance: 0.0,
        }
    }
}
