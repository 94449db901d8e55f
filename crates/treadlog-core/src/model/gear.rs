use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::GearId;

/// A trackable item that accumulates distance over its lifetime.
///
/// `total_distance` is derived: it always equals `start_distance` plus the
/// distance of every run logged against this gear. Only the maintainer's
/// recomputation writes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gear {
    pub id: GearId,
    pub name: String,
    /// Distance already on the gear before it was tracked.
    pub start_distance: f64,
    pub total_distance: f64,
    /// Expected lifetime distance; `0.0` means no limit.
    pub max_distance: f64,
    pub ordering_value: f64,
    pub retired: bool,
    pub created_at: NaiveDateTime,
    pub expires_on: Option<NaiveDate>,
}

impl Gear {
    /// Fraction of the expected lifetime already used.
    #[must_use]
    pub fn wear_fraction(&self) -> Option<f64> {
        (self.max_distance > 0.0).then(|| self.total_distance / self.max_distance)
    }

    /// Distance left before reaching `max_distance`, never negative.
    #[must_use]
    pub fn remaining_distance(&self) -> Option<f64> {
        (self.max_distance > 0.0).then(|| (self.max_distance - self.total_distance).max(0.0))
    }

    #[must_use]
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.expires_on.is_some_and(|expires| expires <= today)
    }
}

/// Gear that has not been persisted yet.
///
/// The maintainer allocates its ordering value; the store starts its total at
/// `start_distance`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewGear {
    pub name: String,
    pub start_distance: f64,
    pub max_distance: f64,
    pub created_at: NaiveDateTime,
    pub expires_on: Option<NaiveDate>,
}

/// Caller-editable gear fields. `total_distance` is intentionally absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GearPatch {
    pub name: Option<String>,
    pub start_distance: Option<f64>,
    pub max_distance: Option<f64>,
    pub ordering_value: Option<f64>,
    pub retired: Option<bool>,
    /// `Some(None)` clears the expiry date.
    pub expires_on: Option<Option<NaiveDate>>,
}

impl GearPatch {
    /// Apply the patch on top of `gear`, leaving the total untouched.
    #[must_use]
    pub fn apply(&self, gear: &Gear) -> Gear {
        Gear {
            id: gear.id,
            name: self.name.clone().unwrap_or_else(|| gear.name.clone()),
            start_distance: self.start_distance.unwrap_or(gear.start_distance),
            total_distance: gear.total_distance,
            max_distance: self.max_distance.unwrap_or(gear.max_distance),
            ordering_value: self.ordering_value.unwrap_or(gear.ordering_value),
            retired: self.retired.unwrap_or(gear.retired),
            created_at: gear.created_at,
            expires_on: self.expires_on.unwrap_or(gear.expires_on),
        }
    }
}
