//! UI-facing history state driven by a pure reducer.
//!
//! A front end holds a [`HistoryView`], turns user input and store reloads
//! into [`HistoryAction`]s, and replaces its state with the result of
//! [`reduce`]. The buckets are recollated whenever an input to collation
//! changes, so `buckets` is always consistent with the other fields.

use serde::Serialize;

use crate::calendar::FirstDayOfWeek;
use crate::history::{Collator, DescendingPolicy, Direction};
use crate::model::{Run, WeeklyBucket};

/// Everything a weekly history chart needs to render.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HistoryView {
    pub first_day: FirstDayOfWeek,
    pub direction: Direction,
    pub policy: DescendingPolicy,
    #[serde(skip)]
    pub runs: Vec<Run>,
    pub buckets: Vec<WeeklyBucket>,
}

impl HistoryView {
    /// An empty view with the given collation settings.
    #[must_use]
    pub const fn new(collator: Collator, direction: Direction) -> Self {
        Self {
            first_day: collator.first_day,
            direction,
            policy: collator.descending,
            runs: Vec::new(),
            buckets: Vec::new(),
        }
    }

    #[must_use]
    pub const fn collator(&self) -> Collator {
        Collator::new(self.first_day).with_descending(self.policy)
    }

    /// Sum over every bucket.
    #[must_use]
    pub fn total_distance(&self) -> f64 {
        self.buckets.iter().map(|bucket| bucket.distance).sum()
    }

    fn recollated(mut self) -> Self {
        self.buckets = self.collator().collate(&self.runs, self.direction);
        self
    }
}

/// Inputs to a [`HistoryView`].
#[derive(Debug, Clone, PartialEq)]
pub enum HistoryAction {
    /// A fresh run set arrived from the store.
    RunsLoaded(Vec<Run>),
    SetFirstDay(FirstDayOfWeek),
    SetDirection(Direction),
    ToggleDirection,
    SetPolicy(DescendingPolicy),
}

/// Apply `action` to `state`, returning the next state.
#[must_use]
pub fn reduce(state: HistoryView, action: HistoryAction) -> HistoryView {
    match action {
        HistoryAction::RunsLoaded(runs) => HistoryView { runs, ..state }.recollated(),
        HistoryAction::SetFirstDay(first_day) if first_day != state.first_day => {
            HistoryView { first_day, ..state }.recollated()
        }
        HistoryAction::SetDirection(direction) if direction != state.direction => {
            HistoryView { direction, ..state }.recollated()
        }
        HistoryAction::ToggleDirection => {
            let direction = state.direction.flipped();
            HistoryView { direction, ..state }.recollated()
        }
        HistoryAction::SetPolicy(policy) if policy != state.policy => {
            HistoryView { policy, ..state }.recollated()
        }
        HistoryAction::SetFirstDay(_)
        | HistoryAction::SetDirection(_)
        | HistoryAction::SetPolicy(_) => state,
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::model::{GearId, RunId};
    use chrono::NaiveDate;

    fn ymd(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).expect("valid date")
    }

    fn run(id: i64, m: u32, d: u32, distance: f64) -> Run {
        Run {
            id: RunId(id),
            gear_id: GearId(1),
            date: ymd(m, d).and_hms_opt(12, 0, 0).expect("valid time"),
            distance,
        }
    }

    fn loaded() -> HistoryView {
        reduce(
            HistoryView::default(),
            HistoryAction::RunsLoaded(vec![run(1, 1, 16, 6.0), run(2, 1, 2, 4.0)]),
        )
    }

    fn weeks(view: &HistoryView) -> Vec<NaiveDate> {
        view.buckets.iter().map(|bucket| bucket.week_start).collect()
    }

    #[test]
    fn loading_runs_collates_with_gap_fill() {
        let view = loaded();
        assert_eq!(weeks(&view), vec![ymd(1, 1), ymd(1, 8), ymd(1, 15)]);
        assert_eq!(view.total_distance(), 10.0);
    }

    #[test]
    fn toggling_direction_twice_restores_state() {
        let view = loaded();
        let flipped = reduce(view.clone(), HistoryAction::ToggleDirection);
        assert_eq!(flipped.direction, Direction::Descending);
        assert_eq!(weeks(&flipped), vec![ymd(1, 15), ymd(1, 8), ymd(1, 1)]);

        let back = reduce(flipped, HistoryAction::ToggleDirection);
        assert_eq!(back, view);
    }

    #[test]
    fn policy_only_matters_when_descending() {
        let view = loaded();
        let ascending = reduce(
            view.clone(),
            HistoryAction::SetPolicy(DescendingPolicy::OmitGapFill),
        );
        assert_eq!(ascending.buckets, view.buckets);

        let descending = reduce(ascending, HistoryAction::SetDirection(Direction::Descending));
        assert_eq!(weeks(&descending), vec![ymd(1, 15), ymd(1, 1)]);
    }

    #[test]
    fn first_day_change_rebuckets() {
        let view = reduce(loaded(), HistoryAction::SetFirstDay(FirstDayOfWeek::Sunday));
        assert_eq!(
            weeks(&view),
            vec![ymd(1, 1) - chrono::Days::new(1), ymd(1, 7), ymd(1, 14)]
        );
        assert_eq!(view.total_distance(), 10.0);
    }

    #[test]
    fn unchanged_settings_return_the_same_state() {
        let view = loaded();
        let same = reduce(view.clone(), HistoryAction::SetFirstDay(FirstDayOfWeek::Monday));
        assert_eq!(same, view);
    }
}
