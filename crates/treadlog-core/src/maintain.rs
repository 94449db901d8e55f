//! Keeps each gear item's cached total equal to the sum of its runs.
//!
//! Every mutation is a write followed by a recomputation of the affected gear
//! total. Recomputation always re-sums the runs from the store; it never adds
//! a delta to the cached value. That makes it idempotent, so running it twice
//! or late is harmless, and the last recompute to finish always sees every
//! committed write.
//!
//! # Failure semantics
//!
//! - a failed write aborts the mutation and no recompute is attempted
//! - a failed recompute after a successful write leaves the cached total stale;
//!   the mutation still returns `Ok`, carrying [`TotalRefresh::Stale`]
//! - [`Maintainer::recompute_total`] repairs a stale total on demand
//!
//! # Concurrency
//!
//! A write and its recompute run under a per-gear lock, so the recompute is
//! ordered after the write it belongs to. Different gear items never share a
//! lock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{RecordId, StoreError, TrackError};
use crate::model::{Gear, GearId, GearPatch, NewGear, NewRun, Run, RunEdit, RunId, validate_distance};
use crate::ordering::next_ordering_value;
use crate::store::{RunStore, StoreResult};

/// Outcome of the recompute half of a mutation.
#[derive(Debug)]
pub enum TotalRefresh {
    /// The total was re-summed and persisted.
    Updated(f64),
    /// The gear no longer exists, so there was nothing to update.
    GearMissing,
    /// The write succeeded but the total could not be refreshed.
    Stale(StaleTotal),
}

/// A cached total left out of date by a failed recompute.
#[derive(Debug)]
pub struct StaleTotal {
    pub gear_id: GearId,
    pub error: StoreError,
}

/// A successful write plus the state of the affected gear total.
#[derive(Debug)]
pub struct Mutation<T> {
    pub value: T,
    pub total: TotalRefresh,
}

impl<T> Mutation<T> {
    /// The recoverable warning, if the total could not be refreshed.
    #[must_use]
    pub const fn warning(&self) -> Option<&StaleTotal> {
        match &self.total {
            TotalRefresh::Stale(stale) => Some(stale),
            TotalRefresh::Updated(_) | TotalRefresh::GearMissing => None,
        }
    }

    /// The refreshed total, when the recompute succeeded.
    #[must_use]
    pub const fn total_distance(&self) -> Option<f64> {
        match self.total {
            TotalRefresh::Updated(total) => Some(total),
            TotalRefresh::GearMissing | TotalRefresh::Stale(_) => None,
        }
    }
}

/// A total changed by [`Maintainer::recompute_all`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Correction {
    pub gear_id: GearId,
    pub before: f64,
    pub after: f64,
}

/// Result of a full repair sweep.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RecomputeReport {
    /// Number of gear items re-summed.
    pub checked: usize,
    pub corrections: Vec<Correction>,
}

#[derive(Debug, Default)]
struct GearLocks {
    locks: Mutex<HashMap<GearId, Arc<Mutex<()>>>>,
}

impl GearLocks {
    fn for_gear(&self, gear_id: GearId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(gear_id).or_default())
    }

    fn forget(&self, gear_id: GearId) {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&gear_id);
    }
}

/// Applies run and gear mutations to a store and keeps gear totals in sync.
#[derive(Debug)]
pub struct Maintainer<S> {
    store: S,
    locks: GearLocks,
    creation: Mutex<()>,
}

impl<S: RunStore> Maintainer<S> {
    #[must_use]
    pub fn new(store: S) -> Self {
        Self {
            store,
            locks: GearLocks::default(),
            creation: Mutex::new(()),
        }
    }

    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    #[must_use]
    pub fn into_store(self) -> S {
        self.store
    }

    // -----------------------------------------------------------------------
    // Runs
    // -----------------------------------------------------------------------

    /// Validate and persist a new run, then refresh its gear total.
    ///
    /// # Errors
    ///
    /// - [`TrackError::InvalidDistance`] before any store access
    /// - [`TrackError::NotFound`] if the gear does not exist
    /// - [`TrackError::Store`] if the run could not be written
    pub fn insert_run(&self, run: &NewRun) -> Result<Mutation<Run>, TrackError> {
        validate_distance(run.distance)?;

        let lock = self.locks.for_gear(run.gear_id);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let stored = self.store.create_run(run)?;
        debug!(run_id = %stored.id, gear_id = %stored.gear_id, distance = stored.distance, "logged run");
        let total = self.refresh(stored.gear_id);
        Ok(Mutation {
            value: stored,
            total,
        })
    }

    /// Change the date and/or distance of a run, then refresh its gear total.
    ///
    /// # Errors
    ///
    /// - [`TrackError::InvalidDistance`] if the new distance is not positive
    /// - [`TrackError::NotFound`] if the run does not exist
    /// - [`TrackError::Store`] if the run could not be written
    pub fn update_run(&self, id: RunId, edit: &RunEdit) -> Result<Mutation<Run>, TrackError> {
        if let Some(distance) = edit.distance {
            validate_distance(distance)?;
        }

        // A run never changes gear, so the first read only picks the lock.
        let gear_id = self.require_run(id)?.gear_id;
        let lock = self.locks.for_gear(gear_id);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let updated = edit.apply(&self.require_run(id)?);
        self.store.update_run(&updated)?;
        debug!(run_id = %id, gear_id = %updated.gear_id, "edited run");
        let total = self.refresh(updated.gear_id);
        Ok(Mutation {
            value: updated,
            total,
        })
    }

    /// Remove a run, then refresh its gear total.
    ///
    /// # Errors
    ///
    /// - [`TrackError::NotFound`] if the run does not exist
    /// - [`TrackError::Store`] if the run could not be removed
    pub fn delete_run(&self, id: RunId) -> Result<Mutation<Run>, TrackError> {
        let existing = self.require_run(id)?;
        let lock = self.locks.for_gear(existing.gear_id);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let removed = self.store.delete_run(id)?;
        debug!(run_id = %id, gear_id = %removed.gear_id, "deleted run");
        let total = self.refresh(removed.gear_id);
        Ok(Mutation {
            value: removed,
            total,
        })
    }

    /// Remove every run of a gear item. Afterwards its total equals its start
    /// distance. Returns the number of runs removed.
    ///
    /// # Errors
    ///
    /// - [`TrackError::NotFound`] if the gear does not exist
    /// - [`TrackError::Store`] if the runs could not be removed
    pub fn delete_all_runs(&self, gear_id: GearId) -> Result<Mutation<usize>, TrackError> {
        let lock = self.locks.for_gear(gear_id);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.require_gear(gear_id)?;

        let removed = self.store.delete_runs_for_gear(gear_id)?;
        debug!(gear_id = %gear_id, removed, "cleared runs");
        let total = self.refresh(gear_id);
        Ok(Mutation {
            value: removed,
            total,
        })
    }

    // -----------------------------------------------------------------------
    // Totals
    // -----------------------------------------------------------------------

    /// Re-sum a gear item's runs and persist `start_distance + sum`.
    ///
    /// Returns `Ok(None)` when the gear does not exist. Safe to call any
    /// number of times; this is the repair entry point for stale totals.
    ///
    /// # Errors
    ///
    /// Returns [`TrackError::Store`] if reading the runs or writing the gear
    /// fails.
    pub fn recompute_total(&self, gear_id: GearId) -> Result<Option<Gear>, TrackError> {
        let lock = self.locks.for_gear(gear_id);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(self.recompute_locked(gear_id)?)
    }

    /// Recompute every gear total, reporting the ones that were wrong.
    ///
    /// # Errors
    ///
    /// Returns the first store failure; totals fixed before it stay fixed.
    pub fn recompute_all(&self) -> Result<RecomputeReport, TrackError> {
        let mut report = RecomputeReport::default();

        for listed in self.store.list_gear()? {
            let lock = self.locks.for_gear(listed.id);
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            let before = self
                .store
                .get_gear(listed.id)?
                .map_or(listed.total_distance, |gear| gear.total_distance);

            let Some(gear) = self.recompute_locked(listed.id)? else {
                continue;
            };
            report.checked += 1;
            if gear.total_distance.to_bits() != before.to_bits() {
                warn!(gear_id = %gear.id, before, after = gear.total_distance, "corrected stale gear total");
                report.corrections.push(Correction {
                    gear_id: gear.id,
                    before,
                    after: gear.total_distance,
                });
            }
        }

        info!(
            checked = report.checked,
            corrected = report.corrections.len(),
            "recomputed gear totals"
        );
        Ok(report)
    }

    fn recompute_locked(&self, gear_id: GearId) -> StoreResult<Option<Gear>> {
        let Some(mut gear) = self.store.get_gear(gear_id)? else {
            return Ok(None);
        };
        let runs = self.store.sum_distance(gear_id)?;
        gear.total_distance = gear.start_distance + runs;

        match self.store.update_gear(&gear) {
            Ok(()) => Ok(Some(gear)),
            Err(StoreError::NotFound(_)) => Ok(None),
            Err(error) => Err(error),
        }
    }

    fn refresh(&self, gear_id: GearId) -> TotalRefresh {
        match self.recompute_locked(gear_id) {
            Ok(Some(gear)) => TotalRefresh::Updated(gear.total_distance),
            Ok(None) => TotalRefresh::GearMissing,
            Err(error) => {
                warn!(gear_id = %gear_id, error = %error, "gear total left stale after write");
                TotalRefresh::Stale(StaleTotal { gear_id, error })
            }
        }
    }

    // -----------------------------------------------------------------------
    // Gear
    // -----------------------------------------------------------------------

    /// Create gear at the next ordering value.
    ///
    /// # Errors
    ///
    /// - [`TrackError::InvalidDistance`] if the start or max distance is
    ///   negative or not finite
    /// - [`TrackError::Store`] if the gear could not be written
    pub fn create_gear(&self, gear: &NewGear) -> Result<Gear, TrackError> {
        validate_non_negative(gear.start_distance)?;
        validate_non_negative(gear.max_distance)?;

        let _guard = self.creation.lock().unwrap_or_else(PoisonError::into_inner);
        let ordering_value = next_ordering_value(&self.store)?;
        let created = self.store.create_gear(gear, ordering_value)?;
        debug!(gear_id = %created.id, ordering_value, "created gear");
        Ok(created)
    }

    /// Apply a patch to a gear item, then refresh its total.
    ///
    /// # Errors
    ///
    /// - [`TrackError::InvalidDistance`] if a patched distance is negative
    /// - [`TrackError::InvalidOrdering`] if the ordering value is not finite
    /// - [`TrackError::NotFound`] if the gear does not exist
    /// - [`TrackError::Store`] if the gear could not be written
    pub fn update_gear(
        &self,
        gear_id: GearId,
        patch: &GearPatch,
    ) -> Result<Mutation<Gear>, TrackError> {
        if let Some(start) = patch.start_distance {
            validate_non_negative(start)?;
        }
        if let Some(max) = patch.max_distance {
            validate_non_negative(max)?;
        }
        if let Some(value) = patch.ordering_value.filter(|value| !value.is_finite()) {
            return Err(TrackError::InvalidOrdering { value });
        }

        let lock = self.locks.for_gear(gear_id);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut updated = patch.apply(&self.require_gear(gear_id)?);
        self.store.update_gear(&updated)?;
        debug!(gear_id = %gear_id, "updated gear");
        let total = self.refresh(gear_id);
        if let TotalRefresh::Updated(refreshed) = total {
            updated.total_distance = refreshed;
        }
        Ok(Mutation {
            value: updated,
            total,
        })
    }

    /// Remove a gear item and all of its runs.
    ///
    /// # Errors
    ///
    /// - [`TrackError::NotFound`] if the gear does not exist
    /// - [`TrackError::Store`] if the gear could not be removed
    pub fn delete_gear(&self, gear_id: GearId) -> Result<Gear, TrackError> {
        let removed = {
            let lock = self.locks.for_gear(gear_id);
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            self.store.delete_gear(gear_id)?
        };
        self.locks.forget(gear_id);
        debug!(gear_id = %gear_id, "deleted gear");
        Ok(removed)
    }

    fn require_run(&self, id: RunId) -> Result<Run, TrackError> {
        self.store
            .get_run(id)?
            .ok_or(TrackError::NotFound(RecordId::Run(id)))
    }

    fn require_gear(&self, id: GearId) -> Result<Gear, TrackError> {
        self.store
            .get_gear(id)?
            .ok_or(TrackError::NotFound(RecordId::Gear(id)))
    }
}

fn validate_non_negative(distance: f64) -> Result<f64, TrackError> {
    if distance.is_finite() && distance >= 0.0 {
        Ok(distance)
    } else {
        Err(TrackError::InvalidDistance { distance })
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::store::{FailPoint, MemoryStore};
    use chrono::{NaiveDate, NaiveDateTime};

    fn at(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 4, day)
            .and_then(|d| d.and_hms_opt(7, 0, 0))
            .expect("valid timestamp")
    }

    fn setup(start_distance: f64) -> (Maintainer<MemoryStore>, GearId) {
        let maintainer = Maintainer::new(MemoryStore::new());
        let gear = maintainer
            .create_gear(&NewGear {
                name: "Daily trainer".into(),
                start_distance,
                max_distance: 500.0,
                created_at: at(1),
                expires_on: None,
            })
            .expect("create gear");
        (maintainer, gear.id)
    }

    fn log(maintainer: &Maintainer<MemoryStore>, gear_id: GearId, day: u32, distance: f64) -> Run {
        maintainer
            .insert_run(&NewRun {
                gear_id,
                date: at(day),
                distance,
            })
            .expect("insert run")
            .value
    }

    fn stored_total(maintainer: &Maintainer<MemoryStore>, gear_id: GearId) -> f64 {
        maintainer
            .store()
            .get_gear(gear_id)
            .expect("get gear")
            .expect("gear exists")
            .total_distance
    }

    #[test]
    fn insert_adds_to_start_distance() {
        let (maintainer, gear) = setup(20.0);
        let mutation = maintainer
            .insert_run(&NewRun {
                gear_id: gear,
                date: at(2),
                distance: 5.5,
            })
            .expect("insert run");

        assert_eq!(mutation.total_distance(), Some(25.5));
        assert!(mutation.warning().is_none());
        assert_eq!(stored_total(&maintainer, gear), 25.5);
    }

    #[test]
    fn update_and_delete_keep_total_in_sync() {
        let (maintainer, gear) = setup(10.0);
        let first = log(&maintainer, gear, 2, 4.0);
        let second = log(&maintainer, gear, 3, 6.0);
        assert_eq!(stored_total(&maintainer, gear), 20.0);

        maintainer
            .update_run(
                first.id,
                &RunEdit {
                    date: Some(at(5)),
                    distance: Some(9.0),
                },
            )
            .expect("update run");
        assert_eq!(stored_total(&maintainer, gear), 25.0);

        maintainer.delete_run(second.id).expect("delete run");
        assert_eq!(stored_total(&maintainer, gear), 19.0);
    }

    #[test]
    fn non_positive_distance_never_reaches_the_store() {
        let (maintainer, gear) = setup(0.0);
        let before = maintainer.store().revision().expect("revision");

        for distance in [0.0, -1.0] {
            let err = maintainer
                .insert_run(&NewRun {
                    gear_id: gear,
                    date: at(2),
                    distance,
                })
                .expect_err("invalid distance");
            assert!(matches!(err, TrackError::InvalidDistance { .. }));
        }

        assert_eq!(maintainer.store().revision().expect("revision"), before);
        assert!(maintainer.store().all_runs().expect("runs").is_empty());
    }

    #[test]
    fn invalid_edit_distance_is_rejected() {
        let (maintainer, gear) = setup(0.0);
        let run = log(&maintainer, gear, 2, 3.0);
        let err = maintainer
            .update_run(
                run.id,
                &RunEdit {
                    date: None,
                    distance: Some(-2.0),
                },
            )
            .expect_err("invalid distance");
        assert!(matches!(err, TrackError::InvalidDistance { .. }));
        assert_eq!(stored_total(&maintainer, gear), 3.0);
    }

    #[test]
    fn bulk_delete_resets_total_to_start_distance() {
        let (maintainer, gear) = setup(42.0);
        for day in 2..9 {
            log(&maintainer, gear, day, 3.0);
        }

        let cleared = maintainer.delete_all_runs(gear).expect("clear runs");
        assert_eq!(cleared.value, 7);
        assert_eq!(cleared.total_distance(), Some(42.0));
        assert_eq!(stored_total(&maintainer, gear), 42.0);
    }

    #[test]
    fn missing_records_are_not_found() {
        let (maintainer, _) = setup(0.0);
        let err = maintainer
            .insert_run(&NewRun {
                gear_id: GearId(404),
                date: at(2),
                distance: 1.0,
            })
            .expect_err("missing gear");
        assert!(matches!(err, TrackError::NotFound(RecordId::Gear(GearId(404)))));

        let err = maintainer.delete_run(RunId(9)).expect_err("missing run");
        assert!(matches!(err, TrackError::NotFound(RecordId::Run(RunId(9)))));

        let err = maintainer.delete_all_runs(GearId(404)).expect_err("missing gear");
        assert!(matches!(err, TrackError::NotFound(RecordId::Gear(_))));
    }

    #[test]
    fn failed_write_skips_recompute() {
        let (maintainer, gear) = setup(5.0);
        maintainer.store().fail_next(FailPoint::CreateRun);
        maintainer.store().fail_next(FailPoint::UpdateGear);

        let err = maintainer
            .insert_run(&NewRun {
                gear_id: gear,
                date: at(2),
                distance: 1.0,
            })
            .expect_err("write fails");
        assert!(matches!(err, TrackError::Store(StoreError::Unavailable(_))));

        // The gear update failure is still armed: no recompute consumed it.
        let stale = maintainer
            .insert_run(&NewRun {
                gear_id: gear,
                date: at(2),
                distance: 1.0,
            })
            .expect("write succeeds");
        assert!(stale.warning().is_some());
    }

    #[test]
    fn failed_recompute_reports_stale_total_and_can_be_repaired() {
        let (maintainer, gear) = setup(5.0);
        log(&maintainer, gear, 2, 2.0);
        maintainer.store().fail_next(FailPoint::SumDistance);

        let mutation = maintainer
            .insert_run(&NewRun {
                gear_id: gear,
                date: at(3),
                distance: 4.0,
            })
            .expect("write succeeds");
        let warning = mutation.warning().expect("stale warning");
        assert_eq!(warning.gear_id, gear);
        assert!(mutation.total_distance().is_none());
        assert_eq!(stored_total(&maintainer, gear), 7.0);
        assert_eq!(maintainer.store().runs_for_gear(gear).expect("runs").len(), 2);

        let repaired = maintainer
            .recompute_total(gear)
            .expect("recompute")
            .expect("gear exists");
        assert_eq!(repaired.total_distance, 11.0);
        assert_eq!(stored_total(&maintainer, gear), 11.0);
    }

    #[test]
    fn recompute_is_idempotent_and_ignores_missing_gear() {
        let (maintainer, gear) = setup(1.0);
        log(&maintainer, gear, 2, 2.0);

        let once = maintainer.recompute_total(gear).expect("recompute");
        let twice = maintainer.recompute_total(gear).expect("recompute");
        assert_eq!(once, twice);
        assert!(maintainer.recompute_total(GearId(77)).expect("no-op").is_none());
    }

    #[test]
    fn recompute_all_reports_corrections() {
        let (maintainer, gear) = setup(0.0);
        log(&maintainer, gear, 2, 2.0);
        maintainer.store().fail_next(FailPoint::UpdateGear);
        log(&maintainer, gear, 3, 3.0);

        let report = maintainer.recompute_all().expect("recompute all");
        assert_eq!(report.checked, 1);
        assert_eq!(
            report.corrections,
            vec![Correction {
                gear_id: gear,
                before: 2.0,
                after: 5.0,
            }]
        );

        let clean = maintainer.recompute_all().expect("recompute all");
        assert!(clean.corrections.is_empty());
    }

    #[test]
    fn gear_ordering_values_increase() {
        let (maintainer, first) = setup(0.0);
        let second = maintainer
            .create_gear(&NewGear {
                name: "Racer".into(),
                start_distance: 0.0,
                max_distance: 300.0,
                created_at: at(2),
                expires_on: None,
            })
            .expect("create gear");
        let first = maintainer
            .store()
            .get_gear(first)
            .expect("get gear")
            .expect("gear exists");
        assert_eq!(first.ordering_value, 1.0);
        assert_eq!(second.ordering_value, 2.0);
    }

    #[test]
    fn changing_start_distance_refreshes_total() {
        let (maintainer, gear) = setup(10.0);
        log(&maintainer, gear, 2, 5.0);

        let mutation = maintainer
            .update_gear(
                gear,
                &GearPatch {
                    start_distance: Some(100.0),
                    ..GearPatch::default()
                },
            )
            .expect("update gear");
        assert_eq!(mutation.value.total_distance, 105.0);
        assert_eq!(stored_total(&maintainer, gear), 105.0);

        let err = maintainer
            .update_gear(
                gear,
                &GearPatch {
                    start_distance: Some(-3.0),
                    ..GearPatch::default()
                },
            )
            .expect_err("negative start");
        assert!(matches!(err, TrackError::InvalidDistance { .. }));
    }

    #[test]
    fn deleting_gear_removes_its_runs() {
        let (maintainer, gear) = setup(0.0);
        log(&maintainer, gear, 2, 5.0);
        maintainer.delete_gear(gear).expect("delete gear");
        assert!(maintainer.store().all_runs().expect("runs").is_empty());
        assert!(matches!(
            maintainer.delete_gear(gear),
            Err(TrackError::NotFound(RecordId::Gear(_)))
        ));
    }

    #[test]
    fn concurrent_inserts_on_one_gear_stay_consistent() {
        let (maintainer, gear) = setup(3.0);

        std::thread::scope(|scope| {
            for worker in 0..4u32 {
                let maintainer = &maintainer;
                scope.spawn(move || {
                    for i in 0..25u32 {
                        maintainer
                            .insert_run(&NewRun {
                                gear_id: gear,
                                date: at(1 + (worker * 25 + i) % 28),
                                distance: 0.5,
                            })
                            .expect("insert run");
                    }
                });
            }
        });

        assert_eq!(maintainer.store().runs_for_gear(gear).expect("runs").len(), 100);
        assert_eq!(stored_total(&maintainer, gear), 53.0);
    }

    #[test]
    fn non_finite_ordering_values_are_rejected() {
        let (maintainer, gear) = setup(0.0);
        let before = maintainer.store().revision().expect("revision");

        for value in [f64::INFINITY, f64::NEG_INFINITY, f64::NAN] {
            let err = maintainer
                .update_gear(
                    gear,
                    &GearPatch {
                        ordering_value: Some(value),
                        ..GearPatch::default()
                    },
                )
                .expect_err("non-finite ordering value");
            assert!(matches!(err, TrackError::InvalidOrdering { .. }));
            assert_eq!(err.code(), crate::error::ErrorCode::InvalidOrdering);
        }
        assert_eq!(maintainer.store().revision().expect("revision"), before);

        let next = maintainer
            .create_gear(&NewGear {
                name: "Racer".into(),
                start_distance: 0.0,
                max_distance: 300.0,
                created_at: at(2),
                expires_on: None,
            })
            .expect("create gear");
        assert_eq!(next.ordering_value, 2.0);
    }

    /// Delegates to a [`MemoryStore`], running a hook before selected reads.
    struct HookedStore {
        inner: MemoryStore,
        before_get_run: Box<dyn Fn() + Send + Sync>,
        before_get_gear: Box<dyn Fn() + Send + Sync>,
    }

    impl HookedStore {
        fn new(inner: MemoryStore) -> Self {
            Self {
                inner,
                before_get_run: Box::new(|| {}),
                before_get_gear: Box::new(|| {}),
            }
        }
    }

    impl RunStore for HookedStore {
        fn create_run(&self, run: &NewRun) -> StoreResult<Run> {
            self.inner.create_run(run)
        }

        fn update_run(&self, run: &Run) -> StoreResult<()> {
            self.inner.update_run(run)
        }

        fn delete_run(&self, id: RunId) -> StoreResult<Run> {
            self.inner.delete_run(id)
        }

        fn delete_runs_for_gear(&self, gear_id: GearId) -> StoreResult<usize> {
            self.inner.delete_runs_for_gear(gear_id)
        }

        fn get_run(&self, id: RunId) -> StoreResult<Option<Run>> {
            (self.before_get_run)();
            self.inner.get_run(id)
        }

        fn runs_for_gear(&self, gear_id: GearId) -> StoreResult<Vec<Run>> {
            self.inner.runs_for_gear(gear_id)
        }

        fn all_runs(&self) -> StoreResult<Vec<Run>> {
            self.inner.all_runs()
        }

        fn sum_distance(&self, gear_id: GearId) -> StoreResult<f64> {
            self.inner.sum_distance(gear_id)
        }

        fn create_gear(&self, gear: &NewGear, ordering_value: f64) -> StoreResult<Gear> {
            self.inner.create_gear(gear, ordering_value)
        }

        fn update_gear(&self, gear: &Gear) -> StoreResult<()> {
            self.inner.update_gear(gear)
        }

        fn get_gear(&self, id: GearId) -> StoreResult<Option<Gear>> {
            (self.before_get_gear)();
            self.inner.get_gear(id)
        }

        fn list_gear(&self) -> StoreResult<Vec<Gear>> {
            self.inner.list_gear()
        }

        fn delete_gear(&self, id: GearId) -> StoreResult<Gear> {
            self.inner.delete_gear(id)
        }

        fn revision(&self) -> StoreResult<u64> {
            self.inner.revision()
        }
    }

    fn seeded_store(start_distance: f64) -> (MemoryStore, GearId) {
        let (maintainer, gear) = setup(start_distance);
        (maintainer.into_store(), gear)
    }

    #[test]
    fn concurrent_edits_of_one_run_both_land() {
        use std::sync::Barrier;
        use std::sync::atomic::{AtomicUsize, Ordering};

        let (memory, gear) = seeded_store(0.0);
        let run = memory
            .create_run(&NewRun {
                gear_id: gear,
                date: at(2),
                distance: 5.0,
            })
            .expect("create run");

        // The first two reads rendezvous, so both edits start from the same
        // snapshot before either has written.
        let reads = Arc::new(AtomicUsize::new(0));
        let rendezvous = Arc::new(Barrier::new(2));
        let mut store = HookedStore::new(memory);
        store.before_get_run = Box::new(move || {
            if reads.fetch_add(1, Ordering::SeqCst) < 2 {
                rendezvous.wait();
            }
        });
        let maintainer = Maintainer::new(store);

        std::thread::scope(|scope| {
            let maintainer = &maintainer;
            scope.spawn(move || {
                maintainer
                    .update_run(
                        run.id,
                        &RunEdit {
                            date: Some(at(20)),
                            distance: None,
                        },
                    )
                    .expect("date edit");
            });
            scope.spawn(move || {
                maintainer
                    .update_run(
                        run.id,
                        &RunEdit {
                            date: None,
                            distance: Some(9.0),
                        },
                    )
                    .expect("distance edit");
            });
        });

        let stored = maintainer
            .store()
            .inner
            .get_run(run.id)
            .expect("get run")
            .expect("run exists");
        assert_eq!(stored.date, at(20));
        assert_eq!(stored.distance, 9.0);
        assert_eq!(
            maintainer
                .store()
                .inner
                .get_gear(gear)
                .expect("get gear")
                .expect("gear exists")
                .total_distance,
            9.0
        );
    }

    #[test]
    fn clearing_runs_of_gear_deleted_meanwhile_is_not_found() {
        use std::sync::atomic::{AtomicBool, Ordering};
        use std::sync::mpsc;
        use std::time::Duration;

        let (memory, gear) = seeded_store(4.0);
        memory
            .create_run(&NewRun {
                gear_id: gear,
                date: at(2),
                distance: 3.0,
            })
            .expect("create run");

        // The clearing thread's existence check waits for the deletion to
        // finish. Once the check holds the gear lock, the deletion cannot
        // finish, so the wait times out and the check sees the gear.
        let (deleted_tx, deleted_rx) = mpsc::channel::<()>();
        let deleted_rx = Mutex::new(deleted_rx);
        let (checking_tx, checking_rx) = mpsc::channel::<()>();
        let checking_tx = Mutex::new(checking_tx);
        let armed = AtomicBool::new(true);
        let mut store = HookedStore::new(memory);
        store.before_get_gear = Box::new(move || {
            if armed.swap(false, Ordering::SeqCst) {
                let _ = checking_tx
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .send(());
                let _ = deleted_rx
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .recv_timeout(Duration::from_millis(200));
            }
        });
        let maintainer = Maintainer::new(store);

        let cleared = std::thread::scope(|scope| {
            let maintainer = &maintainer;
            let clearing = scope.spawn(move || maintainer.delete_all_runs(gear));
            checking_rx.recv().expect("existence check started");
            maintainer.delete_gear(gear).expect("delete gear");
            let _ = deleted_tx.send(());
            clearing.join().expect("clearing thread")
        });

        match cleared {
            Ok(mutation) => assert!(
                matches!(mutation.total, TotalRefresh::Updated(total) if total == 4.0),
                "runs cleared without a live gear: {:?}",
                mutation.total
            ),
            Err(err) => assert!(matches!(err, TrackError::NotFound(RecordId::Gear(_)))),
        }
        assert!(maintainer.store().inner.get_gear(gear).expect("get gear").is_none());
    }
}
