//! In-process [`RunStore`] backed by ordered maps.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use super::{RunStore, StoreResult};
use crate::error::{RecordId, StoreError};
use crate::model::{Gear, GearId, NewGear, NewRun, Run, RunId};

/// Store operations that can be made to fail on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    CreateRun,
    UpdateRun,
    DeleteRun,
    DeleteRunsForGear,
    SumDistance,
    UpdateGear,
}

#[derive(Debug, Default)]
struct Inner {
    gear: BTreeMap<GearId, Gear>,
    runs: BTreeMap<RunId, Run>,
    next_gear_id: i64,
    next_run_id: i64,
    revision: u64,
    armed: Vec<FailPoint>,
}

impl Inner {
    fn trip(&mut self, point: FailPoint) -> StoreResult<()> {
        if let Some(pos) = self.armed.iter().position(|armed| *armed == point) {
            self.armed.remove(pos);
            return Err(StoreError::Unavailable(format!(
                "injected failure at {point:?}"
            )));
        }
        Ok(())
    }

    fn runs_newest_first<'a>(runs: impl Iterator<Item = &'a Run>) -> Vec<Run> {
        let mut runs: Vec<Run> = runs.cloned().collect();
        runs.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));
        runs
    }
}

/// A [`RunStore`] that lives entirely in memory.
///
/// Used by tests and by callers that load runs from elsewhere. Failures can be
/// armed with [`MemoryStore::fail_next`]; each armed failure fires once.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next call of `point` fail with [`StoreError::Unavailable`].
    pub fn fail_next(&self, point: FailPoint) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.armed.push(point);
        }
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".into()))
    }
}

impl RunStore for MemoryStore {
    fn create_run(&self, run: &NewRun) -> StoreResult<Run> {
        let mut inner = self.lock()?;
        inner.trip(FailPoint::CreateRun)?;
        if !inner.gear.contains_key(&run.gear_id) {
            return Err(StoreError::NotFound(RecordId::Gear(run.gear_id)));
        }

        inner.next_run_id += 1;
        let stored = Run {
            id: RunId(inner.next_run_id),
            gear_id: run.gear_id,
            date: run.date,
            distance: run.distance,
        };
        inner.runs.insert(stored.id, stored.clone());
        inner.revision += 1;
        Ok(stored)
    }

    fn update_run(&self, run: &Run) -> StoreResult<()> {
        let mut inner = self.lock()?;
        inner.trip(FailPoint::UpdateRun)?;
        let existing = inner
            .runs
            .get_mut(&run.id)
            .ok_or(StoreError::NotFound(RecordId::Run(run.id)))?;
        existing.date = run.date;
        existing.distance = run.distance;
        inner.revision += 1;
        Ok(())
    }

    fn delete_run(&self, id: RunId) -> StoreResult<Run> {
        let mut inner = self.lock()?;
        inner.trip(FailPoint::DeleteRun)?;
        let removed = inner
            .runs
            .remove(&id)
            .ok_or(StoreError::NotFound(RecordId::Run(id)))?;
        inner.revision += 1;
        Ok(removed)
    }

    fn delete_runs_for_gear(&self, gear_id: GearId) -> StoreResult<usize> {
        let mut inner = self.lock()?;
        inner.trip(FailPoint::DeleteRunsForGear)?;
        let before = inner.runs.len();
        inner.runs.retain(|_, run| run.gear_id != gear_id);
        let removed = before - inner.runs.len();
        inner.revision += 1;
        Ok(removed)
    }

    fn get_run(&self, id: RunId) -> StoreResult<Option<Run>> {
        Ok(self.lock()?.runs.get(&id).cloned())
    }

    fn runs_for_gear(&self, gear_id: GearId) -> StoreResult<Vec<Run>> {
        let inner = self.lock()?;
        Ok(Inner::runs_newest_first(
            inner.runs.values().filter(|run| run.gear_id == gear_id),
        ))
    }

    fn all_runs(&self) -> StoreResult<Vec<Run>> {
        let inner = self.lock()?;
        Ok(Inner::runs_newest_first(inner.runs.values()))
    }

    fn sum_distance(&self, gear_id: GearId) -> StoreResult<f64> {
        let mut inner = self.lock()?;
        inner.trip(FailPoint::SumDistance)?;
        Ok(inner
            .runs
            .values()
            .filter(|run| run.gear_id == gear_id)
            .map(|run| run.distance)
            .sum())
    }

    fn create_gear(&self, gear: &NewGear, ordering_value: f64) -> StoreResult<Gear> {
        let mut inner = self.lock()?;
        inner.next_gear_id += 1;
        let stored = Gear {
            id: GearId(inner.next_gear_id),
            name: gear.name.clone(),
            start_distance: gear.start_distance,
            total_distance: gear.start_distance,
            max_distance: gear.max_distance,
            ordering_value,
            retired: false,
            created_at: gear.created_at,
            expires_on: gear.expires_on,
        };
        inner.gear.insert(stored.id, stored.clone());
        inner.revision += 1;
        Ok(stored)
    }

    fn update_gear(&self, gear: &Gear) -> StoreResult<()> {
        let mut inner = self.lock()?;
        inner.trip(FailPoint::UpdateGear)?;
        let existing = inner
            .gear
            .get_mut(&gear.id)
            .ok_or(StoreError::NotFound(RecordId::Gear(gear.id)))?;
        *existing = gear.clone();
        inner.revision += 1;
        Ok(())
    }

    fn get_gear(&self, id: GearId) -> StoreResult<Option<Gear>> {
        Ok(self.lock()?.gear.get(&id).cloned())
    }

    fn list_gear(&self) -> StoreResult<Vec<Gear>> {
        let inner = self.lock()?;
        let mut gear: Vec<Gear> = inner.gear.values().cloned().collect();
        gear.sort_by(|a, b| {
            a.ordering_value
                .total_cmp(&b.ordering_value)
                .then(a.id.cmp(&b.id))
        });
        Ok(gear)
    }

    fn delete_gear(&self, id: GearId) -> StoreResult<Gear> {
        let mut inner = self.lock()?;
        let removed = inner
            .gear
            .remove(&id)
            .ok_or(StoreError::NotFound(RecordId::Gear(id)))?;
        inner.runs.retain(|_, run| run.gear_id != id);
        inner.revision += 1;
        Ok(removed)
    }

    fn revision(&self) -> StoreResult<u64> {
        Ok(self.lock()?.revision)
    }
}
