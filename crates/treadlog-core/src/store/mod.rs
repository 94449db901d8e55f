//! The run store boundary.
//!
//! [`RunStore`] is the only owner of persisted gear and run records. The
//! maintainer and the CLI receive a store explicitly; nothing in this crate
//! reaches for a global handle.
//!
//! Two implementations ship with the crate:
//! - [`MemoryStore`] keeps everything in a mutex-guarded map and can inject
//!   write failures for tests
//! - [`crate::db::SqliteStore`] persists to a `SQLite` file

pub mod memory;

use crate::error::StoreError;
use crate::model::{Gear, GearId, NewGear, NewRun, Run, RunId};

pub use memory::{FailPoint, MemoryStore};

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence operations used by the maintainer and readers.
///
/// Every successful write advances [`RunStore::revision`], which readers poll
/// to detect changes (see [`crate::watch`]).
pub trait RunStore: Send + Sync {
    /// Persist a new run and return it with its assigned id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the gear does not exist.
    fn create_run(&self, run: &NewRun) -> StoreResult<Run>;

    /// Overwrite the date and distance of an existing run.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the run does not exist.
    fn update_run(&self, run: &Run) -> StoreResult<()>;

    /// Remove a run, returning the removed record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the run does not exist.
    fn delete_run(&self, id: RunId) -> StoreResult<Run>;

    /// Remove every run logged against `gear_id`, returning how many went.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    fn delete_runs_for_gear(&self, gear_id: GearId) -> StoreResult<usize>;

    /// # Errors
    ///
    /// Returns an error if the backend fails.
    fn get_run(&self, id: RunId) -> StoreResult<Option<Run>>;

    /// Runs for one gear item, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    fn runs_for_gear(&self, gear_id: GearId) -> StoreResult<Vec<Run>>;

    /// Every run in the store, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    fn all_runs(&self) -> StoreResult<Vec<Run>>;

    /// Sum of run distances for `gear_id`, excluding the start distance.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    fn sum_distance(&self, gear_id: GearId) -> StoreResult<f64> {
        Ok(self
            .runs_for_gear(gear_id)?
            .iter()
            .map(|run| run.distance)
            .sum())
    }

    /// Persist new gear at `ordering_value`; the store assigns the id.
    ///
    /// New gear has no runs, so its total starts at its start distance.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    fn create_gear(&self, gear: &NewGear, ordering_value: f64) -> StoreResult<Gear>;

    /// Overwrite every column of an existing gear record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the gear does not exist.
    fn update_gear(&self, gear: &Gear) -> StoreResult<()>;

    /// # Errors
    ///
    /// Returns an error if the backend fails.
    fn get_gear(&self, id: GearId) -> StoreResult<Option<Gear>>;

    /// All gear ordered by `ordering_value`, then id.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    fn list_gear(&self) -> StoreResult<Vec<Gear>>;

    /// Remove a gear item together with its runs.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the gear does not exist.
    fn delete_gear(&self, id: GearId) -> StoreResult<Gear>;

    /// Highest ordering value in use, if any gear exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    fn max_ordering_value(&self) -> StoreResult<Option<f64>> {
        Ok(self
            .list_gear()?
            .iter()
            .map(|gear| gear.ordering_value)
            .reduce(f64::max))
    }

    /// Monotonic write counter.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    fn revision(&self) -> StoreResult<u64>;
}

impl<S: RunStore + ?Sized> RunStore for std::sync::Arc<S> {
    fn create_run(&self, run: &NewRun) -> StoreResult<Run> {
        (**self).create_run(run)
    }

    fn update_run(&self, run: &Run) -> StoreResult<()> {
        (**self).update_run(run)
    }

    fn delete_run(&self, id: RunId) -> StoreResult<Run> {
        (**self).delete_run(id)
    }

    fn delete_runs_for_gear(&self, gear_id: GearId) -> StoreResult<usize> {
        (**self).delete_runs_for_gear(gear_id)
    }

    fn get_run(&self, id: RunId) -> StoreResult<Option<Run>> {
        (**self).get_run(id)
    }

    fn runs_for_gear(&self, gear_id: GearId) -> StoreResult<Vec<Run>> {
        (**self).runs_for_gear(gear_id)
    }

    fn all_runs(&self) -> StoreResult<Vec<Run>> {
        (**self).all_runs()
    }

    fn sum_distance(&self, gear_id: GearId) -> StoreResult<f64> {
        (**self).sum_distance(gear_id)
    }

    fn create_gear(&self, gear: &NewGear, ordering_value: f64) -> StoreResult<Gear> {
        (**self).create_gear(gear, ordering_value)
    }

    fn update_gear(&self, gear: &Gear) -> StoreResult<()> {
        (**self).update_gear(gear)
    }

    fn get_gear(&self, id: GearId) -> StoreResult<Option<Gear>> {
        (**self).get_gear(id)
    }

    fn list_gear(&self) -> StoreResult<Vec<Gear>> {
        (**self).list_gear()
    }

    fn delete_gear(&self, id: GearId) -> StoreResult<Gear> {
        (**self).delete_gear(id)
    }

    fn max_ordering_value(&self) -> StoreResult<Option<f64>> {
        (**self).max_ordering_value()
    }

    fn revision(&self) -> StoreResult<u64> {
        (**self).revision()
    }
}
