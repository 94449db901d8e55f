//! Change detection by polling the store's revision counter.
//!
//! Readers that display runs (a history chart, a gear list) keep a
//! [`ChangePoller`] and call it on their own schedule. A changed revision
//! means at least one write committed since the last poll, so the reader
//! reloads; an unchanged revision means the previous load is still current.

use crate::model::{GearId, Run};
use crate::store::{RunStore, StoreResult};

/// Which runs a reader is interested in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunScope {
    #[default]
    All,
    Gear(GearId),
}

impl RunScope {
    /// Load the runs in scope, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the store read fails.
    pub fn load(self, store: &impl RunStore) -> StoreResult<Vec<Run>> {
        match self {
            Self::All => store.all_runs(),
            Self::Gear(gear_id) => store.runs_for_gear(gear_id),
        }
    }
}

/// Remembers the last revision a reader has seen.
#[derive(Debug, Clone, Default)]
pub struct ChangePoller {
    last_seen: Option<u64>,
}

impl ChangePoller {
    #[must_use]
    pub const fn new() -> Self {
        Self { last_seen: None }
    }

    #[must_use]
    pub const fn last_seen(&self) -> Option<u64> {
        self.last_seen
    }

    /// `true` on the first poll and whenever the store has been written to
    /// since the previous poll.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot report its revision. The last
    /// seen revision is left unchanged, so the next poll retries.
    pub fn poll(&mut self, store: &impl RunStore) -> StoreResult<bool> {
        let revision = store.revision()?;
        let changed = self.last_seen != Some(revision);
        if changed {
            tracing::trace!(previous = ?self.last_seen, revision, "store revision changed");
            self.last_seen = Some(revision);
        }
        Ok(changed)
    }

    /// Reload the runs in `scope` if the store changed, otherwise `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the revision or the runs cannot be read. A failed
    /// load forgets the revision so the next poll reloads.
    pub fn poll_runs(
        &mut self,
        store: &impl RunStore,
        scope: RunScope,
    ) -> StoreResult<Option<Vec<Run>>> {
        if !self.poll(store)? {
            return Ok(None);
        }
        match scope.load(store) {
            Ok(runs) => Ok(Some(runs)),
            Err(error) => {
                self.last_seen = None;
                Err(error)
            }
        }
    }
}
