//! Sort keys for newly created gear.
//!
//! Keys only need to increase across creations. Reordering existing gear is
//! done by writing an explicit `ordering_value` through a gear patch.

use crate::store::{RunStore, StoreResult};

/// Key used when no gear exists yet.
pub const FIRST_ORDERING_VALUE: f64 = 1.0;

/// One past the largest of `values`, or [`FIRST_ORDERING_VALUE`] when empty.
#[must_use]
pub fn next_after(values: impl IntoIterator<Item = f64>) -> f64 {
    values
        .into_iter()
        .reduce(f64::max)
        .map_or(FIRST_ORDERING_VALUE, |max| max + 1.0)
}

/// Allocate the ordering value for the next gear item created in `store`.
///
/// # Errors
///
/// Returns an error if the store cannot report its current maximum.
pub fn next_ordering_value(store: &impl RunStore) -> StoreResult<f64> {
    Ok(next_after(store.max_ordering_value()?))
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::model::NewGear;
    use crate::store::MemoryStore;
    use chrono::NaiveDate;

    #[test]
    fn empty_set_starts_at_one() {
        assert_eq!(next_after([]), 1.0);
        assert_eq!(next_ordering_value(&MemoryStore::new()).expect("allocate"), 1.0);
    }

    #[test]
    fn next_is_one_past_the_maximum() {
        assert_eq!(next_after([1.0, 2.0, 5.0]), 6.0);
        assert_eq!(next_after([5.0, 1.0, 2.0]), 6.0);
        assert_eq!(next_after([0.5]), 1.5);
    }

    #[test]
    fn store_allocation_follows_existing_gear() {
        let store = MemoryStore::new();
        let created_at = NaiveDate::from_ymd_opt(2024, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .expect("valid timestamp");
        for value in [1.0, 2.0, 5.0] {
            store
                .create_gear(
                    &NewGear {
                        name: format!("pair {value}"),
                        start_distance: 0.0,
                        max_distance: 0.0,
                        created_at,
                        expires_on: None,
                    },
                    value,
                )
                .expect("create gear");
        }
        assert_eq!(next_ordering_value(&store).expect("allocate"), 6.0);
    }
}
