//! Per-owner asset fetch bookkeeping.
//!
//! Tracks which owners have an asset fetch running and which failed last
//! time. Every operation takes the single lock once, so concurrent fetch
//! tasks never observe a half-updated set.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use parking_lot::Mutex;
use tracing::debug;
use crate::model::OwnerKey;

#[derive(Debug, Default)]
struct Inner {
    in_flight: BTreeSet<OwnerKey>,
    failed: BTreeSet<OwnerKey>,
}

/// Exclusive in-flight / failed sets keyed by owner.
#[derive(Debug, Default)]
pub struct FetchCoordinationState {
    inner: Mutex<Inner>,
}

impl FetchCoordinationState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if the owner was already in flight
    pub fn mark_in_flight(&self, owner_key: OwnerKey) -> bool {
        self.inner.lock().in_flight.insert(owner_key)
    }

    pub fn unmark_in_flight(&self, owner_key: OwnerKey) {
        self.inner.lock().in_flight.remove(&owner_key);
    }

    pub fn mark_failed(&self, owner_key: OwnerKey) {
        self.inner.lock().failed.insert(owner_key);
    }

    pub fn clear_failed(&self, owner_key: OwnerKey) {
        self.inner.lock().failed.remove(&owner_key);
    }

    #[must_use]
    pub fn in_flight(&self) -> BTreeSet<OwnerKey> {
        self.inner.lock().in_flight.clone()
    }

    #[must_use]
    pub fn failed(&self) -> BTreeSet<OwnerKey> {
        self.inner.lock().failed.clone()
    }

    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.inner.lock().failed.len()
    }

    /// Mark `owner_key` in flight and return a guard that unmarks it on drop.
    ///
    /// The guard records the fetch as failed unless [`InFlightGuard::succeed`]
    /// or [`InFlightGuard::fail`] settles it first, so an aborted or panicked
    /// fetch is retried later.
    pub fn begin(self: &Arc<Self>, owner_key: OwnerKey) -> InFlightGuard {
        self.mark_in_flight(owner_key);
        InFlightGuard {
            state: Arc::clone(self),
            owner_key,
            settled: false,
        }
    }

    /// Owners from a fetched page that need an asset fetch:
    /// (owners without a stored asset) + (owners that failed before),
    /// minus owners already in flight.
    ///
    /// Both sets are read under one lock acquisition.
    #[must_use]
    pub fn plan<V>(
        &self,
        page_owners: &BTreeSet<OwnerKey>,
        stored_assets: &HashMap<OwnerKey, V>,
    ) -> BTreeSet<OwnerKey> {
        let inner = self.inner.lock();
        page_owners
            .iter()
            .copied()
            .filter(|key| !stored_assets.contains_key(key) || inner.failed.contains(key))
            .filter(|key| !inner.in_flight.contains(key))
            .collect()
    }
}

/// In-flight marker for one owner's asset fetch.
#[must_use = "dropping the guard immediately unmarks the owner"]
pub struct InFlightGuard {
    state: Arc<FetchCoordinationState>,
    owner_key: OwnerKey,
    settled: bool,
}

impl InFlightGuard {
    #[must_use]
    pub fn owner_key(&self) -> OwnerKey {
        self.owner_key
    }

    /// Fetch and store succeeded: clear any earlier failure
    pub fn succeed(mut self) {
        self.state.clear_failed(self.owner_key);
        self.settled = true;
    }

    /// Fetch or store failed: retry on a later load
    pub fn fail(mut self) {
        self.state.mark_failed(self.owner_key);
        self.settled = true;
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if !self.settled {
            debug!(owner_key = self.owner_key, "Asset fetch abandoned, marking failed");
            self.state.mark_failed(self.owner_key);
        }
        self.state.unmark_in_flight(self.owner_key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(keys: &[OwnerKey]) -> BTreeSet<OwnerKey> {
        keys.iter().copied().collect()
    }

    #[test]
    fn test_mark_and_unmark() {
        let state = FetchCoordinationState::new();
        assert!(state.mark_in_flight(1));
        assert!(!state.mark_in_flight(1));
        assert_eq!(state.in_flight(), set(&[1]));

        state.unmark_in_flight(1);
        assert!(state.in_flight().is_empty());
    }

    #[test]
    fn test_failed_set() {
        let state = FetchCoordinationState::new();
        state.mark_failed(4);
        state.mark_failed(2);
        assert_eq!(state.failed(), set(&[2, 4]));
        assert_eq!(state.failed_count(), 2);

        state.clear_failed(4);
        assert_eq!(state.failed(), set(&[2]));
    }

    #[test]
    fn test_guard_success_clears_failure() {
        let state = Arc::new(FetchCoordinationState::new());
        state.mark_failed(7);

        let guard = state.begin(7);
        assert_eq!(state.in_flight(), set(&[7]));
        guard.succeed();

        assert!(state.in_flight().is_empty());
        assert!(state.failed().is_empty());
    }

    #[test]
    fn test_guard_failure_records_owner() {
        let state = Arc::new(FetchCoordinationState::new());
        state.begin(3).fail();

        assert!(state.in_flight().is_empty());
        assert_eq!(state.failed(), set(&[3]));
    }

    #[test]
    fn test_unsettled_guard_counts_as_failure() {
        let state = Arc::new(FetchCoordinationState::new());
        {
            let _guard = state.begin(9);
        }
        assert!(state.in_flight().is_empty());
        assert_eq!(state.failed(), set(&[9]));
    }

    #[test]
    fn test_guard_unmarks_on_panic() {
        let state = Arc::new(FetchCoordinationState::new());
        let cloned = state.clone();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
            let _guard = cloned.begin(5);
            panic!("fetch blew up");
        }));

        assert!(result.is_err());
        assert!(state.in_flight().is_empty());
        assert_eq!(state.failed(), set(&[5]));
    }

    #[test]
    fn test_plan_missing_assets() {
        let state = FetchCoordinationState::new();
        let mut stored = HashMap::new();
        stored.insert(1, ());

        assert_eq!(state.plan(&set(&[1, 2, 3]), &stored), set(&[2, 3]));
    }

    #[test]
    fn test_plan_retries_failed_even_if_stored() {
        let state = FetchCoordinationState::new();
        state.mark_failed(1);
        let mut stored = HashMap::new();
        stored.insert(1, ());

        assert_eq!(state.plan(&set(&[1]), &stored), set(&[1]));
    }

    #[test]
    fn test_plan_failed_outside_page_ignored() {
        let state = FetchCoordinationState::new();
        state.mark_failed(42);

        assert_eq!(state.plan(&set(&[1]), &HashMap::<OwnerKey, ()>::new()), set(&[1]));
    }

    #[test]
    fn test_plan_skips_in_flight() {
        let state = FetchCoordinationState::new();
        state.mark_in_flight(2);
        state.mark_failed(3);
        state.mark_in_flight(3);

        let planned = state.plan(&set(&[1, 2, 3]), &HashMap::<OwnerKey, ()>::new());
        assert_eq!(planned, set(&[1]));
    }

    #[test]
    fn test_concurrent_marking() {
        let state = Arc::new(FetchCoordinationState::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let state = state.clone();
                std::thread::spawn(move || {
                    for i in 0..100 {
                        let key = t * 100 + i;
                        state.mark_in_flight(key);
                        state.mark_failed(key);
                        state.unmark_in_flight(key);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert!(state.in_flight().is_empty());
        assert_eq!(state.failed_count(), 800);
    }
}
