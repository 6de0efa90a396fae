// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Feed sync coordinator.
//!
//! The [`SyncCoordinator`] ties together:
//! - a [`RemoteSource`] for pages and per-owner assets
//! - a [`LocalStore`] holding the durable offline copy
//! - a [`ConnectivityProbe`] deciding online vs cache-only loads
//! - [`FetchCoordinationState`] deduplicating per-owner asset fetches
//!
//! and publishes the assembled feed through a latest-value channel.
//!
//! # Page load
//!
//! ```text
//! load_page(reset) → resolve page → probe
//!     offline → read store (id order) → replace snapshot
//!     online  → [page 1: clear store + snapshot] → fetch page → upsert
//!             → plan owners → fan-out asset fetches → join all
//!             → re-read assets → assemble → replace/append → publish
//!             → probe again → advance cursor
//!     online failure → read store → replace snapshot
//! ```
//!
//! Loads are serialized: a second call waits for the first to finish and
//! then resolves its own page from the updated cursor.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use feed_sync::{FeedSyncConfig, SyncCoordinator, MemorySource, InMemoryStore, ManualProbe};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let coordinator = SyncCoordinator::new(
//!     FeedSyncConfig::default(),
//!     Arc::new(MemorySource::new()),
//!     Arc::new(InMemoryStore::new()),
//!     Arc::new(ManualProbe::new(true)),
//! );
//!
//! let mut feed = coordinator.subscribe();
//! coordinator.load_page(true).await;
//! feed.changed().await.ok();
//! println!("{} records", feed.borrow().len());
//! # }
//! ```

mod types;
mod fetch_state;
mod load;
mod lifecycle;

pub use types::{PaginationCursor, LoadPath, LoadOutcome, SyncError, CoordinatorError};
pub use fetch_state::{FetchCoordinationState, InFlightGuard};

use std::sync::Arc;
use parking_lot::RwLock;
use tokio::sync::{watch, Mutex, Semaphore};
use tokio::task::JoinHandle;

use crate::config::FeedSyncConfig;
use crate::connectivity::{ConnectivityProbe, TimeoutProbe};
use crate::model::AssembledRecord;
use crate::source::RemoteSource;
use crate::storage::traits::LocalStore;

/// Published view of the feed.
pub type Snapshot = Arc<[AssembledRecord]>;

/// Offline-first feed coordinator.
///
/// # Thread Safety
///
/// `Send + Sync`; share it behind an `Arc`. Page loads queue on an async
/// mutex that also owns the assembled cache, so only one load body mutates
/// it at a time.
pub struct SyncCoordinator {
    pub(super) config: FeedSyncConfig,

    pub(super) remote: Arc<dyn RemoteSource>,

    pub(super) store: Arc<dyn LocalStore>,

    /// Every check is bounded by `config.probe_timeout_ms`
    pub(super) probe: TimeoutProbe<Arc<dyn ConnectivityProbe>>,

    pub(super) fetch_state: Arc<FetchCoordinationState>,

    /// Caps concurrent asset fetches within one fan-out
    pub(super) asset_permits: Arc<Semaphore>,

    pub(super) cursor: RwLock<PaginationCursor>,

    /// Assembled cache. Holding the lock is what serializes page loads.
    pub(super) assembled: Mutex<Vec<AssembledRecord>>,

    /// Latest snapshot (replayed to new subscribers)
    pub(super) snapshot_tx: watch::Sender<Snapshot>,
}

impl SyncCoordinator {
    /// Create a coordinator over the given collaborators.
    ///
    /// Nothing is loaded until the first [`load_page`](Self::load_page).
    pub fn new(
        config: FeedSyncConfig,
        remote: Arc<dyn RemoteSource>,
        store: Arc<dyn LocalStore>,
        probe: Arc<dyn ConnectivityProbe>,
    ) -> Self {
        let (snapshot_tx, _) = watch::channel(Snapshot::from(Vec::new()));
        let probe = TimeoutProbe::new(probe, config.probe_timeout());
        let asset_permits = Arc::new(Semaphore::new(config.effective_asset_concurrency()));

        Self {
            cursor: RwLock::new(PaginationCursor::new(config.page_size)),
            config,
            remote,
            store,
            probe,
            fetch_state: Arc::new(FetchCoordinationState::new()),
            asset_permits,
            assembled: Mutex::new(Vec::new()),
            snapshot_tx,
        }
    }

    #[must_use]
    pub fn config(&self) -> &FeedSyncConfig {
        &self.config
    }

    /// Subscribe to snapshots. The receiver sees the current snapshot
    /// immediately and every later one; intermediate values may be skipped.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Current published snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        self.snapshot_tx.borrow().clone()
    }

    /// Number of records in the current snapshot.
    #[must_use]
    pub fn count_of_news(&self) -> usize {
        self.snapshot_tx.borrow().len()
    }

    /// Record at `index` in the current snapshot.
    pub fn item_at(&self, index: usize) -> Result<AssembledRecord, CoordinatorError> {
        let snapshot = self.snapshot_tx.borrow();
        snapshot
            .get(index)
            .cloned()
            .ok_or(CoordinatorError::IndexOutOfRange { index, len: snapshot.len() })
    }

    #[must_use]
    pub fn cursor(&self) -> PaginationCursor {
        *self.cursor.read()
    }

    /// Shared per-owner fetch bookkeeping.
    #[must_use]
    pub fn fetch_state(&self) -> &Arc<FetchCoordinationState> {
        &self.fetch_state
    }

    /// Fire-and-forget page load on the current runtime.
    ///
    /// The handle may be dropped; results arrive through [`subscribe`](Self::subscribe).
    pub fn spawn_load_page(self: &Arc<Self>, reset: bool) -> JoinHandle<LoadOutcome> {
        let this = Arc::clone(self);
        tokio::spawn(async move { this.load_page(reset).await })
    }

    pub(super) fn publish(&self, records: &[AssembledRecord]) {
        self.snapshot_tx.send_replace(Snapshot::from(records));
        crate::metrics::set_assembled_records(records.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectivity::ManualProbe;
    use crate::model::Item;
    use crate::source::MemorySource;
    use crate::storage::memory::InMemoryStore;

    fn coordinator(online: bool) -> (Arc<SyncCoordinator>, Arc<MemorySource>, Arc<InMemoryStore>) {
        let source = Arc::new(MemorySource::new());
        let store = Arc::new(InMemoryStore::new());
        let coordinator = SyncCoordinator::new(
            FeedSyncConfig::default(),
            source.clone(),
            store.clone(),
            Arc::new(ManualProbe::new(online)),
        );
        (Arc::new(coordinator), source, store)
    }

    #[tokio::test]
    async fn test_new_coordinator_is_empty() {
        let (coordinator, _, _) = coordinator(true);
        assert_eq!(coordinator.count_of_news(), 0);
        assert!(coordinator.snapshot().is_empty());
        assert_eq!(coordinator.cursor(), PaginationCursor::new(10));
        assert!(coordinator.fetch_state().failed().is_empty());
    }

    #[tokio::test]
    async fn test_item_at_is_checked() {
        let (coordinator, source, _) = coordinator(true);
        source.set_page(1, &[Item::new(1, 1, "first", "b")]);
        source.set_asset(1, vec![1]);
        coordinator.load_page(true).await;

        assert_eq!(coordinator.item_at(0).unwrap().title, "first");
        assert_eq!(
            coordinator.item_at(1),
            Err(CoordinatorError::IndexOutOfRange { index: 1, len: 1 })
        );
    }

    #[tokio::test]
    async fn test_new_subscriber_gets_latest() {
        let (coordinator, source, _) = coordinator(true);
        source.set_page(1, &[Item::new(1, 1, "a", ""), Item::new(2, 2, "b", "")]);
        coordinator.load_page(true).await;

        let late = coordinator.subscribe();
        assert_eq!(late.borrow().len(), 2);
    }

    #[tokio::test]
    async fn test_spawned_load_publishes() {
        let (coordinator, source, _) = coordinator(true);
        source.set_page(1, &[Item::new(1, 1, "a", "")]);
        let mut rx = coordinator.subscribe();

        let handle = coordinator.spawn_load_page(false);
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().len(), 1);

        let outcome = handle.await.unwrap();
        assert_eq!(outcome.path, LoadPath::Online);
    }
}
