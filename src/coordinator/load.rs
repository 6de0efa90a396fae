//! Page load: online merge, offline rebuild, asset fan-out.

use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::connectivity::ConnectivityProbe;
use crate::model::{assemble, owner_keys, AssembledRecord, OwnerKey};
use crate::metrics::LatencyTimer;
use crate::source::{PageRequest, RemoteSource};
use crate::storage::traits::LocalStore;

use super::{InFlightGuard, LoadOutcome, LoadPath, SyncCoordinator, SyncError};

/// Settled results of one asset fan-out.
#[derive(Debug, Default, Clone, Copy)]
struct AssetBatch {
    requested: usize,
    failed: usize,
}

impl SyncCoordinator {
    /// Load a page and publish the resulting snapshot.
    ///
    /// `reset` restarts at page 1; otherwise the cursor's next page is used
    /// (page 1 if nothing has loaded yet). Errors never escape: a failed
    /// online load publishes the local copy instead and leaves the cursor
    /// alone.
    #[tracing::instrument(skip(self), fields(page, path))]
    pub async fn load_page(&self, reset: bool) -> LoadOutcome {
        let mut assembled = self.assembled.lock().await;
        let mut timer = LatencyTimer::new("online");

        let page = {
            let mut cursor = self.cursor.write();
            if reset {
                cursor.reset();
            }
            cursor.target_page()
        };
        tracing::Span::current().record("page", page);

        if !self.probe.is_online().await {
            info!(page, "Offline, serving local copy");
            timer.set_path("offline");
            tracing::Span::current().record("path", LoadPath::Offline.as_str());
            return self.rebuild_from_store(&mut assembled, page, LoadPath::Offline).await;
        }

        let outcome = match self.load_online(&mut assembled, page).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(page, error = %e, kind = e.kind(), "Online load failed, serving local copy");
                crate::metrics::record_fallback(e.kind());
                timer.set_path("fallback");
                self.rebuild_from_store(&mut assembled, page, LoadPath::Fallback).await
            }
        };
        tracing::Span::current().record("path", outcome.path.as_str());
        outcome
    }

    async fn load_online(
        &self,
        assembled: &mut Vec<AssembledRecord>,
        page: u32,
    ) -> Result<LoadOutcome, SyncError> {
        let request = PageRequest::new(page, self.config.page_size)?;

        if page == 1 {
            self.store.clear_all().await?;
            assembled.clear();
            info!("Cleared local copy for fresh reload");
        }

        let items = self.remote.fetch_items(request).await?;
        self.store.upsert_items(&items).await?;

        if items.is_empty() {
            info!(page, "Empty page, end of feed");
            self.publish(assembled);
            crate::metrics::record_page_load("online", "end_of_feed");
            return Ok(LoadOutcome::local(page, LoadPath::EndOfFeed, assembled.len()));
        }

        let page_owners = owner_keys(&items);
        let stored = self.store.fetch_assets(&page_owners).await?;
        let needed = self.fetch_state.plan(&page_owners, &stored);
        debug!(page, owners = page_owners.len(), needed = needed.len(), "Planned asset fetches");

        let batch = self.fetch_assets(needed).await;

        let assets = self.store.fetch_assets(&page_owners).await?;
        let records = assemble(&items, &assets);
        if page == 1 {
            *assembled = records;
        } else {
            assembled.extend(records);
        }
        self.publish(assembled);

        // Connectivity can drop mid-load; only advance on a confirmed link.
        let cursor_advanced = self.probe.is_online().await;
        if cursor_advanced {
            self.cursor.write().advance_past(page);
            crate::metrics::set_cursor_page(page.saturating_add(1));
        } else {
            info!(page, "Went offline during load, cursor not advanced");
        }

        info!(
            page,
            items = items.len(),
            published = assembled.len(),
            assets_failed = batch.failed,
            "Page merged"
        );
        crate::metrics::record_page_load("online", "merged");

        Ok(LoadOutcome {
            page,
            path: LoadPath::Online,
            fetched_items: items.len(),
            assets_requested: batch.requested,
            assets_failed: batch.failed,
            published: assembled.len(),
            cursor_advanced,
        })
    }

    /// Replace the cache with the full local copy in id order and publish.
    ///
    /// A failed read keeps the previous cache and republishes it.
    async fn rebuild_from_store(
        &self,
        assembled: &mut Vec<AssembledRecord>,
        page: u32,
        path: LoadPath,
    ) -> LoadOutcome {
        match self.read_local_copy().await {
            Ok(records) => *assembled = records,
            Err(e) => {
                error!(error = %e, "Local copy unreadable, keeping previous snapshot");
            }
        }
        self.publish(assembled);
        crate::metrics::record_page_load(path.as_str(), "published");
        LoadOutcome::local(page, path, assembled.len())
    }

    async fn read_local_copy(&self) -> Result<Vec<AssembledRecord>, SyncError> {
        let items = self.store.fetch_all_items_sorted_by_id().await?;
        let assets = self.store.fetch_assets(&owner_keys(&items)).await?;
        Ok(assemble(&items, &assets))
    }

    /// Fetch assets for `owners` concurrently and wait for every one to settle.
    async fn fetch_assets(&self, owners: BTreeSet<OwnerKey>) -> AssetBatch {
        if owners.is_empty() {
            return AssetBatch::default();
        }

        let requested = owners.len();
        crate::metrics::record_asset_batch(requested);

        let mut join_set: JoinSet<bool> = JoinSet::new();
        for owner_key in owners {
            // Marked before the task starts so a concurrent planner skips it.
            let guard = self.fetch_state.begin(owner_key);
            let remote = Arc::clone(&self.remote);
            let store = Arc::clone(&self.store);
            let permits = Arc::clone(&self.asset_permits);

            join_set.spawn(async move {
                // The semaphore is never closed; a missing permit just runs unbounded.
                let _permit = permits.acquire_owned().await.ok();
                fetch_one(remote, store, guard).await
            });
        }

        let mut failed = 0;
        while let Some(result) = join_set.join_next().await {
            match result {
                Ok(true) => {}
                Ok(false) => failed += 1,
                Err(e) => {
                    // The task's guard already recorded the owner as failed.
                    error!(error = %e, "Asset fetch task aborted");
                    failed += 1;
                }
            }
        }

        crate::metrics::set_failed_owners(self.fetch_state.failed_count());
        AssetBatch { requested, failed }
    }
}

async fn fetch_one(
    remote: Arc<dyn RemoteSource>,
    store: Arc<dyn LocalStore>,
    guard: InFlightGuard,
) -> bool {
    let owner_key = guard.owner_key();
    let result = async {
        let bytes = remote.fetch_asset(owner_key).await?;
        store.upsert_asset(owner_key, &bytes).await?;
        Ok::<(), SyncError>(())
    }
    .await;

    match result {
        Ok(()) => {
            debug!(owner_key, "Asset stored");
            crate::metrics::record_asset_fetch("success");
            guard.succeed();
            true
        }
        Err(e) => {
            warn!(owner_key, error = %e, "Asset fetch failed, will retry on a later load");
            crate::metrics::record_asset_fetch("error");
            guard.fail();
            false
        }
    }
}
