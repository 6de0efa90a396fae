use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use crate::model::{Item, OwnerKey};
use super::traits::{decode_items, validate_owner_key, PageRequest, RemoteSource, SourceError};

/// Scripted in-process remote source.
///
/// Pages are held as raw JSON bodies and decoded on every fetch, so a
/// malformed body surfaces as [`SourceError::Decode`] exactly as a real
/// transport would. Pages never scripted read as empty (end of feed).
pub struct MemorySource {
    pages: DashMap<u32, Vec<u8>>,
    assets: DashMap<OwnerKey, Vec<u8>>,
    failing_assets: DashSet<OwnerKey>,
    offline: AtomicBool,
    asset_delay: Option<Duration>,
    item_fetches: AtomicU64,
    asset_fetches: DashMap<OwnerKey, u64>,
    active_asset_fetches: AtomicUsize,
    peak_asset_fetches: AtomicUsize,
}

impl MemorySource {
    #[must_use]
    pub fn new() -> Self {
        Self {
            pages: DashMap::new(),
            assets: DashMap::new(),
            failing_assets: DashSet::new(),
            offline: AtomicBool::new(false),
            asset_delay: None,
            item_fetches: AtomicU64::new(0),
            asset_fetches: DashMap::new(),
            active_asset_fetches: AtomicUsize::new(0),
            peak_asset_fetches: AtomicUsize::new(0),
        }
    }

    /// Hold each asset fetch open for `delay` (observes fan-out width)
    #[must_use]
    pub fn with_asset_delay(mut self, delay: Duration) -> Self {
        self.asset_delay = Some(delay);
        self
    }

    pub fn set_page(&self, page: u32, items: &[Item]) {
        let body = serde_json::to_vec(items).unwrap_or_default();
        self.pages.insert(page, body);
    }

    /// Script a raw response body for `page`
    pub fn set_page_body(&self, page: u32, body: impl Into<Vec<u8>>) {
        self.pages.insert(page, body.into());
    }

    pub fn set_asset(&self, owner_key: OwnerKey, bytes: impl Into<Vec<u8>>) {
        self.assets.insert(owner_key, bytes.into());
    }

    /// Make every fetch fail with a transport error
    pub fn set_unreachable(&self, unreachable: bool) {
        self.offline.store(unreachable, Ordering::SeqCst);
    }

    pub fn fail_asset(&self, owner_key: OwnerKey) {
        self.failing_assets.insert(owner_key);
    }

    pub fn heal_asset(&self, owner_key: OwnerKey) {
        self.failing_assets.remove(&owner_key);
    }

    #[must_use]
    pub fn item_fetches(&self) -> u64 {
        self.item_fetches.load(Ordering::SeqCst)
    }

    /// Number of asset fetches attempted for `owner_key`
    #[must_use]
    pub fn asset_fetches(&self, owner_key: OwnerKey) -> u64 {
        self.asset_fetches.get(&owner_key).map(|r| *r.value()).unwrap_or(0)
    }

    #[must_use]
    pub fn total_asset_fetches(&self) -> u64 {
        self.asset_fetches.iter().map(|r| *r.value()).sum()
    }

    /// Highest number of asset fetches observed running at once
    #[must_use]
    pub fn peak_concurrent_asset_fetches(&self) -> usize {
        self.peak_asset_fetches.load(Ordering::SeqCst)
    }

    fn check_reachable(&self) -> Result<(), SourceError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(SourceError::Transport("remote unreachable".into()));
        }
        Ok(())
    }
}

impl Default for MemorySource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteSource for MemorySource {
    async fn fetch_items(&self, request: PageRequest) -> Result<Vec<Item>, SourceError> {
        self.item_fetches.fetch_add(1, Ordering::SeqCst);
        self.check_reachable()?;

        let Some(body) = self.pages.get(&request.page).map(|r| r.value().clone()) else {
            return Ok(Vec::new());
        };
        let mut items = decode_items(&body)?;
        items.truncate(request.limit as usize);
        Ok(items)
    }

    async fn fetch_asset(&self, owner_key: OwnerKey) -> Result<Vec<u8>, SourceError> {
        validate_owner_key(owner_key)?;
        *self.asset_fetches.entry(owner_key).or_insert(0) += 1;

        let active = self.active_asset_fetches.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_asset_fetches.fetch_max(active, Ordering::SeqCst);
        if let Some(delay) = self.asset_delay {
            tokio::time::sleep(delay).await;
        }
        self.active_asset_fetches.fetch_sub(1, Ordering::SeqCst);

        self.check_reachable()?;
        if self.failing_assets.contains(&owner_key) {
            return Err(SourceError::Transport(format!("asset {} unavailable", owner_key)));
        }
        self.assets
            .get(&owner_key)
            .map(|r| r.value().clone())
            .ok_or_else(|| SourceError::Transport(format!("asset {} not found", owner_key)))
    }
}
