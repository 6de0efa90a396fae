use std::collections::{BTreeSet, HashMap};
use async_trait::async_trait;
use crate::model::{Item, OwnerKey};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("Storage backend error: {0}")]
    Backend(String),
    #[error("Data corruption detected for '{key}': {detail}")]
    Corruption {
        key: String,
        detail: String,
    },
}

/// Durable local copy of the feed.
///
/// Items are keyed by id, assets by owner key. Implementations serialize
/// their own writes; no torn read or write may be observable to callers.
#[async_trait]
pub trait LocalStore: Send + Sync {
    /// Insert or overwrite items by id.
    async fn upsert_items(&self, items: &[Item]) -> Result<(), StorageError>;

    /// Insert or overwrite the asset for `owner_key`.
    async fn upsert_asset(&self, owner_key: OwnerKey, bytes: &[u8]) -> Result<(), StorageError>;

    /// Every stored item, ascending by id.
    async fn fetch_all_items_sorted_by_id(&self) -> Result<Vec<Item>, StorageError>;

    /// Assets for the requested owners. Owners without an asset are absent
    /// from the map; an empty request returns an empty map.
    async fn fetch_assets(&self, owner_keys: &BTreeSet<OwnerKey>) -> Result<HashMap<OwnerKey, Vec<u8>>, StorageError>;

    /// Remove all items and assets.
    async fn clear_all(&self) -> Result<(), StorageError>;
}
