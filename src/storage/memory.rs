use std::collections::{BTreeMap, BTreeSet, HashMap};
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use crate::model::{Item, OwnerKey};
use super::traits::{LocalStore, StorageError};

/// In-process [`LocalStore`].
///
/// Items live in a `BTreeMap` so the full read is already id-ordered.
/// Assets go in a `DashMap`. `clear_all` takes the item write lock for the
/// whole reset so no reader sees items cleared but assets still present.
pub struct InMemoryStore {
    items: RwLock<BTreeMap<i64, Item>>,
    assets: DashMap<OwnerKey, Vec<u8>>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            items: RwLock::new(BTreeMap::new()),
            assets: DashMap::new(),
        }
    }

    /// Get current item count
    #[must_use]
    pub fn item_count(&self) -> usize {
        self.items.read().len()
    }

    /// Get current asset count
    #[must_use]
    pub fn asset_count(&self) -> usize {
        self.assets.len()
    }

    /// Check if empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty() && self.assets.is_empty()
    }

    #[must_use]
    pub fn has_asset(&self, owner_key: OwnerKey) -> bool {
        self.assets.contains_key(&owner_key)
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LocalStore for InMemoryStore {
    async fn upsert_items(&self, items: &[Item]) -> Result<(), StorageError> {
        let mut stored = self.items.write();
        for item in items {
            stored.insert(item.id, item.clone());
        }
        Ok(())
    }

    async fn upsert_asset(&self, owner_key: OwnerKey, bytes: &[u8]) -> Result<(), StorageError> {
        self.assets.insert(owner_key, bytes.to_vec());
        Ok(())
    }

    async fn fetch_all_items_sorted_by_id(&self) -> Result<Vec<Item>, StorageError> {
        Ok(self.items.read().values().cloned().collect())
    }

    async fn fetch_assets(&self, owner_keys: &BTreeSet<OwnerKey>) -> Result<HashMap<OwnerKey, Vec<u8>>, StorageError> {
        Ok(owner_keys
            .iter()
            .filter_map(|key| self.assets.get(key).map(|r| (*key, r.value().clone())))
            .collect())
    }

    async fn clear_all(&self) -> Result<(), StorageError> {
        let mut items = self.items.write();
        items.clear();
        self.assets.clear();
        Ok(())
    }
}
