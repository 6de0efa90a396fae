//! Feed data model.
//!
//! [`Item`]s and their owners' asset bytes are the durable units kept by a
//! [`LocalStore`](crate::storage::traits::LocalStore), which addresses
//! assets as `(OwnerKey, bytes)` pairs. An [`AssembledRecord`] is the read
//! model handed to consumers: an item joined with its owner's asset.
//!
//! Assets are keyed by owner, not by item, so every item sharing an owner
//! shares one asset.

use std::collections::{BTreeSet, HashMap};
use serde::{Deserialize, Serialize};

/// Owner key grouping many items under one shared asset.
pub type OwnerKey = i64;

/// A feed entry as returned by the remote source.
///
/// Serialized in the remote wire shape (`userId` for the owner key).
///
/// # Example
///
/// ```
/// use feed_sync::Item;
///
/// let item: Item = serde_json::from_str(
///     r#"{"userId": 3, "id": 21, "title": "t", "body": "b"}"#
/// ).unwrap();
/// assert_eq!(item.owner_key, 3);
/// assert_eq!(item.id, 21);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Unique item identity
    pub id: i64,
    #[serde(rename = "userId")]
    pub owner_key: OwnerKey,
    pub title: String,
    pub body: String,
}

impl Item {
    pub fn new(id: i64, owner_key: OwnerKey, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id,
            owner_key,
            title: title.into(),
            body: body.into(),
        }
    }
}

/// An item joined with its owner's asset, if one is stored.
///
/// Never persisted; recomputed on every merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledRecord {
    pub owner_key: OwnerKey,
    pub title: String,
    pub body: String,
    pub asset_bytes: Option<Vec<u8>>,
}

impl AssembledRecord {
    /// Check whether an asset was joined in
    #[must_use]
    pub fn has_asset(&self) -> bool {
        self.asset_bytes.is_some()
    }
}

/// Distinct owner keys referenced by `items`.
#[must_use]
pub fn owner_keys(items: &[Item]) -> BTreeSet<OwnerKey> {
    items.iter().map(|item| item.owner_key).collect()
}

/// Join items with assets, preserving item order.
///
/// Items whose owner has no entry in `assets` get `asset_bytes: None`.
#[must_use]
pub fn assemble(items: &[Item], assets: &HashMap<OwnerKey, Vec<u8>>) -> Vec<AssembledRecord> {
    items
        .iter()
        .map(|item| AssembledRecord {
            owner_key: item.owner_key,
            title: item.title.clone(),
            body: item.body.clone(),
            asset_bytes: assets.get(&item.owner_key).cloned(),
        })
        .collect()
}
