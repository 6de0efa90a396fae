// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! SQL storage backend for the durable feed copy.
//!
//! Two tables, one per identity:
//! ```sql
//! CREATE TABLE feed_items (
//!   id BIGINT PRIMARY KEY,
//!   owner_key BIGINT NOT NULL,
//!   title TEXT NOT NULL,
//!   body TEXT NOT NULL
//! )
//! CREATE TABLE feed_assets (
//!   owner_key BIGINT PRIMARY KEY,
//!   bytes MEDIUMBLOB NOT NULL  -- BLOB on SQLite
//! )
//! ```
//!
//! Multi-row writes (`upsert_items`, `clear_all`) run in one transaction so
//! readers never observe a half-applied page or a half-cleared store.
//!
//! ## sqlx Any Driver Quirks
//!
//! MySQL TEXT columns come back as bytes through the `Any` driver, so text
//! fields are read as `String` first and fall back to UTF-8 decoded `Vec<u8>`.

use std::collections::{BTreeSet, HashMap};
use std::sync::Once;
use std::time::Duration;
use async_trait::async_trait;
use sqlx::{AnyPool, Row, any::{AnyPoolOptions, AnyRow}};
use tracing::debug;
use crate::model::{Item, OwnerKey};
use super::traits::{LocalStore, StorageError};
use crate::resilience::retry::{retry, RetryConfig};

// SQLx `Any` driver requires runtime installation
static INSTALL_DRIVERS: Once = Once::new();

fn install_drivers() {
    INSTALL_DRIVERS.call_once(|| {
        sqlx::any::install_default_drivers();
    });
}

fn backend(e: sqlx::Error) -> StorageError {
    StorageError::Backend(e.to_string())
}

pub struct SqlStore {
    pool: AnyPool,
    is_sqlite: bool,
}

impl SqlStore {
    /// Create a new SQL store with startup-mode retry (fails fast if config is wrong).
    pub async fn new(connection_string: &str) -> Result<Self, StorageError> {
        install_drivers();

        let is_sqlite = connection_string.starts_with("sqlite:");

        let pool = retry("sql_connect", &RetryConfig::startup(), || async {
            AnyPoolOptions::new()
                .max_connections(if is_sqlite { 4 } else { 10 })
                .acquire_timeout(Duration::from_secs(10))
                .idle_timeout(Duration::from_secs(300))
                .connect(connection_string)
                .await
                .map_err(backend)
        })
        .await?;

        let store = Self { pool, is_sqlite };

        if is_sqlite {
            store.enable_wal_mode().await?;
        }

        store.init_schema().await?;
        Ok(store)
    }

    /// Get a clone of the connection pool.
    pub fn pool(&self) -> AnyPool {
        self.pool.clone()
    }

    async fn enable_wal_mode(&self) -> Result<(), StorageError> {
        sqlx::query("PRAGMA journal_mode = WAL")
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Backend(format!("Failed to enable WAL mode: {}", e)))?;

        sqlx::query("PRAGMA synchronous = NORMAL")
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Backend(format!("Failed to set synchronous mode: {}", e)))?;

        Ok(())
    }

    async fn init_schema(&self) -> Result<(), StorageError> {
        let statements: [&str; 2] = if self.is_sqlite {
            [
                r#"
                CREATE TABLE IF NOT EXISTS feed_items (
                    id INTEGER PRIMARY KEY,
                    owner_key INTEGER NOT NULL,
                    title TEXT NOT NULL,
                    body TEXT NOT NULL
                )
                "#,
                r#"
                CREATE TABLE IF NOT EXISTS feed_assets (
                    owner_key INTEGER PRIMARY KEY,
                    bytes BLOB NOT NULL
                )
                "#,
            ]
        } else {
            [
                r#"
                CREATE TABLE IF NOT EXISTS feed_items (
                    id BIGINT PRIMARY KEY,
                    owner_key BIGINT NOT NULL,
                    title TEXT NOT NULL,
                    body TEXT NOT NULL,
                    INDEX idx_owner_key (owner_key)
                )
                "#,
                r#"
                CREATE TABLE IF NOT EXISTS feed_assets (
                    owner_key BIGINT PRIMARY KEY,
                    bytes MEDIUMBLOB NOT NULL
                )
                "#,
            ]
        };

        for sql in statements {
            retry("sql_init_schema", &RetryConfig::startup(), || async {
                sqlx::query(sql)
                    .execute(&self.pool)
                    .await
                    .map_err(backend)
            })
            .await?;
        }

        Ok(())
    }

    fn upsert_item_sql(&self) -> &'static str {
        if self.is_sqlite {
            "INSERT INTO feed_items (id, owner_key, title, body) VALUES (?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                owner_key = excluded.owner_key,
                title = excluded.title,
                body = excluded.body"
        } else {
            "INSERT INTO feed_items (id, owner_key, title, body) VALUES (?, ?, ?, ?)
             ON DUPLICATE KEY UPDATE
                owner_key = VALUES(owner_key),
                title = VALUES(title),
                body = VALUES(body)"
        }
    }

    fn upsert_asset_sql(&self) -> &'static str {
        if self.is_sqlite {
            "INSERT INTO feed_assets (owner_key, bytes) VALUES (?, ?)
             ON CONFLICT(owner_key) DO UPDATE SET bytes = excluded.bytes"
        } else {
            "INSERT INTO feed_assets (owner_key, bytes) VALUES (?, ?)
             ON DUPLICATE KEY UPDATE bytes = VALUES(bytes)"
        }
    }

    /// Read a text column as String (SQLite) or UTF-8 bytes (MySQL).
    fn text_column(row: &AnyRow, column: &str) -> Result<String, StorageError> {
        if let Ok(value) = row.try_get::<String, _>(column) {
            return Ok(value);
        }
        let bytes: Vec<u8> = row.try_get(column).map_err(backend)?;
        String::from_utf8(bytes).map_err(|e| StorageError::Corruption {
            key: column.to_string(),
            detail: e.to_string(),
        })
    }

    fn item_from_row(row: &AnyRow) -> Result<Item, StorageError> {
        Ok(Item {
            id: row.try_get("id").map_err(backend)?,
            owner_key: row.try_get("owner_key").map_err(backend)?,
            title: Self::text_column(row, "title")?,
            body: Self::text_column(row, "body")?,
        })
    }

    /// Count stored items.
    pub async fn count_items(&self) -> Result<u64, StorageError> {
        let row = sqlx::query("SELECT COUNT(*) as cnt FROM feed_items")
            .fetch_one(&self.pool)
            .await
            .map_err(backend)?;
        let count: i64 = row.try_get("cnt").map_err(backend)?;
        Ok(count as u64)
    }
}

#[async_trait]
impl LocalStore for SqlStore {
    #[tracing::instrument(skip(self, items), fields(count = items.len()))]
    async fn upsert_items(&self, items: &[Item]) -> Result<(), StorageError> {
        if items.is_empty() {
            return Ok(());
        }
        let sql = self.upsert_item_sql();

        retry("sql_upsert_items", &RetryConfig::query(), || async {
            let mut tx = self.pool.begin().await.map_err(backend)?;
            for item in items {
                sqlx::query(sql)
                    .bind(item.id)
                    .bind(item.owner_key)
                    .bind(&item.title)
                    .bind(&item.body)
                    .execute(&mut *tx)
                    .await
                    .map_err(backend)?;
            }
            tx.commit().await.map_err(backend)
        })
        .await?;

        debug!(count = items.len(), "Items upserted");
        Ok(())
    }

    async fn upsert_asset(&self, owner_key: OwnerKey, bytes: &[u8]) -> Result<(), StorageError> {
        let sql = self.upsert_asset_sql();
        retry("sql_upsert_asset", &RetryConfig::query(), || async {
            sqlx::query(sql)
                .bind(owner_key)
                .bind(bytes.to_vec())
                .execute(&self.pool)
                .await
                .map_err(backend)?;
            Ok(())
        })
        .await
    }

    async fn fetch_all_items_sorted_by_id(&self) -> Result<Vec<Item>, StorageError> {
        let rows = retry("sql_fetch_items", &RetryConfig::query(), || async {
            sqlx::query("SELECT id, owner_key, title, body FROM feed_items ORDER BY id ASC")
                .fetch_all(&self.pool)
                .await
                .map_err(backend)
        })
        .await?;

        rows.iter().map(Self::item_from_row).collect()
    }

    async fn fetch_assets(&self, owner_keys: &BTreeSet<OwnerKey>) -> Result<HashMap<OwnerKey, Vec<u8>>, StorageError> {
        if owner_keys.is_empty() {
            return Ok(HashMap::new());
        }

        // Stay well under the bound-parameter limits (SQLite 32766, MySQL 65535)
        const CHUNK_SIZE: usize = 500;

        let keys: Vec<OwnerKey> = owner_keys.iter().copied().collect();
        let mut assets = HashMap::with_capacity(keys.len());

        for chunk in keys.chunks(CHUNK_SIZE) {
            let placeholders: Vec<&str> = chunk.iter().map(|_| "?").collect();
            let sql = format!(
                "SELECT owner_key, bytes FROM feed_assets WHERE owner_key IN ({})",
                placeholders.join(", ")
            );

            let rows = retry("sql_fetch_assets", &RetryConfig::query(), || async {
                let mut query = sqlx::query(&sql);
                for key in chunk {
                    query = query.bind(*key);
                }
                query.fetch_all(&self.pool).await.map_err(backend)
            })
            .await?;

            for row in rows {
                let owner_key: i64 = row.try_get("owner_key").map_err(backend)?;
                let bytes: Vec<u8> = row.try_get("bytes").map_err(backend)?;
                assets.insert(owner_key, bytes);
            }
        }
        Ok(assets)
    }

    #[tracing::instrument(skip(self))]
    async fn clear_all(&self) -> Result<(), StorageError> {
        retry("sql_clear_all", &RetryConfig::query(), || async {
            let mut tx = self.pool.begin().await.map_err(backend)?;
            sqlx::query("DELETE FROM feed_items")
                .execute(&mut *tx)
                .await
                .map_err(backend)?;
            sqlx::query("DELETE FROM feed_assets")
                .execute(&mut *tx)
                .await
                .map_err(backend)?;
            tx.commit().await.map_err(backend)
        })
        .await
    }
}
