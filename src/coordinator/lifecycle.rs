//! Coordinator construction from configuration.

use std::sync::Arc;
use tracing::{info, warn};

use crate::config::FeedSyncConfig;
use crate::connectivity::ConnectivityProbe;
use crate::source::RemoteSource;
use crate::storage::memory::InMemoryStore;
use crate::storage::sql::SqlStore;
use crate::storage::traits::{LocalStore, StorageError};

use super::SyncCoordinator;

impl SyncCoordinator {
    /// Build a coordinator, opening the local store named by `config.sql_url`.
    ///
    /// Without a SQL URL the local copy is in-memory and does not survive a
    /// restart. The initial snapshot is empty until the first page load.
    #[tracing::instrument(skip_all, fields(has_sql = config.sql_url.is_some()))]
    pub async fn open(
        config: FeedSyncConfig,
        remote: Arc<dyn RemoteSource>,
        probe: Arc<dyn ConnectivityProbe>,
    ) -> Result<Self, StorageError> {
        let store: Arc<dyn LocalStore> = match config.sql_url {
            Some(ref sql_url) => {
                info!(url = %sql_url, "Opening SQL local store");
                Arc::new(SqlStore::new(sql_url).await?)
            }
            None => {
                warn!("No SQL URL configured, local copy will not survive restart");
                Arc::new(InMemoryStore::new())
            }
        };

        info!(
            page_size = config.page_size,
            asset_fetch_concurrency = config.effective_asset_concurrency(),
            probe_timeout_ms = config.probe_timeout_ms,
            "Feed sync coordinator ready"
        );
        Ok(Self::new(config, remote, store, probe))
    }
}
