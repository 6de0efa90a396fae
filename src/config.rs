//! Configuration for the feed sync coordinator.
//!
//! # Example
//!
//! ```
//! use feed_sync::FeedSyncConfig;
//!
//! // Minimal config (uses defaults)
//! let config = FeedSyncConfig::default();
//! assert_eq!(config.page_size, 10);
//!
//! // From a host's settings file
//! let config: FeedSyncConfig = serde_json::from_str(
//!     r#"{"page_size": 25, "sql_url": "sqlite://feed.db?mode=rwc"}"#
//! ).unwrap();
//! assert_eq!(config.page_size, 25);
//! assert_eq!(config.probe_timeout_ms, 1500);
//! ```

use std::time::Duration;
use serde::Deserialize;

/// Configuration for the feed sync coordinator.
///
/// All fields have defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedSyncConfig {
    /// Items requested per page (default: 10)
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Deadline for one connectivity check in milliseconds (default: 1500)
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,

    /// Max asset fetches running at once per page load (default: 8, 0 is treated as 1)
    #[serde(default = "default_asset_fetch_concurrency")]
    pub asset_fetch_concurrency: usize,

    /// SQL connection string for the durable copy (e.g., "sqlite://feed.db?mode=rwc")
    #[serde(default)]
    pub sql_url: Option<String>,
}

fn default_page_size() -> u32 { 10 }
fn default_probe_timeout_ms() -> u64 { 1500 }
fn default_asset_fetch_concurrency() -> usize { 8 }

impl Default for FeedSyncConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            probe_timeout_ms: default_probe_timeout_ms(),
            asset_fetch_concurrency: default_asset_fetch_concurrency(),
            sql_url: None,
        }
    }
}

impl FeedSyncConfig {
    #[must_use]
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    /// Fan-out bound, never below one
    #[must_use]
    pub fn effective_asset_concurrency(&self) -> usize {
        self.asset_fetch_concurrency.max(1)
    }
}
