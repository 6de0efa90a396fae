//! # Feed Sync
//!
//! Offline-first sync for a paginated remote feed whose items share
//! per-owner image assets.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     SyncCoordinator                         │
//! │  • load_page(reset): one page per call, serialized          │
//! │  • Pagination cursor, assembled cache, snapshot channel     │
//! └─────────────────────────────────────────────────────────────┘
//!          │                    │                    │
//!          ▼                    ▼                    ▼
//! ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────┐
//! │  RemoteSource   │  │   LocalStore    │  │  Connectivity   │
//! │ • pages         │  │ • items by id   │  │ • is_online()   │
//! │ • owner assets  │  │ • assets/owner  │  │ • bounded wait  │
//! └─────────────────┘  └─────────────────┘  └─────────────────┘
//!          ▲
//!          │  (bounded fan-out, one fetch per owner)
//! ┌─────────────────────────────────────────────────────────────┐
//! │  FetchCoordinationState: in-flight + failed owner sets      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Online loads fetch the page, store it, fetch missing owner assets, and
//! merge into the published snapshot (page 1 replaces, later pages append).
//! Offline loads, and online loads that fail, rebuild the snapshot from the
//! local copy in item id order.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use feed_sync::{FeedSyncConfig, SyncCoordinator, MemorySource, ManualProbe};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = FeedSyncConfig {
//!         sql_url: Some("sqlite://feed.db?mode=rwc".into()),
//!         ..Default::default()
//!     };
//!
//!     let coordinator = SyncCoordinator::open(
//!         config,
//!         Arc::new(MemorySource::new()),
//!         Arc::new(ManualProbe::new(true)),
//!     )
//!     .await
//!     .expect("Failed to open local store");
//!
//!     coordinator.load_page(true).await;
//!     for index in 0..coordinator.count_of_news() {
//!         let record = coordinator.item_at(index).unwrap();
//!         println!("{}: {}", record.owner_key, record.title);
//!     }
//! }
//! ```
//!
//! ## Modules
//!
//! - [`coordinator`]: the [`SyncCoordinator`] and per-owner fetch state
//! - [`source`]: remote source trait and in-memory source
//! - [`storage`]: local store trait, in-memory and SQL backends
//! - [`connectivity`]: connectivity probes
//! - [`resilience`]: retry with backoff for store access

pub mod config;
pub mod model;
pub mod source;
pub mod storage;
pub mod connectivity;
pub mod resilience;
pub mod coordinator;
pub mod metrics;

pub use config::FeedSyncConfig;
pub use model::{Item, AssembledRecord, OwnerKey};
pub use coordinator::{
    SyncCoordinator, Snapshot, PaginationCursor, LoadPath, LoadOutcome, SyncError,
    CoordinatorError, FetchCoordinationState,
};
pub use source::{RemoteSource, SourceError, PageRequest, MemorySource};
pub use storage::traits::{LocalStore, StorageError};
pub use storage::memory::InMemoryStore;
pub use storage::sql::SqlStore;
pub use connectivity::{ConnectivityProbe, ManualProbe, TimeoutProbe};
pub use resilience::retry::RetryConfig;
pub use metrics::LatencyTimer;
