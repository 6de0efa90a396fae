// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Basic feed-sync usage example.
//!
//! Demonstrates:
//! 1. Scripting a remote feed with two pages and a few owner assets
//! 2. Loading page 1 online, then appending page 2
//! 3. Watching snapshots through a subscriber
//! 4. Dropping connectivity and serving the local copy
//!
//! # Run
//!
//! ```bash
//! RUST_LOG=feed_sync=debug cargo run --example basic_usage
//! ```

use std::sync::Arc;
use feed_sync::{
    FeedSyncConfig, InMemoryStore, Item, ManualProbe, MemorySource, SyncCoordinator,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    // ─────────────────────────────────────────────────────────────────────────
    // 1. Script the remote feed
    // ─────────────────────────────────────────────────────────────────────────
    let source = Arc::new(MemorySource::new());
    source.set_page(1, &[
        Item::new(1, 1, "Launch day", "The feed is live."),
        Item::new(2, 2, "Second post", "Still going."),
        Item::new(3, 1, "Follow-up", "Same author, same avatar."),
    ]);
    source.set_page(2, &[Item::new(4, 3, "Page two", "Appended below.")]);
    source.set_asset(1, vec![0x89, 0x50, 0x4E, 0x47]);
    source.set_asset(2, vec![0xFF, 0xD8]);
    // owner 3 has no asset; its record is published without one

    let probe = Arc::new(ManualProbe::new(true));
    let coordinator = Arc::new(SyncCoordinator::new(
        FeedSyncConfig::default(),
        source.clone(),
        Arc::new(InMemoryStore::new()),
        probe.clone(),
    ));

    let mut feed = coordinator.subscribe();
    let watcher = tokio::spawn(async move {
        while feed.changed().await.is_ok() {
            let snapshot = feed.borrow_and_update().clone();
            println!("   ↳ snapshot published: {} records", snapshot.len());
        }
    });

    // ─────────────────────────────────────────────────────────────────────────
    // 2. Online loads
    // ─────────────────────────────────────────────────────────────────────────
    println!("📡 Loading page 1 (reset)...");
    let outcome = coordinator.load_page(true).await;
    println!("   {:?} page {}: {} items, {} assets fetched", outcome.path, outcome.page, outcome.fetched_items, outcome.assets_requested);

    println!("📡 Loading next page...");
    let outcome = coordinator.load_page(false).await;
    println!("   {:?} page {}: {} total records", outcome.path, outcome.page, outcome.published);

    for index in 0..coordinator.count_of_news() {
        let record = coordinator.item_at(index)?;
        let asset = record.asset_bytes.as_ref().map_or(0, Vec::len);
        println!("   [{}] {} ({} asset bytes)", index, record.title, asset);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // 3. Offline load
    // ─────────────────────────────────────────────────────────────────────────
    println!("📴 Going offline...");
    probe.set_online(false);
    let outcome = coordinator.load_page(false).await;
    println!("   {:?}: {} records from local copy, cursor at page {}", outcome.path, outcome.published, coordinator.cursor().target_page());

    drop(coordinator);
    watcher.await?;
    println!("✅ Done");
    Ok(())
}
