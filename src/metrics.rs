// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Metrics instrumentation for feed sync.
//!
//! Uses the `metrics` crate for backend-agnostic metrics collection.
//! The host application chooses the exporter (Prometheus, OTEL, etc.)
//!
//! # Metric Naming Convention
//! - `feed_sync_` prefix for all metrics
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Labels
//! - `path`: online, offline, fallback
//! - `outcome`: merged, end_of_feed, published
//! - `status`: success, error

use metrics::{counter, gauge, histogram};
use std::time::{Duration, Instant};

/// Record a completed page load
pub fn record_page_load(path: &str, outcome: &str) {
    counter!(
        "feed_sync_page_loads_total",
        "path" => path.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Record page load latency
pub fn record_load_latency(path: &str, duration: Duration) {
    histogram!(
        "feed_sync_load_seconds",
        "path" => path.to_string()
    )
    .record(duration.as_secs_f64());
}

/// Record an online path failure that was converted to a cache read
pub fn record_fallback(error_kind: &str) {
    counter!(
        "feed_sync_fallbacks_total",
        "error" => error_kind.to_string()
    )
    .increment(1);
}

/// Record one per-owner asset fetch
pub fn record_asset_fetch(status: &str) {
    counter!(
        "feed_sync_asset_fetches_total",
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record fan-out width of one batch
pub fn record_asset_batch(count: usize) {
    histogram!("feed_sync_asset_batch_size").record(count as f64);
}

/// Set number of records currently published
pub fn set_assembled_records(count: usize) {
    gauge!("feed_sync_assembled_records").set(count as f64);
}

/// Set number of owners waiting for an asset retry
pub fn set_failed_owners(count: usize) {
    gauge!("feed_sync_failed_owners").set(count as f64);
}

/// Set next page the cursor will request
pub fn set_cursor_page(page: u32) {
    gauge!("feed_sync_cursor_page").set(f64::from(page));
}

/// Record a connectivity probe that hit its deadline
pub fn record_probe_timeout() {
    counter!("feed_sync_probe_timeouts_total").increment(1);
}

/// Latency timer that records on drop
pub struct LatencyTimer {
    path: &'static str,
    start: Instant,
}

impl LatencyTimer {
    #[must_use]
    pub fn new(path: &'static str) -> Self {
        Self {
            path,
            start: Instant::now(),
        }
    }

    /// Relabel the timer once the taken path is known
    pub fn set_path(&mut self, path: &'static str) {
        self.path = path;
    }
}

impl Drop for LatencyTimer {
    fn drop(&mut self) {
        record_load_latency(self.path, self.start.elapsed());
    }
}
