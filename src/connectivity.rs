//! Connectivity probes.
//!
//! The coordinator asks a [`ConnectivityProbe`] before every page load and
//! again before advancing the cursor. Probes must answer quickly; wrap any
//! network-backed probe in a [`TimeoutProbe`] so a hung check reads as
//! offline instead of stalling the load.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use async_trait::async_trait;
use tracing::warn;

#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    async fn is_online(&self) -> bool;
}

#[async_trait]
impl<P: ConnectivityProbe + ?Sized> ConnectivityProbe for Arc<P> {
    async fn is_online(&self) -> bool {
        (**self).is_online().await
    }
}

/// A probe whose answer is set by the host (OS reachability callback,
/// airplane-mode toggle, tests).
#[derive(Debug)]
pub struct ManualProbe {
    online: AtomicBool,
    checks: AtomicU64,
}

impl ManualProbe {
    #[must_use]
    pub fn new(online: bool) -> Self {
        Self {
            online: AtomicBool::new(online),
            checks: AtomicU64::new(0),
        }
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::Release);
    }

    /// Number of times the probe has been asked
    #[must_use]
    pub fn checks(&self) -> u64 {
        self.checks.load(Ordering::Acquire)
    }
}

impl Default for ManualProbe {
    fn default() -> Self {
        Self::new(true)
    }
}

#[async_trait]
impl ConnectivityProbe for ManualProbe {
    async fn is_online(&self) -> bool {
        self.checks.fetch_add(1, Ordering::AcqRel);
        self.online.load(Ordering::Acquire)
    }
}

/// Bounds an inner probe by a deadline. A probe that does not answer in
/// time is reported offline.
pub struct TimeoutProbe<P> {
    inner: P,
    timeout: Duration,
}

impl<P: ConnectivityProbe> TimeoutProbe<P> {
    pub fn new(inner: P, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl<P: ConnectivityProbe> ConnectivityProbe for TimeoutProbe<P> {
    async fn is_online(&self) -> bool {
        match tokio::time::timeout(self.timeout, self.inner.is_online()).await {
            Ok(online) => online,
            Err(_) => {
                warn!(timeout = ?self.timeout, "Connectivity probe timed out, treating as offline");
                crate::metrics::record_probe_timeout();
                false
            }
        }
    }
}
