//! Resilience helpers for local store access.

pub mod retry;

pub use retry::{retry, RetryConfig};
