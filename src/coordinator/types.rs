//! Public types for the sync coordinator.

use thiserror::Error;
use crate::source::SourceError;
use crate::storage::traits::StorageError;

/// Which page the coordinator requests next.
///
/// Mutated only after a successful online fetch-and-merge, or reset to
/// page 1 on an explicit reset request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationCursor {
    /// `None` until the first reset or successful load
    pub next_page: Option<u32>,
    pub page_size: u32,
}

impl PaginationCursor {
    #[must_use]
    pub fn new(page_size: u32) -> Self {
        Self {
            next_page: None,
            page_size,
        }
    }

    /// Page a load should request, defaulting to 1 when unset
    #[must_use]
    pub fn target_page(&self) -> u32 {
        self.next_page.unwrap_or(1)
    }

    pub fn reset(&mut self) {
        self.next_page = Some(1);
    }

    /// Move past a page that merged successfully
    pub fn advance_past(&mut self, page: u32) {
        self.next_page = Some(page.saturating_add(1));
    }
}

/// How a page load was served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPath {
    /// Fetched from remote and merged
    Online,
    /// Remote returned an empty page; nothing merged
    EndOfFeed,
    /// Probe reported offline; rebuilt from the local store
    Offline,
    /// Online path failed; rebuilt from the local store
    Fallback,
}

impl LoadPath {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::EndOfFeed => "end_of_feed",
            Self::Offline => "offline",
            Self::Fallback => "fallback",
        }
    }
}

impl std::fmt::Display for LoadPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Diagnostics for one page load. Callers observe data through the
/// snapshot channel; this is for logging and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOutcome {
    pub page: u32,
    pub path: LoadPath,
    /// Items returned by the remote for this page
    pub fetched_items: usize,
    /// Asset fetches launched in this load's fan-out
    pub assets_requested: usize,
    pub assets_failed: usize,
    /// Length of the published snapshot
    pub published: usize,
    pub cursor_advanced: bool,
}

impl LoadOutcome {
    pub(super) fn local(page: u32, path: LoadPath, published: usize) -> Self {
        Self {
            page,
            path,
            fetched_items: 0,
            assets_requested: 0,
            assets_failed: 0,
            published,
            cursor_advanced: false,
        }
    }
}

/// Failure inside the online path. Never escapes `load_page`; it selects
/// the fallback read instead.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error("Persistence failure: {0}")]
    Storage(#[from] StorageError),
}

impl SyncError {
    /// Short label for metrics
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Source(SourceError::Transport(_)) => "transport",
            Self::Source(SourceError::Decode(_)) => "decode",
            Self::Source(SourceError::UrlConstruction(_)) => "url_construction",
            Self::Storage(_) => "persistence",
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoordinatorError {
    #[error("Index {index} out of range for {len} records")]
    IndexOutOfRange { index: usize, len: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_defaults_to_first_page() {
        let cursor = PaginationCursor::new(10);
        assert_eq!(cursor.next_page, None);
        assert_eq!(cursor.target_page(), 1);
    }

    #[test]
    fn test_cursor_advance_and_reset() {
        let mut cursor = PaginationCursor::new(10);
        cursor.advance_past(1);
        cursor.advance_past(2);
        assert_eq!(cursor.target_page(), 3);

        cursor.reset();
        assert_eq!(cursor.target_page(), 1);

        cursor.advance_past(u32::MAX);
        assert_eq!(cursor.target_page(), u32::MAX);
    }

    #[test]
    fn test_load_path_display() {
        assert_eq!(format!("{}", LoadPath::Online), "online");
        assert_eq!(format!("{}", LoadPath::EndOfFeed), "end_of_feed");
        assert_eq!(format!("{}", LoadPath::Fallback), "fallback");
    }

    #[test]
    fn test_sync_error_kind() {
        let err: SyncError = SourceError::Decode("bad".into()).into();
        assert_eq!(err.kind(), "decode");
        let err: SyncError = StorageError::Backend("locked".into()).into();
        assert_eq!(err.kind(), "persistence");
        assert_eq!(err.to_string(), "Persistence failure: Storage backend error: locked");
    }

    #[test]
    fn test_index_error_display() {
        let err = CoordinatorError::IndexOutOfRange { index: 5, len: 2 };
        assert_eq!(err.to_string(), "Index 5 out of range for 2 records");
    }
}
