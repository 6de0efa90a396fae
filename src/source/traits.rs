use async_trait::async_trait;
use thiserror::Error;
use crate::model::{Item, OwnerKey};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    #[error("Transport failure: {0}")]
    Transport(String),
    #[error("Malformed response: {0}")]
    Decode(String),
    #[error("Invalid request parameters: {0}")]
    UrlConstruction(String),
}

/// A validated page request (1-based page, non-zero limit).
///
/// # Example
///
/// ```
/// use feed_sync::source::PageRequest;
///
/// let req = PageRequest::new(2, 10).unwrap();
/// assert_eq!(req.offset(), 10);
/// assert!(PageRequest::new(0, 10).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    pub fn new(page: u32, limit: u32) -> Result<Self, SourceError> {
        if page == 0 {
            return Err(SourceError::UrlConstruction("page must be >= 1".into()));
        }
        if limit == 0 {
            return Err(SourceError::UrlConstruction("limit must be >= 1".into()));
        }
        // offset must stay representable for index-based backends
        if u64::from(page - 1) * u64::from(limit) > i64::MAX as u64 {
            return Err(SourceError::UrlConstruction(format!(
                "page {} with limit {} overflows offset",
                page, limit
            )));
        }
        Ok(Self { page, limit })
    }

    /// Zero-based index of the first item on this page
    #[must_use]
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }
}

/// Remote feed backend.
///
/// Implementations must return an error (never an empty list) when the
/// request or response fails.
#[async_trait]
pub trait RemoteSource: Send + Sync {
    async fn fetch_items(&self, request: PageRequest) -> Result<Vec<Item>, SourceError>;
    async fn fetch_asset(&self, owner_key: OwnerKey) -> Result<Vec<u8>, SourceError>;
}

/// Decode a page body in the remote wire shape.
pub fn decode_items(body: &[u8]) -> Result<Vec<Item>, SourceError> {
    serde_json::from_slice(body).map_err(|e| SourceError::Decode(e.to_string()))
}

/// Reject owner keys no asset endpoint can address.
pub fn validate_owner_key(owner_key: OwnerKey) -> Result<(), SourceError> {
    if owner_key < 0 {
        return Err(SourceError::UrlConstruction(format!(
            "owner key {} is negative",
            owner_key
        )));
    }
    Ok(())
}
