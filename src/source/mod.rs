//! Remote feed sources.
//!
//! The [`RemoteSource`] trait is the seam to the concrete transport. A
//! [`MemorySource`] is provided for embedding and tests.

pub mod traits;
pub mod memory;

pub use traits::{decode_items, validate_owner_key, PageRequest, RemoteSource, SourceError};
pub use memory::MemorySource;
