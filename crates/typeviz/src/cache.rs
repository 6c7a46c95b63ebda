//! Bounded content cache for rendered diagrams.
//!
//! [`LruCache`] keeps at most `max_size` entries in a [`Storage`] medium and
//! evicts the least recently used one when full. The access-order index lives
//! in the same medium, so a file-backed cache survives restarts.

mod lru;
mod storage;

pub use lru::LruCache;
pub use storage::{FileStorage, MemoryStorage, Storage, StorageError};

use thiserror::Error;

/// Errors returned by [`LruCache`] operations.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache storage failed: {0}")]
    Storage(#[from] StorageError),

    #[error("invalid cache index: {0}")]
    Index(#[source] serde_json::Error),
}
