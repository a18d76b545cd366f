//! Storage for transformed images.
//!
//! A cache entry is keyed by the request path as received, directive segment
//! included, so the key alone determines both the source image and the target
//! size. Values are the transformed bytes.
//!
//! Backends:
//! - [`MemoryCache`]: in-process LRU bounded by total byte size
//! - [`DiskCache`]: one file per entry in a directory

mod disk;
mod memory;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::CacheError;

pub use disk::DiskCache;
pub use memory::{MemoryCache, DEFAULT_CACHE_CAPACITY};

/// Read-through store for transformed images.
///
/// A `put` followed by a `get` for the same key must return the stored bytes
/// unchanged. Concurrent `put`s for one key may race; the last writer wins.
#[async_trait]
pub trait TransformCache: Send + Sync {
    /// Look up a transformed image.
    async fn get(&self, key: &str) -> Result<Option<Bytes>, CacheError>;

    /// Store a transformed image.
    async fn put(&self, key: &str, data: Bytes) -> Result<(), CacheError>;
}
