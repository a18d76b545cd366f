//! In-memory LRU cache for transformed images.
//!
//! The cache tracks the total size of cached images in bytes and evicts
//! least-recently-used entries when the capacity is exceeded.

use std::num::NonZeroUsize;

use async_trait::async_trait;
use bytes::Bytes;
use lru::LruCache;
use tokio::sync::RwLock;

use super::TransformCache;
use crate::error::CacheError;

/// Default cache capacity: 100MB
pub const DEFAULT_CACHE_CAPACITY: usize = 100 * 1024 * 1024;

/// Default maximum number of entries (to bound LRU overhead)
const DEFAULT_MAX_ENTRIES: usize = 10_000;

/// LRU cache for transformed images with size-based capacity.
///
/// # Example
///
/// ```
/// use bitblt::cache::{MemoryCache, TransformCache};
/// use bytes::Bytes;
///
/// #[tokio::main]
/// async fn main() {
///     let cache = MemoryCache::new();
///     let key = "/images/bitblt-64xNone-abc/photo.jpg";
///
///     cache.put(key, Bytes::from_static(b"resized")).await.unwrap();
///     assert_eq!(cache.get(key).await.unwrap(), Some(Bytes::from_static(b"resized")));
/// }
/// ```
pub struct MemoryCache {
    /// The underlying LRU cache
    cache: RwLock<LruCache<String, Bytes>>,

    /// Maximum total size in bytes
    max_size: usize,

    /// Current total size in bytes
    current_size: RwLock<usize>,
}

impl MemoryCache {
    /// Create a cache with default capacity (100MB).
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }

    /// Create a cache with the specified capacity in bytes.
    pub fn with_capacity(max_size: usize) -> Self {
        Self::with_capacity_and_entries(max_size, DEFAULT_MAX_ENTRIES)
    }

    /// Create a cache with specified capacity and maximum entries.
    ///
    /// A `max_entries` of zero is treated as one.
    pub fn with_capacity_and_entries(max_size: usize, max_entries: usize) -> Self {
        Self {
            cache: RwLock::new(LruCache::new(
                NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN),
            )),
            max_size,
            current_size: RwLock::new(0),
        }
    }

    /// Check if a key is cached without updating LRU order.
    pub async fn contains(&self, key: &str) -> bool {
        self.cache.read().await.contains(key)
    }

    /// Remove an entry, returning its data if it existed.
    pub async fn remove(&self, key: &str) -> Option<Bytes> {
        let mut cache = self.cache.write().await;
        let mut current_size = self.current_size.write().await;

        let data = cache.pop(key)?;
        *current_size = current_size.saturating_sub(data.len());
        Some(data)
    }

    /// Clear all entries.
    pub async fn clear(&self) {
        let mut cache = self.cache.write().await;
        let mut current_size = self.current_size.write().await;
        cache.clear();
        *current_size = 0;
    }

    /// Number of cached images.
    pub async fn len(&self) -> usize {
        self.cache.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.cache.read().await.is_empty()
    }

    /// Current total size of cached images in bytes.
    pub async fn size(&self) -> usize {
        *self.current_size.read().await
    }

    /// Maximum capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.max_size
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TransformCache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, CacheError> {
        // LRU reads reorder entries, so they need the write lock
        let mut cache = self.cache.write().await;
        Ok(cache.get(key).cloned())
    }

    async fn put(&self, key: &str, data: Bytes) -> Result<(), CacheError> {
        let data_size = data.len();
        let mut cache = self.cache.write().await;
        let mut current_size = self.current_size.write().await;

        // `push` hands back either the old value for this key or the entry
        // evicted by the entry-count bound
        if let Some((_, displaced)) = cache.push(key.to_string(), data) {
            *current_size = current_size.saturating_sub(displaced.len());
        }
        *current_size += data_size;

        while *current_size > self.max_size {
            match cache.pop_lru() {
                Some((_, evicted)) => {
                    *current_size = current_size.saturating_sub(evicted.len());
                }
                None => break,
            }
        }

        Ok(())
    }
}
