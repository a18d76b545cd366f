//! Directory-backed cache.
//!
//! Each entry is one file named by the hex SHA-256 of its key. Writes land in
//! a uniquely named temporary file first and are renamed into place, so a
//! reader never observes a partial entry.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use sha2::{Digest, Sha256};
use tokio::fs;
use tracing::debug;

use super::TransformCache;
use crate::error::CacheError;

/// Cache storing one file per transformed image.
#[derive(Debug)]
pub struct DiskCache {
    root: PathBuf,
    sequence: AtomicU64,
}

impl DiskCache {
    /// Use `root` as the cache directory. It is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            sequence: AtomicU64::new(0),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the file holding `key`.
    pub fn entry_path(&self, key: &str) -> PathBuf {
        self.root.join(hex::encode(Sha256::digest(key.as_bytes())))
    }

    fn temp_path(&self, entry: &Path) -> PathBuf {
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        let mut name = entry.as_os_str().to_owned();
        name.push(format!(".{}.{}.tmp", std::process::id(), seq));
        PathBuf::from(name)
    }
}

#[async_trait]
impl TransformCache for DiskCache {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, CacheError> {
        match fs::read(self.entry_path(key)).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, key: &str, data: Bytes) -> Result<(), CacheError> {
        fs::create_dir_all(&self.root).await?;

        let entry = self.entry_path(key);
        let temp = self.temp_path(&entry);

        if let Err(e) = fs::write(&temp, &data).await {
            let _ = fs::remove_file(&temp).await;
            return Err(e.into());
        }
        if let Err(e) = fs::rename(&temp, &entry).await {
            let _ = fs::remove_file(&temp).await;
            return Err(e.into());
        }

        debug!(key = %key, path = %entry.display(), bytes = data.len(), "Stored cache entry");
        Ok(())
    }
}
