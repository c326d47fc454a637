//! Memoized slice-file decoding.
//!
//! Decoding is a pure function of the file's bytes, so a decoded document can
//! be reused for as long as the file is unchanged. Documents are cached by
//! path and modification time: rewriting a file under the same name produces
//! a new key and the stale entry simply ages out of the LRU.

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use lru::LruCache;
use tokio::sync::RwLock;
use tracing::{debug, trace};

use crate::error::FileError;
use crate::format::{decode, SliceDocument};

/// Default number of decoded documents kept in memory.
pub const DEFAULT_SLICE_CACHE_ENTRIES: usize = 64;

/// Identifies one version of a file on disk.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SliceCacheKey {
    pub path: PathBuf,
    pub modified: SystemTime,
}

/// LRU cache of decoded slice files.
///
/// Thread-safe; share it across tasks via `Arc`.
pub struct SliceCache {
    cache: RwLock<LruCache<SliceCacheKey, Arc<SliceDocument>>>,
}

impl SliceCache {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_SLICE_CACHE_ENTRIES)
    }

    /// Create a cache holding at most `entries` documents (minimum 1).
    pub fn with_capacity(entries: usize) -> Self {
        let capacity = NonZeroUsize::new(entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: RwLock::new(LruCache::new(capacity)),
        }
    }

    /// Look up a document, marking it as recently used.
    pub async fn get(&self, key: &SliceCacheKey) -> Option<Arc<SliceDocument>> {
        let mut cache = self.cache.write().await;
        cache.get(key).cloned()
    }

    pub async fn put(&self, key: SliceCacheKey, document: Arc<SliceDocument>) {
        let mut cache = self.cache.write().await;
        cache.put(key, document);
    }

    pub async fn len(&self) -> usize {
        self.cache.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.cache.read().await.is_empty()
    }

    pub async fn clear(&self) {
        self.cache.write().await.clear();
    }

    /// Decode the slice file at `path`, reusing a cached document if the file
    /// has not been modified since it was last decoded.
    ///
    /// `name` names the file in errors (usually the path relative to the
    /// files directory).
    pub async fn load(&self, path: &Path, name: &str) -> Result<Arc<SliceDocument>, FileError> {
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| FileError::from_io(e, name))?;
        if !metadata.is_file() {
            return Err(FileError::NotAFile(name.to_string()));
        }
        let modified = metadata
            .modified()
            .map_err(|e| FileError::from_io(e, name))?;

        let key = SliceCacheKey {
            path: path.to_path_buf(),
            modified,
        };

        if let Some(document) = self.get(&key).await {
            trace!(file = %name, "Slice cache hit");
            return Ok(document);
        }

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| FileError::from_io(e, name))?;
        let document = Arc::new(decode(&bytes)?);
        debug!(
            file = %name,
            layers = document.layer_count,
            "Decoded slice file"
        );

        self.put(key, Arc::clone(&document)).await;
        Ok(document)
    }
}

impl Default for SliceCache {
    fn default() -> Self {
        Self::new()
    }
}
