//! Transcoded-image cache.
//!
//! Entries are keyed by the blake3 hash of the original URL plus the
//! destination extension. Nothing expires.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::config::{CacheConfig, default_cache_dir};
use crate::format::ImageFormat;
use crate::utils::hash::url_key;
use crate::{debug, log};

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache directory `{}` is not writable", .0.display())]
    Unwritable(PathBuf, #[source] io::Error),

    #[error("failed to write cache entry `{key}`")]
    Write {
        key: String,
        #[source]
        source: io::Error,
    },
}

/// `<blake3-hex(original)>.<ext>`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(original: &str, format: &ImageFormat) -> Self {
        Self(format!("{}.{}", url_key(original), format.extension()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

pub trait CacheStore: Send + Sync {
    fn get(&self, key: &CacheKey) -> Option<Vec<u8>>;
    fn put(&self, key: &CacheKey, bytes: &[u8]) -> Result<(), CacheError>;
}

// ============================================================================
// DiskCache
// ============================================================================

/// One file per entry. Writes land in a temp file that is renamed into
/// place, so readers never observe a partial entry.
#[derive(Debug)]
pub struct DiskCache {
    dir: PathBuf,
}

impl DiskCache {
    /// Create `dir` if needed and make sure it accepts writes.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| CacheError::Unwritable(dir.clone(), e))?;
        NamedTempFile::new_in(&dir).map_err(|e| CacheError::Unwritable(dir.clone(), e))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(key.as_str())
    }
}

impl CacheStore for DiskCache {
    fn get(&self, key: &CacheKey) -> Option<Vec<u8>> {
        fs::read(self.entry_path(key)).ok()
    }

    fn put(&self, key: &CacheKey, bytes: &[u8]) -> Result<(), CacheError> {
        let write_err = |source| CacheError::Write {
            key: key.to_string(),
            source,
        };

        let mut tmp = NamedTempFile::new_in(&self.dir).map_err(write_err)?;
        tmp.write_all(bytes).map_err(write_err)?;
        tmp.persist(self.entry_path(key))
            .map_err(|e| write_err(e.error))?;
        Ok(())
    }
}

// ============================================================================
// MemoryCache
// ============================================================================

/// Process-local store, used when no directory is usable and in tests.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<FxHashMap<CacheKey, Vec<u8>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl CacheStore for MemoryCache {
    fn get(&self, key: &CacheKey) -> Option<Vec<u8>> {
        self.entries.read().get(key).cloned()
    }

    fn put(&self, key: &CacheKey, bytes: &[u8]) -> Result<(), CacheError> {
        self.entries.write().insert(key.clone(), bytes.to_vec());
        Ok(())
    }
}

// ============================================================================
// Selection
// ============================================================================

/// Open the configured store.
///
/// Order: `[cache].dir`, then the per-user cache directory, then memory.
pub fn open_store(config: &CacheConfig) -> Option<Arc<dyn CacheStore>> {
    if !config.enable {
        debug!("cache"; "disabled by configuration");
        return None;
    }

    if let Some(dir) = &config.dir {
        match DiskCache::open(dir) {
            Ok(cache) => return Some(disk_store(cache)),
            Err(e) => log!("warning"; "{e}, falling back to the default cache directory"),
        }
    }

    match default_cache_dir().map(DiskCache::open) {
        Some(Ok(cache)) => Some(disk_store(cache)),
        Some(Err(e)) => {
            log!("warning"; "{e}, caching in memory");
            Some(Arc::new(MemoryCache::new()))
        }
        None => {
            log!("warning"; "no cache directory on this platform, caching in memory");
            Some(Arc::new(MemoryCache::new()))
        }
    }
}

fn disk_store(cache: DiskCache) -> Arc<dyn CacheStore> {
    debug!("cache"; "{}", cache.dir().display());
    Arc::new(cache)
}
