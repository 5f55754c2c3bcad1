//! In-process encode cache for the upload pipeline.
//!
//! Re-encoding a photo (decode, Lanczos3 resample, WebP encode, twice) is the
//! slowest part of an upload. When the same file is selected again in the
//! same session, for example after a failed batch is retried by hand, the
//! previously produced data-URIs are reused instead.
//!
//! ## Cache keys
//!
//! Keys are derived from what the caller can see without reading the file:
//! `(filename, size, last-modified)`. The three values are hashed with
//! SHA-256 into a fixed-length hex key. Content is deliberately not hashed,
//! since that would require reading the whole file on every lookup.
//!
//! ## Bounding
//!
//! Entries are evicted least-recently-used once `capacity` is reached. A
//! capacity of `0` disables eviction, which is only sensible for short-lived
//! processes such as a single CLI upload.

use sha2::{Digest, Sha256};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

/// The encoded representations of one source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedEncoding {
    pub url: String,
    pub thumbnail_url: String,
}

/// SHA-256 cache key of a file's visible identity.
///
/// `modified_ms` is the last-modified time in milliseconds since the epoch.
pub fn cache_key(filename: &str, size: u64, modified_ms: i64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(b"encode\0");
    hasher.update(filename.as_bytes());
    hasher.update(b"\0");
    hasher.update(size.to_le_bytes());
    hasher.update(modified_ms.to_le_bytes());
    format!("{:x}", hasher.finalize())
}

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<String, Arc<CachedEncoding>>,
    /// Recency order, least recent at the front.
    order: VecDeque<String>,
    stats: CacheStats,
}

impl Inner {
    fn touch(&mut self, key: &str) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            self.order.remove(pos);
        }
        self.order.push_back(key.to_string());
    }
}

/// Thread-safe LRU map from [`cache_key`] to encoded data-URIs.
#[derive(Debug)]
pub struct EncodeCache {
    capacity: usize,
    inner: Mutex<Inner>,
}

impl EncodeCache {
    /// Create a cache holding at most `capacity` entries (`0` = unbounded).
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn unbounded() -> Self {
        Self::new(0)
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panic while holding the lock leaves the maps consistent.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Look up an entry, marking it most recently used.
    pub fn get(&self, key: &str) -> Option<Arc<CachedEncoding>> {
        let mut inner = self.lock();
        match inner.entries.get(key).cloned() {
            Some(hit) => {
                inner.touch(key);
                inner.stats.hit();
                Some(hit)
            }
            None => {
                inner.stats.miss();
                None
            }
        }
    }

    /// Insert or replace an entry, evicting the least recently used one if full.
    pub fn insert(&self, key: String, value: CachedEncoding) -> Arc<CachedEncoding> {
        let value = Arc::new(value);
        let mut inner = self.lock();
        inner.entries.insert(key.clone(), Arc::clone(&value));
        inner.touch(&key);

        if self.capacity > 0 {
            while inner.entries.len() > self.capacity {
                let Some(oldest) = inner.order.pop_front() else {
                    break;
                };
                inner.entries.remove(&oldest);
                inner.stats.evict();
            }
        }
        value
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        self.lock().stats
    }
}

impl Default for EncodeCache {
    fn default() -> Self {
        Self::unbounded()
    }
}

/// Summary of cache performance for one process.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u32,
    pub misses: u32,
    pub evictions: u32,
}

impl CacheStats {
    pub fn hit(&mut self) {
        self.hits += 1;
    }

    pub fn miss(&mut self) {
        self.misses += 1;
    }

    pub fn evict(&mut self) {
        self.evictions += 1;
    }

    pub fn total(&self) -> u32 {
        self.hits + self.misses
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hits > 0 {
            write!(
                f,
                "{} cached, {} encoded ({} total)",
                self.hits,
                self.misses,
                self.total()
            )?;
        } else {
            write!(f, "{} encoded", self.misses)?;
        }
        if self.evictions > 0 {
            write!(f, ", {} evicted", self.evictions)?;
        }
        Ok(())
    }
}
