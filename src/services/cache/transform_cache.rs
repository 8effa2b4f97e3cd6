use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};
use std::time::Instant;

use log::debug;
use lru::LruCache;
use serde::Serialize;

pub const DEFAULT_MAX_ENTRIES: usize = 100;

static TRANSFORM_CACHE: OnceLock<Arc<TransformCache>> = OnceLock::new();

/// A transformed file body keyed by its source path.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub content: Arc<str>,
    pub size: usize,
    pub last_access: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub entries: usize,
    pub total_bytes: usize,
}

struct CacheState {
    entries: LruCache<PathBuf, CacheEntry>,
    total_bytes: usize,
}

/// Bounded cache of transformed code, evicting least-recently used first.
///
/// Every operation takes the one internal lock, so eviction triggered by
/// the resource monitor is serialized with in-flight transforms.
pub struct TransformCache {
    state: Mutex<CacheState>,
}

impl TransformCache {
    pub fn new(max_entries: usize) -> Self {
        let cap = NonZeroUsize::new(max_entries.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            state: Mutex::new(CacheState {
                entries: LruCache::new(cap),
                total_bytes: 0,
            }),
        }
    }

    /// Process-wide instance, created with the default bound on first use.
    pub fn global() -> Arc<TransformCache> {
        Arc::clone(TRANSFORM_CACHE.get_or_init(|| Arc::new(Self::new(DEFAULT_MAX_ENTRIES))))
    }

    /// Install the process-wide instance with a custom bound. Returns
    /// `false` if it was already initialized.
    pub fn init_global(max_entries: usize) -> bool {
        TRANSFORM_CACHE
            .set(Arc::new(Self::new(max_entries)))
            .is_ok()
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        // A panic mid-operation leaves the map itself consistent.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn capacity(&self) -> usize {
        self.lock().entries.cap().get()
    }

    /// Hit refreshes the entry's recency and access time.
    pub fn get(&self, key: &Path) -> Option<Arc<str>> {
        let mut state = self.lock();
        let entry = state.entries.get_mut(key)?;
        entry.last_access = Instant::now();
        Some(Arc::clone(&entry.content))
    }

    /// Insert or replace. A full cache evicts its oldest entry first.
    pub fn put(&self, key: PathBuf, content: impl Into<Arc<str>>) {
        let content: Arc<str> = content.into();
        let size = content.len();
        let mut state = self.lock();

        let displaced = state.entries.push(
            key,
            CacheEntry {
                content,
                size,
                last_access: Instant::now(),
            },
        );
        state.total_bytes += size;
        if let Some((old_key, old)) = displaced {
            state.total_bytes = state.total_bytes.saturating_sub(old.size);
            debug!("[TransformCache] displaced {}", old_key.display());
        }
    }

    pub fn contains(&self, key: &Path) -> bool {
        self.lock().entries.contains(key)
    }

    /// Remove the single least-recently used entry.
    pub fn evict_oldest(&self) -> Option<PathBuf> {
        let mut state = self.lock();
        let (key, entry) = state.entries.pop_lru()?;
        state.total_bytes = state.total_bytes.saturating_sub(entry.size);
        Some(key)
    }

    /// Remove `ceil(entries * percent / 100)` oldest entries. Returns how
    /// many were removed.
    pub fn evict_percentage(&self, percent: u8) -> usize {
        let percent = percent.min(100) as usize;
        let mut state = self.lock();
        let count = (state.entries.len() * percent).div_ceil(100);

        let mut removed = 0;
        while removed < count {
            match state.entries.pop_lru() {
                Some((_, entry)) => {
                    state.total_bytes = state.total_bytes.saturating_sub(entry.size);
                    removed += 1;
                }
                None => break,
            }
        }
        if removed > 0 {
            debug!(
                "[TransformCache] evicted {removed} entries ({percent}%), {} left",
                state.entries.len()
            );
        }
        removed
    }

    pub fn clear_all(&self) {
        let mut state = self.lock();
        state.entries.clear();
        state.total_bytes = 0;
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.lock();
        CacheStats {
            entries: state.entries.len(),
            total_bytes: state.total_bytes,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }
}

impl Default for TransformCache {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES)
    }
}

#[cfg(test)]
#[path = "tests/transform_cache_tests.rs"]
mod tests;
