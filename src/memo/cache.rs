//! Result cache for memoized proxies
//!
//! One `OnceCell` per key: the first caller for a key computes, concurrent
//! callers with the same key block on that cell and observe its value.
//! Failed computations leave the cell empty so the next caller retries.

use super::key::{KeyEncoder, MemoKey};
use crate::config::MemoConfig;
use crate::errors::Result;
use crate::interop::Value;
use crate::logging::trace;
use dashmap::DashMap;
use lru::LruCache;
use once_cell::sync::OnceCell;
use parking_lot::{Mutex, RwLock};
use std::num::NonZeroUsize;
use std::sync::Arc;

/// Decides which keys leave the cache
///
/// Consulted after every successful lookup; the primitive never evicts on
/// its own.
pub trait EvictionPolicy: Send {
    /// Record an access to `key`; returns keys to drop
    fn access(&mut self, key: &MemoKey) -> Vec<MemoKey>;

    /// Stop tracking `key`
    fn remove(&mut self, key: &MemoKey);

    fn clear(&mut self);
}

/// LRU eviction policy bounded by entry count
pub struct LruPolicy {
    lru: LruCache<MemoKey, ()>,
}

impl LruPolicy {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            lru: LruCache::new(capacity),
        }
    }
}

impl EvictionPolicy for LruPolicy {
    fn access(&mut self, key: &MemoKey) -> Vec<MemoKey> {
        if self.lru.get(key).is_some() {
            return Vec::new();
        }

        match self.lru.push(key.clone(), ()) {
            Some((evicted, ())) if evicted != *key => vec![evicted],
            _ => Vec::new(),
        }
    }

    fn remove(&mut self, key: &MemoKey) {
        self.lru.pop(key);
    }

    fn clear(&mut self) {
        self.lru.clear();
    }
}

/// Cache statistics for monitoring
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    /// Computations that returned an error (never cached)
    pub failures: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

struct CacheInner {
    entries: DashMap<MemoKey, Arc<OnceCell<Value>>>,
    encoder: KeyEncoder,
    /// `None` means unbounded
    policy: Option<Mutex<Box<dyn EvictionPolicy>>>,
    stats: RwLock<CacheStats>,
}

/// Shared handle to a memoization cache
#[derive(Clone)]
pub struct MemoCache {
    inner: Arc<CacheInner>,
}

impl Default for MemoCache {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoCache {
    /// Unbounded cache
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Cache holding at most `capacity` results, least recently used first out
    pub fn bounded(capacity: NonZeroUsize) -> Self {
        Self::with_policy(LruPolicy::new(capacity))
    }

    pub fn with_policy(policy: impl EvictionPolicy + 'static) -> Self {
        let policy: Box<dyn EvictionPolicy> = Box::new(policy);
        Self::build(Some(Mutex::new(policy)))
    }

    pub fn from_config(config: &MemoConfig) -> Self {
        match config.capacity.and_then(NonZeroUsize::new) {
            Some(capacity) => Self::bounded(capacity),
            None => Self::new(),
        }
    }

    fn build(policy: Option<Mutex<Box<dyn EvictionPolicy>>>) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                entries: DashMap::new(),
                encoder: KeyEncoder,
                policy,
                stats: RwLock::new(CacheStats::default()),
            }),
        }
    }

    #[inline]
    pub fn encoder(&self) -> &KeyEncoder {
        &self.inner.encoder
    }

    /// Cached value for `key`, if computed
    pub fn get(&self, key: &MemoKey) -> Option<Value> {
        self.inner
            .entries
            .get(key)
            .and_then(|entry| entry.value().get().cloned())
    }

    /// Return the cached value for `key`, running `compute` on a miss
    ///
    /// At most one `compute` runs per key at a time. Calling back into the
    /// same cache with the same key from inside `compute` deadlocks.
    pub fn get_or_compute<F>(&self, key: MemoKey, compute: F) -> Result<Value>
    where
        F: FnOnce() -> Result<Value>,
    {
        let cell = self
            .inner
            .entries
            .entry(key.clone())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone();

        let mut computed = false;
        let outcome = cell.get_or_try_init(|| {
            computed = true;
            compute()
        });

        match outcome {
            Ok(value) => {
                let value = value.clone();
                {
                    let mut stats = self.inner.stats.write();
                    if computed {
                        stats.misses += 1;
                    } else {
                        stats.hits += 1;
                    }
                }

                trace!(
                    target: "interpose::memo",
                    key = %key.fingerprint(),
                    hit = !computed,
                    "memo lookup"
                );

                self.touch(&key);
                Ok(value)
            }
            Err(err) => {
                // Drop the empty cell so failing keys do not accumulate
                self.inner
                    .entries
                    .remove_if(&key, |_, current| Arc::ptr_eq(current, &cell) && current.get().is_none());
                self.inner.stats.write().failures += 1;
                Err(err)
            }
        }
    }

    fn touch(&self, key: &MemoKey) {
        let Some(policy) = &self.inner.policy else {
            return;
        };

        let evicted = policy.lock().access(key);
        if evicted.is_empty() {
            return;
        }

        for old in &evicted {
            self.inner.entries.remove(old);
            trace!(target: "interpose::memo", key = %old.fingerprint(), "evicted");
        }
        self.inner.stats.write().evictions += evicted.len() as u64;
    }

    /// Drop the entry for `key`
    pub fn invalidate(&self, key: &MemoKey) -> bool {
        if let Some(policy) = &self.inner.policy {
            policy.lock().remove(key);
        }
        self.inner.entries.remove(key).is_some()
    }

    /// Drop every entry; statistics are kept
    pub fn clear(&self) {
        self.inner.entries.clear();
        if let Some(policy) = &self.inner.policy {
            policy.lock().clear();
        }
    }

    /// Number of computed entries
    pub fn len(&self) -> usize {
        self.inner
            .entries
            .iter()
            .filter(|entry| entry.value().get().is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        *self.inner.stats.read()
    }
}

impl std::fmt::Debug for MemoCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoCache")
            .field("entries", &self.len())
            .field("bounded", &self.inner.policy.is_some())
            .finish()
    }
}
