//! Bounded LRU cache from request fingerprint to parsed payload.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use lru::LruCache;
use once_cell::sync::Lazy;
use parking_lot::Mutex;

use crate::client::fingerprint::RequestFingerprint;
use crate::model::types::SearchPayload;

/// Default number of cached responses.
pub const DEFAULT_CACHE_CAPACITY: usize = 128;

/// Cache statistics for monitoring.
#[derive(Debug, Default)]
pub struct CacheStats {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    pub evictions: AtomicU64,
}

impl CacheStats {
    /// Current stats as a tuple: (hits, misses, evictions).
    pub fn get(&self) -> (u64, u64, u64) {
        (
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
            self.evictions.load(Ordering::Relaxed),
        )
    }

    /// Hit rate in the range 0.0 - 1.0.
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }
}

/// Capacity-bounded response cache.
///
/// Construct one per client, or hand several clients
/// [`ResponseCache::shared`] for a process-wide cache. Entries leave only
/// under capacity pressure or an explicit [`clear`](Self::clear); there is
/// no TTL. Lookups are structural: a request hits only when its full
/// fingerprint matches.
pub struct ResponseCache {
    entries: Mutex<LruCache<RequestFingerprint, Arc<SearchPayload>>>,
    stats: CacheStats,
}

static SHARED: Lazy<Arc<ResponseCache>> =
    Lazy::new(|| Arc::new(ResponseCache::new(DEFAULT_CACHE_CAPACITY)));

impl ResponseCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN),
            )),
            stats: CacheStats::default(),
        }
    }

    /// The process-wide cache shared by every client that opts in.
    pub fn shared() -> Arc<Self> {
        Arc::clone(&SHARED)
    }

    pub fn get(&self, fingerprint: &RequestFingerprint) -> Option<Arc<SearchPayload>> {
        let mut entries = self.entries.lock();
        if let Some(payload) = entries.get(fingerprint) {
            self.stats.hits.fetch_add(1, Ordering::Relaxed);
            Some(Arc::clone(payload))
        } else {
            self.stats.misses.fetch_add(1, Ordering::Relaxed);
            None
        }
    }

    /// Insert a payload, returning the shared handle now held by the cache.
    /// Two racing writers for the same fingerprint resolve last-write-wins.
    pub fn insert(
        &self,
        fingerprint: RequestFingerprint,
        payload: SearchPayload,
    ) -> Arc<SearchPayload> {
        let payload = Arc::new(payload);
        let mut entries = self.entries.lock();
        if let Some((evicted, _)) = entries.push(fingerprint.clone(), Arc::clone(&payload))
            && evicted != fingerprint
        {
            self.stats.evictions.fetch_add(1, Ordering::Relaxed);
        }
        payload
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }
}
