//! Bounded, time-limited store of rendered pages.
//!
//! Entries are never refreshed by writes elsewhere in the application: a
//! stored page is served verbatim until its TTL lapses or the cache is
//! cleared. Expiry is checked lazily on lookup.

use std::sync::RwLock;
use std::time::Duration;

use bytes::Bytes;
use lru::LruCache;
use metrics::counter;
use tokio::time::Instant;
use tracing::debug;

use super::config::PageCacheConfig;
use super::keys::PageKey;
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";

pub const METRIC_HIT: &str = "yatube_page_cache_hit_total";
pub const METRIC_MISS: &str = "yatube_page_cache_miss_total";
pub const METRIC_STORE: &str = "yatube_page_cache_store_total";
pub const METRIC_EXPIRED: &str = "yatube_page_cache_expired_total";
pub const METRIC_EVICT: &str = "yatube_page_cache_evict_total";
pub const METRIC_CLEAR: &str = "yatube_page_cache_clear_total";

/// Response captured for replay.
#[derive(Debug, Clone)]
pub struct CachedResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

struct Entry {
    response: CachedResponse,
    stored_at: Instant,
}

pub struct PageCache {
    entries: RwLock<LruCache<PageKey, Entry>>,
    ttl: Duration,
}

impl PageCache {
    pub fn new(config: &PageCacheConfig) -> Self {
        Self {
            entries: RwLock::new(LruCache::new(config.capacity_non_zero())),
            ttl: config.ttl,
        }
    }

    /// Fetch a live entry. Expired entries are dropped and reported as misses.
    pub fn get(&self, key: &PageKey) -> Option<CachedResponse> {
        let mut entries = rw_write(&self.entries, SOURCE, "get");

        let expired = match entries.get(key) {
            Some(entry) if entry.stored_at.elapsed() < self.ttl => {
                counter!(METRIC_HIT).increment(1);
                return Some(entry.response.clone());
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            entries.pop(key);
            counter!(METRIC_EXPIRED).increment(1);
            debug!(target = SOURCE, path = %key.path, "page cache entry expired");
        }
        counter!(METRIC_MISS).increment(1);
        None
    }

    pub fn put(&self, key: PageKey, response: CachedResponse) {
        let entry = Entry {
            response,
            stored_at: Instant::now(),
        };
        let evicted = rw_write(&self.entries, SOURCE, "put").push(key.clone(), entry);
        counter!(METRIC_STORE).increment(1);

        // `push` also returns the old value when the key was already present.
        if let Some((evicted_key, _)) = evicted
            && evicted_key != key
        {
            counter!(METRIC_EVICT).increment(1);
        }
    }

    /// Drop every stored page, returning how many were removed.
    pub fn clear(&self) -> usize {
        let mut entries = rw_write(&self.entries, SOURCE, "clear");
        let removed = entries.len();
        entries.clear();
        counter!(METRIC_CLEAR).increment(1);
        removed
    }

    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
