//! Whole-page response cache.
//!
//! The home listing is stored per (path, query, viewer) for a fixed TTL:
//!
//! ```toml
//! [cache]
//! enable_page_cache = true
//! page_ttl_seconds = 20
//! response_limit = 200
//! ```
//!
//! Writes never invalidate stored pages; only expiry or [`PageCache::clear`]
//! (exposed on the admin listener) does.

mod config;
mod keys;
mod lock;
mod middleware;
mod store;

pub use config::PageCacheConfig;
pub use keys::PageKey;
pub use middleware::{PageCacheState, page_cache_layer};
pub use store::{
    CachedResponse, METRIC_CLEAR, METRIC_EVICT, METRIC_EXPIRED, METRIC_HIT, METRIC_MISS,
    METRIC_STORE, PageCache,
};
