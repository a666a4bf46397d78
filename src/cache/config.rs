//! Page cache configuration.

use std::num::NonZeroUsize;
use std::time::Duration;

const DEFAULT_PAGE_TTL_SECS: u64 = 20;
const DEFAULT_RESPONSE_LIMIT: usize = 200;

#[derive(Debug, Clone)]
pub struct PageCacheConfig {
    pub enabled: bool,
    /// How long a stored page is served before it is rendered again.
    pub ttl: Duration,
    /// Maximum number of stored pages; least recently used entries go first.
    pub capacity: usize,
}

impl Default for PageCacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl: Duration::from_secs(DEFAULT_PAGE_TTL_SECS),
            capacity: DEFAULT_RESPONSE_LIMIT,
        }
    }
}

impl From<&crate::config::CacheSettings> for PageCacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enabled: settings.enable_page_cache,
            ttl: settings.page_ttl,
            capacity: settings.response_limit.get(),
        }
    }
}

impl PageCacheConfig {
    /// Capacity as `NonZeroUsize`, clamping zero to one.
    pub fn capacity_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.capacity).unwrap_or(NonZeroUsize::MIN)
    }
}
