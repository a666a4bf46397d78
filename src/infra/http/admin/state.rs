use std::sync::Arc;

use crate::application::repos::StoreHealth;
use crate::cache::PageCache;

#[derive(Clone)]
pub struct AdminState {
    /// Absent when the page cache is disabled.
    pub cache: Option<Arc<PageCache>>,
    pub store: Arc<dyn StoreHealth>,
}
