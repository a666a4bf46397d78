//! Page cache keys.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::domain::entities::UserId;

/// Identifies one stored rendering: the route, its query string and the
/// viewer it was rendered for (anonymous viewers share `None`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageKey {
    pub path: String,
    pub query_hash: u64,
    pub viewer: Option<UserId>,
}

impl PageKey {
    pub fn new(path: impl Into<String>, query: &str, viewer: Option<UserId>) -> Self {
        Self {
            path: path.into(),
            query_hash: hash_query(query),
            viewer,
        }
    }
}

fn hash_query(query: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    query.hash(&mut hasher);
    hasher.finish()
}
