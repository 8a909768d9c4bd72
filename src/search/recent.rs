//! Recently used search queries, persisted locally.

use std::sync::Arc;

use crate::storage::LocalStorage;

/// Storage key holding the JSON array of queries.
pub const RECENT_SEARCHES_KEY: &str = "wsoptv_recent_searches";

pub const MAX_RECENT_SEARCHES: usize = 10;

/// Most-recent-first, de-duplicated list of at most
/// [`MAX_RECENT_SEARCHES`] queries.
#[derive(Clone)]
pub struct RecentSearches {
    storage: Arc<dyn LocalStorage>,
}

impl std::fmt::Debug for RecentSearches {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecentSearches").finish_non_exhaustive()
    }
}

impl RecentSearches {
    pub fn new(storage: Arc<dyn LocalStorage>) -> Self {
        Self { storage }
    }

    /// Stored queries; unreadable data reads as empty.
    pub fn load(&self) -> Vec<String> {
        match self.storage.get(RECENT_SEARCHES_KEY) {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|error| {
                tracing::warn!(error = %error, "Discarding unreadable recent searches");
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(error) => {
                tracing::warn!(error = %error, "Failed to read recent searches");
                Vec::new()
            }
        }
    }

    /// Move `query` (trimmed) to the front and return the new list.
    /// Blank queries are ignored.
    pub fn add(&self, query: &str) -> Vec<String> {
        let trimmed = query.trim();
        let mut searches = self.load();
        if trimmed.is_empty() {
            return searches;
        }
        searches.retain(|existing| existing != trimmed);
        searches.insert(0, trimmed.to_string());
        searches.truncate(MAX_RECENT_SEARCHES);

        match serde_json::to_string(&searches) {
            Ok(raw) => {
                if let Err(error) = self.storage.set(RECENT_SEARCHES_KEY, &raw) {
                    tracing::warn!(error = %error, "Failed to save recent searches");
                }
            }
            Err(error) => tracing::warn!(error = %error, "Failed to encode recent searches"),
        }
        searches
    }

    pub fn clear(&self) {
        if let Err(error) = self.storage.remove(RECENT_SEARCHES_KEY) {
            tracing::warn!(error = %error, "Failed to clear recent searches");
        }
    }
}
