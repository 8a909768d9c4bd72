use std::sync::Arc;

use async_trait::async_trait;

use super::types::{SearchQuery, SearchResult, SuggestQuery, Suggestion};
use crate::client::ApiClient;
use crate::config::SearchSettings;
use crate::error::{ApiError, Domain};

/// Shortest query sent to the suggest endpoint.
pub const MIN_SUGGEST_CHARS: usize = 2;

#[async_trait]
pub trait SearchApi: Send + Sync {
    async fn search(&self, query: &SearchQuery) -> Result<SearchResult, ApiError>;
    /// Empty, without a request, for queries under [`MIN_SUGGEST_CHARS`].
    async fn suggest(&self, query: &SuggestQuery) -> Result<Vec<Suggestion>, ApiError>;
}

#[derive(Debug, Clone)]
pub struct HttpSearchApi {
    client: Arc<ApiClient>,
    settings: SearchSettings,
}

impl HttpSearchApi {
    pub fn new(client: Arc<ApiClient>, settings: SearchSettings) -> Self {
        Self { client, settings }
    }
}

#[async_trait]
impl SearchApi for HttpSearchApi {
    async fn search(&self, query: &SearchQuery) -> Result<SearchResult, ApiError> {
        let mut query = query.clone();
        let requested = query.limit.filter(|limit| *limit > 0);
        query.limit = Some(self.settings.clamp_limit(requested));
        self.client
            .get_with_query(Domain::Search, "/search", Some(&query.to_params()))
            .await
    }

    async fn suggest(&self, query: &SuggestQuery) -> Result<Vec<Suggestion>, ApiError> {
        if query.q.chars().count() < MIN_SUGGEST_CHARS {
            return Ok(Vec::new());
        }
        let mut params = vec![("q", query.q.clone())];
        if let Some(limit) = query.limit.filter(|limit| *limit > 0) {
            params.push(("limit", limit.min(self.settings.max_limit).to_string()));
        }
        self.client
            .get_with_query(Domain::Search, "/search/suggest", Some(&params))
            .await
    }
}
