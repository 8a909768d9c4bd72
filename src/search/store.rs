use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::api::SearchApi;
use super::recent::RecentSearches;
use super::types::{SearchFilters, SearchQuery, SearchResult, SearchState, SuggestQuery};
use crate::blocks::ids;
use crate::config::SearchSettings;
use crate::error::{ApiError, Domain, ErrorCode};
use crate::recovery::{self, FallbackStrategy, Resilience};
use crate::util::{Debouncer, ResponseCache};

/// Full-text search, suggestions and recent queries.
///
/// The debounced variants take `self: &Arc<Self>` because the delayed call
/// outlives the caller's borrow.
pub struct SearchStore {
    api: Arc<dyn SearchApi>,
    recent: RecentSearches,
    cache: ResponseCache,
    settings: SearchSettings,
    resilience: Arc<Resilience>,
    state: watch::Sender<SearchState>,
    search_debouncer: Debouncer,
    suggest_debouncer: Debouncer,
}

impl std::fmt::Debug for SearchStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchStore")
            .field("settings", &self.settings)
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

impl SearchStore {
    pub fn new(
        api: Arc<dyn SearchApi>,
        recent: RecentSearches,
        cache: ResponseCache,
        settings: SearchSettings,
        resilience: Arc<Resilience>,
    ) -> Self {
        let (state, _) = watch::channel(SearchState::default());
        Self {
            api,
            recent,
            cache,
            search_debouncer: Debouncer::new(settings.debounce()),
            suggest_debouncer: Debouncer::new(settings.suggest_debounce()),
            settings,
            resilience,
            state,
        }
    }

    pub fn state(&self) -> SearchState {
        self.state.borrow().clone()
    }

    pub fn watch_state(&self) -> watch::Receiver<SearchState> {
        self.state.subscribe()
    }

    /// Load recent searches from storage.
    pub fn initialize(&self) {
        let recent = self.recent.load();
        self.state.send_modify(|state| state.recent_searches = recent);
    }

    /// Run a search. Without explicit filters the store's current filters
    /// apply.
    ///
    /// When the index is failing, the last good result for the same query
    /// is served instead, if one is recent enough.
    pub async fn search(&self, query: SearchQuery) -> Result<(), ApiError> {
        let mut query = query;
        if query.filters.is_none() {
            let filters = self.state.borrow().filters.clone();
            query.filters = (!filters.is_empty()).then_some(filters);
        }
        self.state.send_modify(|state| {
            state.is_loading = true;
            state.error = None;
            state.query = query.q.clone();
        });

        let key = query.cache_key();
        let result = self
            .resilience
            .run(Domain::Search, ids::SEARCH_SEARCH, || self.api.search(&query))
            .await;

        match result {
            Ok(result) => {
                self.cache.set(&key, &result);
                self.apply(result);
                self.record(&query.q);
                Ok(())
            }
            Err(error) => {
                // An open circuit on the index is served like the failures that opened it.
                let fallback = error.code == ErrorCode::BlockUnavailable
                    || recovery::lookup(error.code).strategy == FallbackStrategy::FallbackCache;
                if fallback {
                    let stale = std::time::Duration::from_millis(self.settings.fallback_stale_ms);
                    if let Some(cached) = self.cache.get::<SearchResult>(&key, stale) {
                        tracing::warn!(code = %error.code, q = %query.q, "Serving last good search result");
                        self.apply(cached);
                        return Ok(());
                    }
                }
                let stored = error.clone();
                self.state.send_modify(|state| {
                    state.error = Some(stored);
                    state.is_loading = false;
                });
                Err(error)
            }
        }
    }

    /// [`search`](Self::search) after the configured quiet interval; only the
    /// last call within the interval runs.
    pub fn search_debounced(self: &Arc<Self>, query: SearchQuery) -> JoinHandle<bool> {
        let store = Arc::clone(self);
        self.search_debouncer.call(async move {
            if let Err(error) = store.search(query).await {
                tracing::debug!(error = %error, "Debounced search failed");
            }
        })
    }

    /// Fetch suggestions. Short queries and failures both leave an empty list.
    pub async fn suggest(&self, q: &str, limit: Option<u32>) {
        if q.chars().count() < self.settings.min_chars {
            self.state.send_modify(|state| state.suggestions.clear());
            return;
        }
        self.state.send_modify(|state| state.is_suggest_loading = true);

        let query = SuggestQuery {
            q: q.to_string(),
            limit: Some(limit.unwrap_or(self.settings.max_suggestions)),
        };
        let suggestions = self.api.suggest(&query).await.unwrap_or_else(|error| {
            tracing::debug!(error = %error, "Suggestions unavailable");
            Vec::new()
        });
        self.state.send_modify(|state| {
            state.suggestions = suggestions;
            state.is_suggest_loading = false;
        });
    }

    pub fn suggest_debounced(self: &Arc<Self>, q: impl Into<String>, limit: Option<u32>) -> JoinHandle<bool> {
        let store = Arc::clone(self);
        let q = q.into();
        self.suggest_debouncer
            .call(async move { store.suggest(&q, limit).await })
    }

    /// Edit the current filters in place.
    pub fn set_filter(&self, update: impl FnOnce(&mut SearchFilters)) {
        self.state.send_modify(|state| update(&mut state.filters));
    }

    pub fn clear_filters(&self) {
        self.state
            .send_modify(|state| state.filters = SearchFilters::default());
    }

    pub fn set_page(&self, page: u32) {
        self.state.send_modify(|state| state.page = page);
    }

    pub fn add_recent_search(&self, query: &str) {
        self.record(query);
    }

    pub fn clear_recent_searches(&self) {
        self.recent.clear();
        self.state.send_modify(|state| state.recent_searches.clear());
    }

    /// Clear query, results and filters. Recent searches are kept and any
    /// pending debounced call is dropped.
    pub fn reset(&self) {
        self.search_debouncer.cancel();
        self.suggest_debouncer.cancel();
        self.state.send_modify(|state| {
            *state = SearchState {
                recent_searches: std::mem::take(&mut state.recent_searches),
                ..SearchState::default()
            };
        });
    }

    fn apply(&self, result: SearchResult) {
        self.state.send_modify(|state| {
            state.results = result.hits;
            state.facets = result.facets;
            state.total_hits = result.total_hits;
            state.page = result.page;
            state.is_loading = false;
        });
    }

    fn record(&self, query: &str) {
        if query.trim().is_empty() {
            return;
        }
        let recent = self.recent.add(query);
        self.state.send_modify(|state| state.recent_searches = recent);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    use crate::error::ErrorCode;
    use crate::recovery::{CircuitBreakerConfig, RetrySettings};
    use crate::search::types::{SearchHit, Suggestion, SuggestionType};
    use crate::storage::MemoryStorage;

    #[derive(Default)]
    struct StubSearchApi {
        queries: Mutex<Vec<SearchQuery>>,
        failing: Mutex<Option<ErrorCode>>,
        suggest_calls: Mutex<u32>,
    }

    fn hit(id: i64) -> SearchHit {
        SearchHit {
            id,
            title: format!("Hit {id}"),
            catalog_name: "WSOP".to_string(),
            episode: None,
            season: None,
            thumbnail_url: None,
            duration_sec: 60,
            hand_count: 1,
            highlights: Vec::new(),
            score: 1.0,
        }
    }

    #[async_trait]
    impl SearchApi for StubSearchApi {
        async fn search(&self, query: &SearchQuery) -> Result<SearchResult, ApiError> {
            self.queries.lock().unwrap().push(query.clone());
            if let Some(code) = *self.failing.lock().unwrap() {
                return Err(ApiError::new(Domain::Search, code, "index down"));
            }
            Ok(SearchResult {
                hits: vec![hit(1), hit(2)],
                total_hits: 2,
                page: query.page.unwrap_or(1),
                total_pages: 1,
                processing_time_ms: 3,
                facets: Vec::new(),
            })
        }

        async fn suggest(&self, query: &SuggestQuery) -> Result<Vec<Suggestion>, ApiError> {
            *self.suggest_calls.lock().unwrap() += 1;
            Ok(vec![Suggestion {
                text: query.q.clone(),
                suggestion_type: SuggestionType::Query,
                highlight: query.q.clone(),
                metadata: None,
            }])
        }
    }

    fn store(api: Arc<StubSearchApi>) -> Arc<SearchStore> {
        let resilience = Arc::new(Resilience::new(
            CircuitBreakerConfig::default(),
            RetrySettings {
                enabled: false,
                ..RetrySettings::default()
            },
        ));
        Arc::new(SearchStore::new(
            api,
            RecentSearches::new(Arc::new(MemoryStorage::new())),
            ResponseCache::default(),
            SearchSettings::default(),
            resilience,
        ))
    }

    #[tokio::test(start_paused = true)]
    async fn debounced_search_runs_once_with_the_last_query() {
        let api = Arc::new(StubSearchApi::default());
        let store = store(api.clone());

        let handles: Vec<_> = ["i", "iv", "ivey"]
            .into_iter()
            .map(|q| store.search_debounced(SearchQuery::new(q)))
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        let queries = api.queries.lock().unwrap();
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].q, "ivey");
        assert_eq!(store.state().recent_searches, vec!["ivey".to_string()]);
    }

    #[tokio::test]
    async fn index_failure_serves_last_good_result() {
        let api = Arc::new(StubSearchApi::default());
        let store = store(api.clone());
        store.search(SearchQuery::new("ivey")).await.unwrap();

        *api.failing.lock().unwrap() = Some(ErrorCode::SearchIndexError);
        store.reset();
        store.search(SearchQuery::new("ivey")).await.unwrap();
        let state = store.state();
        assert_eq!(state.results.len(), 2);
        assert!(state.error.is_none());

        let err = store.search(SearchQuery::new("other")).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::SearchIndexError);
        assert_eq!(store.state().error.map(|e| e.code), Some(ErrorCode::SearchIndexError));
    }

    #[tokio::test]
    async fn invalid_query_is_not_served_from_cache() {
        let api = Arc::new(StubSearchApi::default());
        let store = store(api.clone());
        store.search(SearchQuery::new("ivey")).await.unwrap();
        *api.failing.lock().unwrap() = Some(ErrorCode::SearchQueryInvalid);
        assert!(store.search(SearchQuery::new("ivey")).await.is_err());
    }

    #[tokio::test]
    async fn store_filters_apply_when_query_has_none() {
        let api = Arc::new(StubSearchApi::default());
        let store = store(api.clone());
        store.set_filter(|filters| filters.catalog_id = Some("wsop".to_string()));
        store.search(SearchQuery::new("ivey")).await.unwrap();
        assert_eq!(
            api.queries.lock().unwrap()[0]
                .filters
                .as_ref()
                .and_then(|f| f.catalog_id.as_deref()),
            Some("wsop")
        );

        store.clear_filters();
        assert!(store.state().filters.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn short_suggest_queries_skip_the_api() {
        let api = Arc::new(StubSearchApi::default());
        let store = store(api.clone());
        store.suggest("i", None).await;
        assert_eq!(*api.suggest_calls.lock().unwrap(), 0);

        let first = store.suggest_debounced("iv", None);
        tokio::time::sleep(Duration::from_millis(50)).await;
        let second = store.suggest_debounced("ive", None);
        assert!(!first.await.unwrap());
        assert!(second.await.unwrap());
        assert_eq!(*api.suggest_calls.lock().unwrap(), 1);
        assert_eq!(store.state().suggestions[0].text, "ive");
    }

    #[tokio::test]
    async fn reset_keeps_recent_searches() {
        let api = Arc::new(StubSearchApi::default());
        let store = store(api);
        store.search(SearchQuery::new("hellmuth")).await.unwrap();
        store.set_page(3);
        store.reset();

        let state = store.state();
        assert!(state.results.is_empty());
        assert_eq!(state.page, 1);
        assert_eq!(state.recent_searches, vec!["hellmuth".to_string()]);

        store.clear_recent_searches();
        store.initialize();
        assert!(store.state().recent_searches.is_empty());
    }
}
