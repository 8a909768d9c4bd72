use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use super::api::{grades_param, ContentApi};
use super::progress::WatchProgressTracker;
use super::types::{
    Catalog, Content, ContentDetail, ContentListResult, ContentQuery, ContentState, Hand, HandGrade,
    WatchProgress,
};
use crate::blocks::ids;
use crate::config::CacheSettings;
use crate::error::{ApiError, Domain};
use crate::recovery::Resilience;
use crate::util::{ResponseCache, SingleFlight};

/// Cached form of one list page.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CachedPage {
    items: Vec<Content>,
    has_more: bool,
    page: u32,
}

type ListResult = Result<ContentListResult, ApiError>;
type DetailResult = Result<ContentDetail, ApiError>;

/// Content browsing: lists, detail, hands and catalogs.
///
/// Reads go through the shared [`ResponseCache`]; identical in-flight
/// requests are joined, and a list response is only applied while it is
/// still the latest one requested.
pub struct ContentStore {
    api: Arc<dyn ContentApi>,
    cache: ResponseCache,
    settings: CacheSettings,
    resilience: Arc<Resilience>,
    state: watch::Sender<ContentState>,
    lists: SingleFlight<ListResult>,
    details: SingleFlight<DetailResult>,
    generation: AtomicU64,
}

impl std::fmt::Debug for ContentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentStore")
            .field("cache", &self.cache)
            .field("generation", &self.generation.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl ContentStore {
    pub fn new(
        api: Arc<dyn ContentApi>,
        cache: ResponseCache,
        settings: CacheSettings,
        resilience: Arc<Resilience>,
    ) -> Self {
        let (state, _) = watch::channel(ContentState::default());
        Self {
            api,
            cache,
            settings,
            resilience,
            state,
            lists: SingleFlight::new(),
            details: SingleFlight::new(),
            generation: AtomicU64::new(0),
        }
    }

    pub fn state(&self) -> ContentState {
        self.state.borrow().clone()
    }

    pub fn watch_state(&self) -> watch::Receiver<ContentState> {
        self.state.subscribe()
    }

    pub fn api(&self) -> Arc<dyn ContentApi> {
        self.api.clone()
    }

    /// Load the first page (or `query.page`) of a list, replacing the current one.
    pub async fn fetch_contents(&self, query: ContentQuery) -> Result<(), ApiError> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.send_modify(|state| {
            state.is_loading = true;
            state.error = None;
            state.query = query.clone();
        });

        let key = query.cache_key();
        if let Some(cached) = self.cache.get::<CachedPage>(&key, self.settings.list_stale()) {
            tracing::debug!(%key, "Content list served from cache");
            self.apply_if_current(generation, |state| {
                state.contents = cached.items;
                state.has_more = cached.has_more;
                state.page = cached.page;
            });
            return Ok(());
        }

        match self.load_page(&query).await {
            Ok(result) => {
                self.cache.set(
                    &key,
                    &CachedPage {
                        items: result.items.clone(),
                        has_more: result.has_more,
                        page: result.page,
                    },
                );
                self.apply_if_current(generation, |state| {
                    state.contents = result.items;
                    state.has_more = result.has_more;
                    // The server may clamp an out-of-range page.
                    state.page = result.page;
                });
                Ok(())
            }
            Err(error) => {
                let stored = error.clone();
                self.apply_if_current(generation, |state| state.error = Some(stored));
                Err(error)
            }
        }
    }

    /// Append the next page of the current list.
    ///
    /// Does nothing while a list request is running or when the server
    /// reported no further pages. Items already shown are skipped.
    pub async fn load_more(&self) -> Result<(), ApiError> {
        let (query, page) = {
            let state = self.state.borrow();
            if state.is_loading || !state.has_more {
                return Ok(());
            }
            (state.query.clone(), state.page)
        };
        let generation = self.generation.load(Ordering::SeqCst);
        let next = query.with_page(page + 1);
        self.state.send_modify(|state| {
            state.is_loading = true;
            state.error = None;
        });

        match self.load_page(&next).await {
            Ok(result) => {
                self.apply_if_current(generation, |state| {
                    for item in result.items {
                        if !state.contents.iter().any(|existing| existing.id == item.id) {
                            state.contents.push(item);
                        }
                    }
                    state.has_more = result.has_more;
                    state.page = result.page;
                });
                Ok(())
            }
            Err(error) => {
                let stored = error.clone();
                self.apply_if_current(generation, |state| state.error = Some(stored));
                Err(error)
            }
        }
    }

    /// Select a content and load its detail, hands included.
    pub async fn fetch_content_detail(&self, id: i64) -> Result<(), ApiError> {
        self.state.send_modify(|state| {
            state.is_detail_loading = true;
            state.error = None;
        });

        let key = format!("content:{id}");
        let result = match self.cache.get::<ContentDetail>(&key, self.settings.detail_stale()) {
            Some(detail) => Ok(detail),
            None => {
                let api = self.api.clone();
                let resilience = self.resilience.clone();
                let fetched = self
                    .details
                    .run(&key, move || async move {
                        resilience
                            .run(Domain::Content, ids::CONTENT_QUERY, || api.fetch_content_detail(id))
                            .await
                    })
                    .await;
                if let Ok(detail) = &fetched {
                    self.cache.set(&key, detail);
                }
                fetched
            }
        };

        match result {
            Ok(detail) => {
                self.state.send_modify(|state| {
                    state.hands = detail.hands.clone();
                    state.selected_content = Some(detail);
                    state.is_detail_loading = false;
                });
                Ok(())
            }
            Err(error) => {
                let stored = error.clone();
                self.state.send_modify(|state| {
                    state.error = Some(stored);
                    state.is_detail_loading = false;
                });
                Err(error)
            }
        }
    }

    /// Load hands for a content. Failures are logged and leave the current
    /// hands in place.
    pub async fn fetch_hands(&self, content_id: i64, grades: &[HandGrade]) -> Result<(), ApiError> {
        let key = format!(
            "hands:{content_id}:{}",
            grades_param(grades).as_deref().unwrap_or("all")
        );
        if let Some(hands) = self.cache.get::<Vec<Hand>>(&key, self.settings.hands_stale()) {
            self.state.send_modify(|state| state.hands = hands);
            return Ok(());
        }

        let result = self
            .resilience
            .run(Domain::Content, ids::CONTENT_HANDS, || {
                self.api.fetch_hands(content_id, grades)
            })
            .await;
        match result {
            Ok(hands) => {
                self.cache.set(&key, &hands);
                self.state.send_modify(|state| state.hands = hands);
                Ok(())
            }
            Err(error) => {
                tracing::warn!(content_id, error = %error, "Failed to load hands");
                Err(error)
            }
        }
    }

    /// Load the catalog list. Failures are logged only.
    pub async fn fetch_catalogs(&self) -> Result<(), ApiError> {
        const KEY: &str = "catalogs";
        if let Some(catalogs) = self.cache.get::<Vec<Catalog>>(KEY, self.settings.catalogs_stale()) {
            self.state.send_modify(|state| state.catalogs = catalogs);
            return Ok(());
        }

        let result = self
            .resilience
            .run(Domain::Content, ids::CONTENT_QUERY, || self.api.fetch_catalogs())
            .await;
        match result {
            Ok(catalogs) => {
                self.cache.set(KEY, &catalogs);
                self.state.send_modify(|state| state.catalogs = catalogs);
                Ok(())
            }
            Err(error) => {
                tracing::warn!(error = %error, "Failed to load catalogs");
                Err(error)
            }
        }
    }

    pub async fn fetch_catalog(&self, id: &str) -> Result<(), ApiError> {
        let key = format!("catalog:{id}");
        let result = match self.cache.get::<Catalog>(&key, self.settings.catalogs_stale()) {
            Some(catalog) => Ok(catalog),
            None => {
                let fetched = self
                    .resilience
                    .run(Domain::Content, ids::CONTENT_QUERY, || self.api.fetch_catalog(id))
                    .await;
                if let Ok(catalog) = &fetched {
                    self.cache.set(&key, catalog);
                }
                fetched
            }
        };

        match result {
            Ok(catalog) => {
                self.state
                    .send_modify(|state| state.selected_catalog = Some(catalog));
                Ok(())
            }
            Err(error) => {
                let stored = error.clone();
                self.state.send_modify(|state| state.error = Some(stored));
                Err(error)
            }
        }
    }

    pub fn clear_selection(&self) {
        self.state.send_modify(|state| {
            state.selected_content = None;
            state.selected_catalog = None;
            state.hands.clear();
        });
    }

    /// Drop cached responses whose key contains `pattern` (all when `None`).
    pub fn invalidate(&self, pattern: Option<&str>) {
        self.cache.invalidate(pattern);
    }

    /// Progress tracker for one content, saving after `debounce` of quiet.
    pub fn progress_tracker(&self, content_id: i64, debounce: std::time::Duration) -> WatchProgressTracker {
        WatchProgressTracker::new(self.api.clone(), content_id, debounce)
    }

    /// Every progress record of the signed-in user; empty on failure.
    pub async fn fetch_all_progress(&self) -> Vec<WatchProgress> {
        match self.api.fetch_all_watch_progress().await {
            Ok(progress) => progress,
            Err(error) => {
                tracing::warn!(error = %error, "Failed to load watch progress");
                Vec::new()
            }
        }
    }

    async fn load_page(&self, query: &ContentQuery) -> ListResult {
        let api = self.api.clone();
        let resilience = self.resilience.clone();
        let owned = query.clone();
        self.lists
            .run(&query.cache_key(), move || async move {
                resilience
                    .run(Domain::Content, ids::CONTENT_QUERY, || api.fetch_contents(&owned))
                    .await
            })
            .await
    }

    /// Apply a list update and clear `is_loading`, unless a newer list
    /// request has started since `generation` was taken.
    fn apply_if_current(&self, generation: u64, update: impl FnOnce(&mut ContentState)) {
        if self.generation.load(Ordering::SeqCst) != generation {
            tracing::debug!(generation, "Discarding superseded content list response");
            return;
        }
        self.state.send_modify(|state| {
            update(state);
            state.is_loading = false;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    use crate::content::types::WatchProgressUpdate;
    use crate::error::ErrorCode;
    use crate::recovery::{CircuitBreakerConfig, RetrySettings};

    fn content(id: i64) -> Content {
        Content {
            id,
            catalog_id: "wsop".to_string(),
            catalog_name: "WSOP".to_string(),
            title: format!("Episode {id}"),
            episode: Some(id as u32),
            season: None,
            file_id: id,
            duration_sec: 3600,
            thumbnail_url: None,
            hand_count: 3,
            created_at: "2024-01-01T00:00:00Z".to_string(),
            updated_at: "2024-01-01T00:00:00Z".to_string(),
        }
    }

    #[derive(Default)]
    struct StubContentApi {
        pages: HashMap<u32, (Vec<i64>, bool)>,
        list_calls: Mutex<u32>,
        detail_calls: Mutex<u32>,
        fail_lists: bool,
    }

    #[async_trait]
    impl ContentApi for StubContentApi {
        async fn fetch_contents(&self, query: &ContentQuery) -> Result<ContentListResult, ApiError> {
            *self.list_calls.lock().unwrap() += 1;
            if self.fail_lists {
                return Err(ApiError::from_response(Domain::Content, 404, ""));
            }
            let page = query.page.unwrap_or(1);
            let (ids, has_more) = self.pages.get(&page).cloned().unwrap_or_default();
            Ok(ContentListResult {
                total: ids.len() as u64,
                items: ids.into_iter().map(content).collect(),
                page,
                total_pages: 2,
                has_more,
            })
        }

        async fn fetch_content_detail(&self, id: i64) -> Result<ContentDetail, ApiError> {
            *self.detail_calls.lock().unwrap() += 1;
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(ContentDetail {
                content: content(id),
                description: None,
                players: Vec::new(),
                hands: Vec::new(),
                related_contents: None,
            })
        }

        async fn fetch_hands(&self, _id: i64, _grades: &[HandGrade]) -> Result<Vec<Hand>, ApiError> {
            Ok(Vec::new())
        }

        async fn fetch_catalogs(&self) -> Result<Vec<Catalog>, ApiError> {
            Ok(Vec::new())
        }

        async fn fetch_catalog(&self, id: &str) -> Result<Catalog, ApiError> {
            Err(ApiError::from_response(Domain::Content, 404, &format!("no {id}")))
        }

        async fn fetch_watch_progress(&self, _id: i64) -> Result<Option<WatchProgress>, ApiError> {
            Ok(None)
        }

        async fn save_watch_progress(&self, _update: &WatchProgressUpdate) -> Result<WatchProgress, ApiError> {
            Err(ApiError::from_response(Domain::Content, 500, ""))
        }

        async fn fetch_all_watch_progress(&self) -> Result<Vec<WatchProgress>, ApiError> {
            Err(ApiError::from_response(Domain::Content, 500, ""))
        }
    }

    fn store(api: StubContentApi) -> (ContentStore, Arc<StubContentApi>) {
        let api = Arc::new(api);
        let resilience = Arc::new(Resilience::new(
            CircuitBreakerConfig::default(),
            RetrySettings {
                enabled: false,
                ..RetrySettings::default()
            },
        ));
        let store = ContentStore::new(
            api.clone(),
            ResponseCache::default(),
            CacheSettings::default(),
            resilience,
        );
        (store, api)
    }

    fn paged() -> StubContentApi {
        StubContentApi {
            pages: HashMap::from([(1, (vec![1, 2], true)), (2, (vec![2, 3], false))]),
            ..StubContentApi::default()
        }
    }

    fn ids(state: &ContentState) -> Vec<i64> {
        state.contents.iter().map(|c| c.id).collect()
    }

    #[tokio::test]
    async fn load_more_appends_without_duplicates() {
        let (store, _) = store(paged());
        store
            .fetch_contents(ContentQuery::builder().page(1).build())
            .await
            .unwrap();
        store.load_more().await.unwrap();

        let state = store.state();
        assert_eq!(ids(&state), vec![1, 2, 3]);
        assert_eq!(state.page, 2);
        assert!(!state.has_more);
        assert!(!state.is_loading);
    }

    #[tokio::test]
    async fn load_more_is_a_no_op_without_more_pages() {
        let (store, api) = store(paged());
        store
            .fetch_contents(ContentQuery::builder().page(2).build())
            .await
            .unwrap();
        store.load_more().await.unwrap();
        assert_eq!(*api.list_calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn repeated_list_fetch_is_served_from_cache() {
        let (store, api) = store(paged());
        let query = ContentQuery::builder().page(1).build();
        store.fetch_contents(query.clone()).await.unwrap();
        store.fetch_contents(query).await.unwrap();
        assert_eq!(*api.list_calls.lock().unwrap(), 1);

        store.invalidate(Some("contents:"));
        store
            .fetch_contents(ContentQuery::builder().page(1).build())
            .await
            .unwrap();
        assert_eq!(*api.list_calls.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn list_failure_is_stored_in_state() {
        let (store, _) = store(StubContentApi {
            fail_lists: true,
            ..StubContentApi::default()
        });
        let err = store.fetch_contents(ContentQuery::default()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ContentNotFound);
        let state = store.state();
        assert_eq!(state.error.map(|e| e.code), Some(ErrorCode::ContentNotFound));
        assert!(!state.is_loading);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_detail_requests_share_one_call() {
        let (store, api) = store(StubContentApi::default());
        let (a, b) = tokio::join!(store.fetch_content_detail(7), store.fetch_content_detail(7));
        a.unwrap();
        b.unwrap();
        assert_eq!(*api.detail_calls.lock().unwrap(), 1);
        assert_eq!(store.state().selected_content.map(|d| d.content.id), Some(7));

        store.clear_selection();
        assert!(store.state().selected_content.is_none());
    }

    #[tokio::test]
    async fn catalog_failure_keeps_selection_empty() {
        let (store, _) = store(StubContentApi::default());
        assert!(store.fetch_catalog("wsop").await.is_err());
        assert!(store.state().selected_catalog.is_none());
    }

    #[tokio::test]
    async fn all_progress_failure_reads_as_empty() {
        let (store, _) = store(StubContentApi::default());
        assert!(store.fetch_all_progress().await.is_empty());
    }
}
