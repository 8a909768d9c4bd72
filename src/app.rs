//! Per-session wiring of the client, cache, resilience layer and stores.

use std::sync::Arc;

use crate::auth::{AuthStore, HttpAuthApi, TokenVault};
use crate::client::ApiClient;
use crate::config::ClientConfig;
use crate::content::{ContentStore, HttpContentApi, WatchProgressTracker};
use crate::player::{HttpStreamApi, PlayerStore};
use crate::recovery::Resilience;
use crate::search::{HttpSearchApi, RecentSearches, SearchStore};
use crate::storage::{FileStorage, LocalStorage};
use crate::util::ResponseCache;

/// Everything one signed-in (or anonymous) session needs.
///
/// Build one per application instance, or one per request on a server. The
/// stores share a single [`ApiClient`], [`ResponseCache`] and
/// [`Resilience`] so breaker state and cached responses are session-wide.
///
/// # Example
/// ```no_run
/// use wsoptv::app::AppContext;
/// use wsoptv::config::ClientConfig;
///
/// # async fn run() -> wsoptv::error::Result<()> {
/// let app = AppContext::new(ClientConfig::load(None)?);
/// app.auth().initialize().await;
/// app.content().fetch_contents(Default::default()).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct AppContext {
    config: ClientConfig,
    client: Arc<ApiClient>,
    cache: ResponseCache,
    resilience: Arc<Resilience>,
    auth: AuthStore,
    content: ContentStore,
    player: PlayerStore,
    search: Arc<SearchStore>,
}

impl AppContext {
    /// Session state persisted under `config.storage_dir`.
    pub fn new(config: ClientConfig) -> Self {
        let storage = Arc::new(FileStorage::new(config.storage_dir.clone()));
        Self::with_storage(config, storage)
    }

    pub fn with_storage(config: ClientConfig, storage: Arc<dyn LocalStorage>) -> Self {
        let tokens = TokenVault::new(storage.clone());
        let client = Arc::new(ApiClient::new(&config, tokens.clone()));
        let cache = ResponseCache::new(config.cache.max_entries);
        let resilience = Arc::new(Resilience::new(config.circuit_breaker, config.retry));

        let auth = AuthStore::new(
            Arc::new(HttpAuthApi::new(client.clone())),
            tokens,
            resilience.clone(),
        );
        let content = ContentStore::new(
            Arc::new(HttpContentApi::new(client.clone())),
            cache.clone(),
            config.cache.clone(),
            resilience.clone(),
        );
        let player = PlayerStore::new(Arc::new(HttpStreamApi::new(client.clone())), resilience.clone());
        let search = Arc::new(SearchStore::new(
            Arc::new(HttpSearchApi::new(client.clone(), config.search.clone())),
            RecentSearches::new(storage),
            cache.clone(),
            config.search.clone(),
            resilience.clone(),
        ));

        tracing::debug!(base_url = %client.base_url(), "Session context ready");
        Self {
            config,
            client,
            cache,
            resilience,
            auth,
            content,
            player,
            search,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn client(&self) -> &Arc<ApiClient> {
        &self.client
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    pub fn resilience(&self) -> &Arc<Resilience> {
        &self.resilience
    }

    pub fn auth(&self) -> &AuthStore {
        &self.auth
    }

    pub fn content(&self) -> &ContentStore {
        &self.content
    }

    pub fn player(&self) -> &PlayerStore {
        &self.player
    }

    pub fn search(&self) -> &Arc<SearchStore> {
        &self.search
    }

    /// Autosaving progress tracker using the configured debounce.
    pub fn progress_tracker(&self, content_id: i64) -> WatchProgressTracker {
        self.content
            .progress_tracker(content_id, self.config.progress_debounce())
    }
}
