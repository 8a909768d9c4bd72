use std::sync::Arc;

use tokio::sync::{watch, OnceCell};

use super::api::AuthApi;
use super::token::{TokenPair, TokenVault};
use super::types::{AuthResponse, AuthState, LoginRequest, RegisterRequest, User, UserRole, UserStatus};
use super::validation::{validate_login, validate_register};
use crate::blocks::ids;
use crate::error::{ApiError, Domain, ErrorCode};
use crate::recovery::Resilience;

/// Session state for one signed-in (or anonymous) user.
///
/// All methods take `&self`; observers subscribe through
/// [`watch_state`](Self::watch_state).
pub struct AuthStore {
    api: Arc<dyn AuthApi>,
    tokens: TokenVault,
    resilience: Arc<Resilience>,
    state: watch::Sender<AuthState>,
    initialized: OnceCell<()>,
}

impl std::fmt::Debug for AuthStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthStore")
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

impl AuthStore {
    pub fn new(api: Arc<dyn AuthApi>, tokens: TokenVault, resilience: Arc<Resilience>) -> Self {
        let (state, _) = watch::channel(AuthState::default());
        Self {
            api,
            tokens,
            resilience,
            state,
            initialized: OnceCell::new(),
        }
    }

    pub fn state(&self) -> AuthState {
        self.state.borrow().clone()
    }

    pub fn watch_state(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    pub fn user(&self) -> Option<User> {
        self.state.borrow().user.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated
    }

    pub fn tokens(&self) -> &TokenVault {
        &self.tokens
    }

    /// Sign in. The error is also left in state for observers.
    pub async fn login(&self, request: LoginRequest) -> Result<(), ApiError> {
        self.begin();
        let result = match validate_login(&request) {
            Ok(()) => {
                self.resilience
                    .run(Domain::Auth, ids::AUTH_VALIDATE, || self.api.login(&request))
                    .await
            }
            Err(error) => Err(error),
        };
        match result {
            Ok(response) => {
                let user = self.accept(response);
                tracing::info!(username = %user.username, "Signed in");
                self.state.send_modify(|state| {
                    state.user = Some(user);
                    state.is_authenticated = true;
                    state.is_loading = false;
                });
                Ok(())
            }
            Err(error) => Err(self.fail(error)),
        }
    }

    /// Create an account. Pending accounts are not signed in.
    pub async fn register(&self, request: RegisterRequest) -> Result<(), ApiError> {
        self.begin();
        let result = match validate_register(&request) {
            Ok(()) => {
                self.resilience
                    .run(Domain::Auth, ids::AUTH_VALIDATE, || self.api.register(&request))
                    .await
            }
            Err(error) => Err(error),
        };
        match result {
            Ok(response) => {
                let user = self.accept(response);
                let approved = user.status == UserStatus::Approved;
                tracing::info!(username = %user.username, status = %user.status, "Registered");
                self.state.send_modify(|state| {
                    state.user = Some(user);
                    state.is_authenticated = approved;
                    state.is_loading = false;
                });
                Ok(())
            }
            Err(error) => Err(self.fail(error)),
        }
    }

    /// Sign out locally regardless of whether the server call succeeds.
    pub async fn logout(&self) {
        self.state.send_modify(|state| state.is_loading = true);
        if self.tokens.access_token().is_some() {
            if let Err(error) = self.api.logout().await {
                tracing::warn!(error = %error, "Server logout failed; clearing local session");
            }
        }
        self.tokens.clear();
        self.state.send_modify(|state| {
            state.user = None;
            state.is_authenticated = false;
            state.is_loading = false;
            state.error = None;
        });
    }

    /// Exchange the refresh token and reload the user.
    ///
    /// Returns whether a session was restored. Any failure clears the session.
    pub async fn refresh(&self) -> bool {
        let restored = match self.refresh_tokens().await {
            Ok(()) => self.load_current_user().await,
            Err(error) => {
                tracing::warn!(error = %error, "Token refresh failed");
                None
            }
        };
        let restored_any = restored.is_some();
        self.state.send_modify(|state| {
            state.is_authenticated = restored_any;
            state.user = restored;
        });
        restored_any
    }

    /// Restore the session once per store; later calls return immediately.
    pub async fn initialize(&self) {
        self.initialized
            .get_or_init(|| async {
                self.state.send_modify(|state| state.is_loading = true);

                let mut user = self.load_current_user().await;
                if user.is_none() && self.refresh_tokens().await.is_ok() {
                    user = self.load_current_user().await;
                }

                let authenticated = user.is_some();
                self.state.send_modify(|state| {
                    state.user = user;
                    state.is_authenticated = authenticated;
                    state.is_loading = false;
                    state.is_initialized = true;
                });
            })
            .await;
    }

    pub fn clear_error(&self) {
        self.state.send_modify(|state| state.error = None);
    }

    pub fn has_role(&self, role: UserRole) -> bool {
        self.state
            .borrow()
            .user
            .as_ref()
            .is_some_and(|user| user.role == role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(UserRole::Admin)
    }

    pub fn is_approved(&self) -> bool {
        self.state
            .borrow()
            .user
            .as_ref()
            .is_some_and(|user| user.status == UserStatus::Approved)
    }

    /// Initialized and not mid-request.
    pub fn is_ready(&self) -> bool {
        let state = self.state.borrow();
        state.is_initialized && !state.is_loading
    }

    fn begin(&self) {
        self.state.send_modify(|state| {
            state.is_loading = true;
            state.error = None;
        });
    }

    fn fail(&self, error: ApiError) -> ApiError {
        tracing::debug!(code = %error.code, "Auth request failed");
        let stored = error.clone();
        self.state.send_modify(|state| {
            state.error = Some(stored);
            state.is_loading = false;
        });
        error
    }

    fn accept(&self, response: AuthResponse) -> User {
        if let Some(tokens) = &response.tokens {
            self.save_tokens(tokens);
        }
        response.user
    }

    fn save_tokens(&self, tokens: &TokenPair) {
        if let Err(error) = self.tokens.save(tokens) {
            tracing::warn!(error = %error, "Failed to persist tokens");
        }
    }

    async fn refresh_tokens(&self) -> Result<(), ApiError> {
        let Some(refresh_token) = self.tokens.refresh_token() else {
            return Err(ApiError::new(
                Domain::Auth,
                ErrorCode::AuthTokenExpired,
                "No refresh token stored",
            ));
        };
        let result = self
            .resilience
            .run(Domain::Auth, ids::AUTH_TOKEN, || self.api.refresh(&refresh_token))
            .await;
        match result {
            Ok(tokens) => {
                self.save_tokens(&tokens);
                Ok(())
            }
            Err(error) => {
                self.tokens.clear();
                Err(error)
            }
        }
    }

    /// Who-am-I. `None` without a live token; a 401 also drops stored tokens.
    async fn load_current_user(&self) -> Option<User> {
        self.tokens.access_token()?;
        let result = self
            .resilience
            .run(Domain::Auth, ids::AUTH_SESSION, || self.api.current_user())
            .await;
        match result {
            Ok(user) => Some(user),
            Err(error) => {
                if error.status() == Some(401) {
                    self.tokens.clear();
                }
                tracing::debug!(error = %error, "Could not load current user");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::{Duration, Utc};

    use crate::recovery::{CircuitBreakerConfig, RetrySettings};
    use crate::storage::MemoryStorage;

    #[derive(Default)]
    struct StubAuthApi {
        me: Mutex<Option<Result<User, ApiError>>>,
        refreshed: Mutex<Option<TokenPair>>,
        logout_calls: Mutex<u32>,
    }

    fn user(status: UserStatus) -> User {
        User {
            id: 1,
            username: "u1".to_string(),
            display_name: None,
            role: UserRole::User,
            status,
            created_at: "2024-01-01T00:00:00Z".to_string(),
            last_login_at: None,
        }
    }

    fn live_tokens(access: &str) -> TokenPair {
        TokenPair {
            access_token: access.to_string(),
            refresh_token: "refresh".to_string(),
            expires_at: Utc::now() + Duration::hours(1),
        }
    }

    #[async_trait]
    impl AuthApi for StubAuthApi {
        async fn login(&self, _request: &LoginRequest) -> Result<AuthResponse, ApiError> {
            Ok(AuthResponse {
                user: user(UserStatus::Approved),
                tokens: Some(live_tokens("access")),
            })
        }

        async fn register(&self, _request: &RegisterRequest) -> Result<AuthResponse, ApiError> {
            Ok(AuthResponse {
                user: user(UserStatus::Pending),
                tokens: None,
            })
        }

        async fn refresh(&self, _refresh_token: &str) -> Result<TokenPair, ApiError> {
            self.refreshed.lock().unwrap().clone().ok_or_else(|| {
                ApiError::new(Domain::Auth, ErrorCode::AuthInvalidCredentials, "expired")
            })
        }

        async fn logout(&self) -> Result<(), ApiError> {
            *self.logout_calls.lock().unwrap() += 1;
            Err(ApiError::new(Domain::Auth, ErrorCode::AuthInvalidCredentials, "down"))
        }

        async fn current_user(&self) -> Result<User, ApiError> {
            self.me.lock().unwrap().clone().unwrap_or_else(|| {
                Err(ApiError::from_response(Domain::Auth, 401, ""))
            })
        }
    }

    fn store(api: Arc<StubAuthApi>) -> (AuthStore, TokenVault) {
        let vault = TokenVault::new(Arc::new(MemoryStorage::new()));
        let resilience = Arc::new(Resilience::new(
            CircuitBreakerConfig::default(),
            RetrySettings {
                enabled: false,
                ..RetrySettings::default()
            },
        ));
        (AuthStore::new(api, vault.clone(), resilience), vault)
    }

    #[tokio::test]
    async fn invalid_login_never_reaches_the_server() {
        let (store, _) = store(Arc::new(StubAuthApi::default()));
        let err = store.login(LoginRequest::new("", "secret")).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::BlockValidationFailed);
        assert_eq!(store.state().error.map(|e| e.code), Some(ErrorCode::BlockValidationFailed));
        assert!(!store.state().is_loading);
    }

    #[tokio::test]
    async fn login_persists_tokens() {
        let (store, vault) = store(Arc::new(StubAuthApi::default()));
        store.login(LoginRequest::new("u1", "p1")).await.unwrap();
        assert!(store.is_authenticated());
        assert_eq!(vault.access_token().as_deref(), Some("access"));
    }

    #[tokio::test]
    async fn pending_registration_is_not_authenticated() {
        let (store, _) = store(Arc::new(StubAuthApi::default()));
        let request = RegisterRequest::builder()
            .username("newplayer")
            .password("Password1")
            .build();
        store.register(request).await.unwrap();
        assert!(!store.is_authenticated());
        assert!(!store.is_approved());
        assert_eq!(store.user().map(|u| u.status), Some(UserStatus::Pending));
    }

    #[tokio::test]
    async fn logout_clears_session_even_when_server_fails() {
        let api = Arc::new(StubAuthApi::default());
        let (store, vault) = store(api.clone());
        store.login(LoginRequest::new("u1", "p1")).await.unwrap();

        store.logout().await;
        assert_eq!(*api.logout_calls.lock().unwrap(), 1);
        assert!(!store.is_authenticated());
        assert!(vault.load().is_none());
    }

    #[tokio::test]
    async fn initialize_refreshes_then_reloads_user() {
        let api = Arc::new(StubAuthApi::default());
        *api.refreshed.lock().unwrap() = Some(live_tokens("fresh"));
        let (store, vault) = store(api.clone());
        let mut expired = live_tokens("stale");
        expired.expires_at = Utc::now() - Duration::minutes(1);
        vault.save(&expired).unwrap();
        *api.me.lock().unwrap() = Some(Ok(user(UserStatus::Approved)));

        store.initialize().await;
        let state = store.state();
        assert!(state.is_authenticated);
        assert!(state.is_initialized);
        assert!(store.is_ready());
        assert_eq!(vault.access_token().as_deref(), Some("fresh"));
    }

    #[tokio::test]
    async fn initialize_runs_once() {
        let api = Arc::new(StubAuthApi::default());
        let (store, vault) = store(api.clone());
        store.initialize().await;
        assert!(!store.is_authenticated());

        vault.save(&live_tokens("later")).unwrap();
        *api.me.lock().unwrap() = Some(Ok(user(UserStatus::Approved)));
        store.initialize().await;
        assert!(!store.is_authenticated());
    }

    #[tokio::test]
    async fn failed_refresh_clears_tokens() {
        let api = Arc::new(StubAuthApi::default());
        let (store, vault) = store(api);
        vault.save(&live_tokens("access")).unwrap();

        assert!(!store.refresh().await);
        assert!(vault.load().is_none());
        assert!(!store.is_authenticated());
    }
}
