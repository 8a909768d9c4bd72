//! Auth endpoints.

use std::sync::Arc;

use async_trait::async_trait;

use super::token::TokenPair;
use super::types::{AuthResponse, LoginRequest, RefreshRequest, RegisterRequest, User};
use crate::client::ApiClient;
use crate::error::{ApiError, Domain};

/// Backend operations the auth store depends on.
#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, ApiError>;
    async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, ApiError>;
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, ApiError>;
    async fn logout(&self) -> Result<(), ApiError>;
    /// The signed-in user (`GET /auth/me`).
    async fn current_user(&self) -> Result<User, ApiError>;
}

/// [`AuthApi`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpAuthApi {
    client: Arc<ApiClient>,
}

impl HttpAuthApi {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AuthApi for HttpAuthApi {
    async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, ApiError> {
        self.client.post(Domain::Auth, "/auth/login", request).await
    }

    async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, ApiError> {
        self.client.post(Domain::Auth, "/auth/register", request).await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, ApiError> {
        let body = RefreshRequest {
            refresh_token: refresh_token.to_string(),
        };
        self.client.post(Domain::Auth, "/auth/refresh", &body).await
    }

    async fn logout(&self) -> Result<(), ApiError> {
        self.client
            .post_unit::<()>(Domain::Auth, "/auth/logout", None)
            .await
    }

    async fn current_user(&self) -> Result<User, ApiError> {
        self.client.get(Domain::Auth, "/auth/me").await
    }
}
