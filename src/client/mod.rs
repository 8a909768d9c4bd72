//! HTTP access to the WSOPTV backend.
//!
//! [`ApiClient`] builds `/api/v1` URLs, attaches a request id and the stored
//! bearer token, and turns every non-2xx response into a typed [`ApiError`].

use std::sync::{PoisonError, RwLock};

use reqwest::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::auth::token::TokenVault;
use crate::config::ClientConfig;
use crate::error::{ApiError, Domain, ErrorCode};

/// Path prefix every endpoint lives under.
pub const API_PREFIX: &str = "/api/v1";

/// Header carrying the per-request correlation id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Session-level signals raised by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A request was rejected with 401; the UI should send the user to `redirect_to`.
    Unauthenticated { redirect_to: String },
}

/// Typed HTTP client shared by every domain API.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    tokens: TokenVault,
    events: broadcast::Sender<SessionEvent>,
    current_path: RwLock<String>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    pub fn new(config: &ClientConfig, tokens: TokenVault) -> Self {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .pool_max_idle_per_host(10)
            .build()
            .unwrap_or_else(|error| {
                tracing::warn!(error = %error, "Falling back to default HTTP client");
                reqwest::Client::new()
            });
        let (events, _) = broadcast::channel(16);
        Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            tokens,
            events,
            current_path: RwLock::new("/".to_string()),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn tokens(&self) -> &TokenVault {
        &self.tokens
    }

    /// Absolute URL for an endpoint such as `/contents/42`.
    pub fn url(&self, endpoint: &str) -> String {
        format!("{}{}{}", self.base_url, API_PREFIX, endpoint)
    }

    /// Subscribe to [`SessionEvent`]s.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Record the screen the user is on; used to build login redirects.
    pub fn set_current_path(&self, path: impl Into<String>) {
        *self
            .current_path
            .write()
            .unwrap_or_else(PoisonError::into_inner) = path.into();
    }

    pub fn current_path(&self) -> String {
        self.current_path
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub async fn get<T>(&self, domain: Domain, endpoint: &str) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
    {
        self.get_with_query::<T, ()>(domain, endpoint, None).await
    }

    pub async fn get_with_query<T, Q>(
        &self,
        domain: Domain,
        endpoint: &str,
        query: Option<&Q>,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let mut request = self.request(Method::GET, endpoint);
        if let Some(query) = query {
            request = request.query(query);
        }
        let body = self.send(domain, Method::GET, endpoint, request).await?;
        decode(domain, &body)
    }

    pub async fn post<T, B>(&self, domain: Domain, endpoint: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let request = self.request(Method::POST, endpoint).json(body);
        let body = self.send(domain, Method::POST, endpoint, request).await?;
        decode(domain, &body)
    }

    /// POST whose response body is ignored.
    pub async fn post_unit<B>(&self, domain: Domain, endpoint: &str, body: Option<&B>) -> Result<(), ApiError>
    where
        B: Serialize + ?Sized,
    {
        let mut request = self.request(Method::POST, endpoint);
        if let Some(body) = body {
            request = request.json(body);
        }
        self.send(domain, Method::POST, endpoint, request).await?;
        Ok(())
    }

    fn request(&self, method: Method, endpoint: &str) -> RequestBuilder {
        let mut request = self
            .http
            .request(method, self.url(endpoint))
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(token) = self.tokens.access_token() {
            if let Ok(value) = HeaderValue::from_str(&format!("Bearer {token}")) {
                request = request.header(AUTHORIZATION, value);
            }
        }
        request
    }

    async fn send(
        &self,
        domain: Domain,
        method: Method,
        endpoint: &str,
        request: RequestBuilder,
    ) -> Result<String, ApiError> {
        let request_id = Uuid::new_v4();
        tracing::debug!(%method, path = endpoint, %request_id, "Sending request");

        let response = request
            .header(REQUEST_ID_HEADER, request_id.to_string())
            .send()
            .await
            .map_err(|error| {
                tracing::debug!(path = endpoint, %request_id, error = %error, "Request failed");
                ApiError::transport(domain, &error)
            })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|error| ApiError::transport(domain, &error))?;

        if (200..300).contains(&status) {
            return Ok(body);
        }

        tracing::debug!(path = endpoint, %request_id, status, "Request rejected");
        if status == 401 && !endpoint.starts_with("/auth/") {
            self.signal_unauthenticated();
        }
        Err(ApiError::from_response(domain, status, &body))
    }

    fn signal_unauthenticated(&self) {
        let current = self.current_path();
        if current.starts_with("/login") || current.starts_with("/register") {
            return;
        }
        let redirect_to = login_redirect(&current);
        tracing::info!(%redirect_to, "Session is no longer authenticated");
        // No subscribers is fine.
        let _ = self.events.send(SessionEvent::Unauthenticated { redirect_to });
    }
}

fn decode<T: DeserializeOwned>(domain: Domain, body: &str) -> Result<T, ApiError> {
    // Empty bodies decode as JSON null so `()` and `Option<_>` targets work.
    let body = if body.trim().is_empty() { "null" } else { body };
    serde_json::from_str(body).map_err(|error| {
        tracing::warn!(%domain, error = %error, "Unexpected response body");
        ApiError::new(
            domain,
            ErrorCode::AgentCommunicationFailed,
            "The server returned an unexpected response",
        )
    })
}

/// `/login?redirect=<current path>`, with the path query-encoded.
pub fn login_redirect(current_path: &str) -> String {
    let Ok(mut url) = Url::parse("http://localhost/login") else {
        return "/login".to_string();
    };
    url.query_pairs_mut().append_pair("redirect", current_path);
    match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redirect_encodes_the_current_path() {
        assert_eq!(
            login_redirect("/watch/42?t=10"),
            "/login?redirect=%2Fwatch%2F42%3Ft%3D10"
        );
    }

    #[test]
    fn empty_body_decodes_as_unit() {
        let unit: Result<(), ApiError> = decode(Domain::Auth, "");
        assert!(unit.is_ok());
    }

    #[test]
    fn undecodable_success_body_is_a_communication_failure() {
        let result: Result<Vec<u32>, ApiError> = decode(Domain::Content, "{\"items\":");
        assert_eq!(result.unwrap_err().code, ErrorCode::AgentCommunicationFailed);
    }
}
