use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::{LocalStorage, StorageError};

/// Storage key for the persisted token pair.
pub const TOKEN_KEY: &str = "wsoptv_tokens";

/// Access/refresh token pair as issued by the backend.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub expires_at: DateTime<Utc>,
}

impl std::fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl TokenPair {
    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }
}

/// Durable home of the session's [`TokenPair`].
#[derive(Clone)]
pub struct TokenVault {
    storage: Arc<dyn LocalStorage>,
}

impl std::fmt::Debug for TokenVault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenVault").finish_non_exhaustive()
    }
}

impl TokenVault {
    pub fn new(storage: Arc<dyn LocalStorage>) -> Self {
        Self { storage }
    }

    pub fn save(&self, tokens: &TokenPair) -> Result<(), StorageError> {
        let raw = serde_json::to_string(tokens)
            .map_err(|err| StorageError::Io(err.to_string()))?;
        self.storage.set(TOKEN_KEY, &raw)
    }

    /// Stored pair, or `None` when absent, unreadable or corrupt.
    pub fn load(&self) -> Option<TokenPair> {
        let raw = match self.storage.get(TOKEN_KEY) {
            Ok(raw) => raw?,
            Err(error) => {
                tracing::warn!(error = %error, "Failed to read stored tokens");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(tokens) => Some(tokens),
            Err(error) => {
                tracing::warn!(error = %error, "Ignoring corrupt stored tokens");
                None
            }
        }
    }

    pub fn clear(&self) {
        if let Err(error) = self.storage.remove(TOKEN_KEY) {
            tracing::warn!(error = %error, "Failed to clear stored tokens");
        }
    }

    /// Access token, unless none is stored or it has expired.
    pub fn access_token(&self) -> Option<String> {
        self.load()
            .filter(|tokens| !tokens.is_expired())
            .map(|tokens| tokens.access_token)
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.load()
            .map(|tokens| tokens.refresh_token)
            .filter(|token| !token.is_empty())
    }
}
