//! Normalizing transport failures into typed domain errors.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::Display;
use thiserror::Error;

use super::code::{ErrorCode, Namespace};

/// Business area an API call belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Domain {
    Auth,
    Content,
    Stream,
    Search,
}

impl Domain {
    /// Code used when nothing more specific applies.
    pub fn generic_code(self) -> ErrorCode {
        match self {
            Domain::Auth => ErrorCode::AuthInvalidCredentials,
            Domain::Content => ErrorCode::ContentLoadError,
            Domain::Stream => ErrorCode::PlayerNetworkError,
            Domain::Search => ErrorCode::SearchIndexError,
        }
    }

    /// Code used for transport-level timeouts.
    pub fn timeout_code(self) -> ErrorCode {
        match self {
            Domain::Stream => ErrorCode::PlayerTimeout,
            Domain::Search => ErrorCode::SearchTimeout,
            other => other.generic_code(),
        }
    }

    /// Whether the server may report `code` for a call in this domain.
    ///
    /// Block and agent codes are cross-cutting and accepted everywhere.
    pub fn accepts(self, code: ErrorCode) -> bool {
        match code.namespace() {
            Namespace::Block | Namespace::Agent => true,
            Namespace::Auth => self == Domain::Auth,
            Namespace::Content => self == Domain::Content,
            Namespace::Stream | Namespace::Player => self == Domain::Stream,
            Namespace::Search => self == Domain::Search,
        }
    }

    /// Message used when the server does not supply one.
    pub fn default_message(self) -> &'static str {
        match self {
            Domain::Auth => "The request could not be processed",
            Domain::Content => "Content could not be loaded",
            Domain::Stream => "Playback failed",
            Domain::Search => "Search failed",
        }
    }
}

/// Map an HTTP status (and an optional server-supplied code) to an [`ErrorCode`].
///
/// A known server code for the domain wins; otherwise the domain's fixed
/// status table applies. Never fails.
pub fn map_status_to_error_code(domain: Domain, status: u16, server_code: Option<&str>) -> ErrorCode {
    if let Some(code) = server_code
        .and_then(|raw| ErrorCode::from_str(raw).ok())
        .filter(|code| domain.accepts(*code))
    {
        return code;
    }

    match (domain, status) {
        (Domain::Auth, 401) => ErrorCode::AuthInvalidCredentials,
        (Domain::Auth, 403) => ErrorCode::AuthPendingApproval,
        (Domain::Auth, 409) => ErrorCode::AuthUsernameExists,
        (Domain::Auth, 429) => ErrorCode::AuthRateLimited,

        (Domain::Content, 403) => ErrorCode::ContentAccessDenied,
        (Domain::Content, 404) => ErrorCode::ContentNotFound,

        (Domain::Stream, 403) => ErrorCode::StreamAccessDenied,
        (Domain::Stream, 404) => ErrorCode::PlayerSourceError,
        (Domain::Stream, 503) => ErrorCode::StreamNotReady,
        (Domain::Stream, 408 | 504) => ErrorCode::PlayerTimeout,

        (Domain::Search, 400) => ErrorCode::SearchQueryInvalid,
        (Domain::Search, 408 | 504) => ErrorCode::SearchTimeout,

        (domain, _) => domain.generic_code(),
    }
}

/// Error body shape the backend returns on non-2xx responses.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    code: Option<String>,
    message: Option<String>,
    detail: Option<serde_json::Value>,
}

/// A normalized `{code, message}` failure, safe to hand to UI state.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{code}: {message}")]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    pub domain: Domain,
    pub code: ErrorCode,
    pub message: String,
    pub status: Option<u16>,
}

impl ApiError {
    pub fn new(domain: Domain, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            domain,
            code,
            message: message.into(),
            status: None,
        }
    }

    /// Classify a non-2xx response from its status and raw body.
    ///
    /// Unparseable bodies degrade to the status table and the domain's
    /// default message.
    pub fn from_response(domain: Domain, status: u16, body: &str) -> Self {
        let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
        let code = map_status_to_error_code(domain, status, parsed.code.as_deref());
        let message = parsed
            .message
            .or_else(|| parsed.detail.as_ref().and_then(detail_message))
            .filter(|message| !message.trim().is_empty())
            .unwrap_or_else(|| domain.default_message().to_string());
        Self {
            domain,
            code,
            message,
            status: Some(status),
        }
    }

    /// Classify a failure that never produced an HTTP status.
    pub fn transport(domain: Domain, error: &reqwest::Error) -> Self {
        let code = if error.is_timeout() {
            domain.timeout_code()
        } else if error.is_decode() {
            ErrorCode::AgentCommunicationFailed
        } else {
            domain.generic_code()
        };
        Self::new(domain, code, domain.default_message())
    }

    /// Client-side input validation failure.
    pub fn validation(domain: Domain, message: impl Into<String>) -> Self {
        Self::new(domain, ErrorCode::BlockValidationFailed, message)
    }

    /// HTTP status if the error came from a response.
    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn is_server_error(&self) -> bool {
        matches!(self.status, Some(500..=599))
    }
}

// FastAPI-style `{"detail": "..."}` or `{"detail": {"message": "..."}}`.
fn detail_message(detail: &serde_json::Value) -> Option<String> {
    match detail {
        serde_json::Value::String(text) => Some(text.clone()),
        serde_json::Value::Object(map) => map
            .get("message")
            .and_then(|value| value.as_str())
            .map(str::to_string),
        _ => None,
    }
}
