//! Machine-readable error codes shared by every domain.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};

/// Every error code a caller can observe.
///
/// The wire form is the upper snake case name (`AUTH_INVALID_CREDENTIALS`).
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Block
    BlockTimeout,
    BlockUnavailable,
    BlockValidationFailed,

    // Agent
    AgentOverloaded,
    AgentCommunicationFailed,

    // Auth
    AuthInvalidCredentials,
    AuthTokenExpired,
    AuthPendingApproval,
    AuthRejected,
    AuthUsernameExists,
    AuthRateLimited,

    // Content
    ContentNotFound,
    ContentAccessDenied,
    ContentLoadError,

    // Stream
    StreamSourceError,
    StreamNotReady,
    StreamTranscodeFailed,
    StreamAccessDenied,
    StreamNotFound,

    // Player
    PlayerSourceError,
    PlayerNetworkError,
    PlayerDecodeError,
    PlayerTimeout,

    // Search
    SearchIndexError,
    SearchQueryInvalid,
    SearchTimeout,
}

/// Namespace a code belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum Namespace {
    Block,
    Agent,
    Auth,
    Content,
    Stream,
    Player,
    Search,
}

impl ErrorCode {
    /// The namespace prefix of this code.
    pub fn namespace(self) -> Namespace {
        use ErrorCode::*;
        match self {
            BlockTimeout | BlockUnavailable | BlockValidationFailed => Namespace::Block,
            AgentOverloaded | AgentCommunicationFailed => Namespace::Agent,
            AuthInvalidCredentials | AuthTokenExpired | AuthPendingApproval | AuthRejected
            | AuthUsernameExists | AuthRateLimited => Namespace::Auth,
            ContentNotFound | ContentAccessDenied | ContentLoadError => Namespace::Content,
            StreamSourceError | StreamNotReady | StreamTranscodeFailed | StreamAccessDenied
            | StreamNotFound => Namespace::Stream,
            PlayerSourceError | PlayerNetworkError | PlayerDecodeError | PlayerTimeout => {
                Namespace::Player
            }
            SearchIndexError | SearchQueryInvalid | SearchTimeout => Namespace::Search,
        }
    }

    /// Wire representation, e.g. `"CONTENT_NOT_FOUND"`.
    pub fn as_str(&self) -> &str {
        self.as_ref()
    }

    /// All codes in the given namespace.
    pub fn in_namespace(namespace: Namespace) -> impl Iterator<Item = ErrorCode> {
        ErrorCode::iter().filter(move |code| code.namespace() == namespace)
    }
}

/// How bad an error is for the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
    Critical,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn wire_names_round_trip_through_strum_and_serde() {
        for code in ErrorCode::iter() {
            let parsed = ErrorCode::from_str(code.as_str()).unwrap();
            assert_eq!(parsed, code);
            let json = serde_json::to_string(&code).unwrap();
            assert_eq!(json, format!("\"{}\"", code.as_str()));
        }
        assert_eq!(ErrorCode::AuthInvalidCredentials.as_str(), "AUTH_INVALID_CREDENTIALS");
    }

    #[test]
    fn namespace_matches_prefix() {
        for code in ErrorCode::iter() {
            let prefix = code.namespace().to_string().to_uppercase();
            assert!(
                code.as_str().starts_with(&format!("{prefix}_")),
                "{code} not in {prefix}"
            );
        }
    }

    #[test]
    fn namespace_sizes() {
        assert_eq!(ErrorCode::in_namespace(Namespace::Block).count(), 3);
        assert_eq!(ErrorCode::in_namespace(Namespace::Agent).count(), 2);
        assert_eq!(ErrorCode::in_namespace(Namespace::Auth).count(), 6);
        assert_eq!(ErrorCode::in_namespace(Namespace::Content).count(), 3);
        assert_eq!(ErrorCode::in_namespace(Namespace::Stream).count(), 5);
        assert_eq!(ErrorCode::in_namespace(Namespace::Player).count(), 4);
        assert_eq!(ErrorCode::in_namespace(Namespace::Search).count(), 3);
    }
}
