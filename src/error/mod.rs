//! Error types for WSOPTV.

pub mod classify;
pub mod code;

pub use classify::{map_status_to_error_code, ApiError, Domain};
pub use code::{ErrorCode, Namespace, Severity};

use thiserror::Error;

use crate::storage::StorageError;

/// Primary error type for crate-level operations.
#[derive(Error, Debug)]
pub enum WsoptvError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, WsoptvError>;
