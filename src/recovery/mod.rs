//! Error recovery matrix.
//!
//! Every [`ErrorCode`] has exactly one [`RecoveryConfig`]; [`lookup`] is an
//! exhaustive match, so adding a code without a recovery entry does not
//! compile. The table is immutable and safe to read from any thread.

pub mod circuit_breaker;
pub mod executor;

pub use circuit_breaker::{CircuitBreakerConfig, CircuitBreakerStatus, CircuitBreakers, CircuitState};
pub use executor::{Resilience, RetrySettings};

use serde::{Deserialize, Serialize};
use strum::{Display, IntoEnumIterator};

use crate::error::{ErrorCode, Severity};

/// What a caller should do about a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FallbackStrategy {
    /// Retry with backoff.
    Retry,
    /// Serve the last known good cached value.
    FallbackCache,
    /// Substitute a safe default.
    FallbackDefault,
    /// Stop calling the failing endpoint for a cooldown window.
    CircuitBreak,
    /// Hand the error to a higher-level coordinator.
    Escalate,
}

/// Backoff parameters attached to retryable codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub backoff_ms: u64,
    pub multiplier: u32,
}

impl RetryConfig {
    /// Used for retryable codes that carry no explicit parameters.
    pub const DEFAULT: RetryConfig = RetryConfig {
        max_attempts: 3,
        backoff_ms: 1000,
        multiplier: 2,
    };
}

/// One row of the recovery matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoveryConfig {
    pub code: ErrorCode,
    pub severity: Severity,
    pub recoverable: bool,
    pub strategy: FallbackStrategy,
    pub http_status: Option<u16>,
    pub retry_config: Option<RetryConfig>,
}

impl RecoveryConfig {
    fn new(
        code: ErrorCode,
        severity: Severity,
        recoverable: bool,
        strategy: FallbackStrategy,
        http_status: Option<u16>,
    ) -> Self {
        Self {
            code,
            severity,
            recoverable,
            strategy,
            http_status,
            retry_config: None,
        }
    }

    fn with_retry(mut self, max_attempts: u32, backoff_ms: u64, multiplier: u32) -> Self {
        self.retry_config = Some(RetryConfig {
            max_attempts,
            backoff_ms,
            multiplier,
        });
        self
    }

    /// Whether an automatic retry loop may re-issue the call.
    pub fn allows_retry(&self) -> bool {
        self.recoverable && self.strategy == FallbackStrategy::Retry
    }

    /// Retry parameters, falling back to [`RetryConfig::DEFAULT`].
    pub fn effective_retry(&self) -> Option<RetryConfig> {
        self.allows_retry()
            .then(|| self.retry_config.unwrap_or(RetryConfig::DEFAULT))
    }

    /// Infrastructure failures count against a circuit breaker; application
    /// failures (bad input, missing resources, permissions, 4xx) do not.
    pub fn trips_breaker(&self) -> bool {
        let strategy = matches!(
            self.strategy,
            FallbackStrategy::Retry | FallbackStrategy::FallbackCache | FallbackStrategy::CircuitBreak
        );
        strategy && !matches!(self.http_status, Some(400..=499))
    }
}

/// Look up the recovery entry for a code.
pub fn lookup(code: ErrorCode) -> RecoveryConfig {
    use ErrorCode::*;
    use FallbackStrategy::*;
    use Severity::{Critical, Error, Warning};

    match code {
        BlockTimeout => RecoveryConfig::new(code, Error, true, Retry, None).with_retry(3, 1000, 2),
        BlockUnavailable => RecoveryConfig::new(code, Critical, false, CircuitBreak, None),
        BlockValidationFailed => RecoveryConfig::new(code, Warning, false, FallbackDefault, Some(400)),

        AgentOverloaded => RecoveryConfig::new(code, Warning, true, Retry, Some(503)).with_retry(3, 2000, 2),
        AgentCommunicationFailed => RecoveryConfig::new(code, Error, false, Escalate, None),

        AuthInvalidCredentials => RecoveryConfig::new(code, Error, false, FallbackDefault, Some(401)),
        AuthTokenExpired => RecoveryConfig::new(code, Warning, true, Retry, Some(401)),
        AuthPendingApproval => RecoveryConfig::new(code, Warning, false, FallbackDefault, Some(403)),
        AuthRejected => RecoveryConfig::new(code, Error, false, FallbackDefault, Some(403)),
        AuthUsernameExists => RecoveryConfig::new(code, Warning, false, FallbackDefault, Some(409)),
        AuthRateLimited => RecoveryConfig::new(code, Warning, true, Retry, Some(429)),

        ContentNotFound => RecoveryConfig::new(code, Warning, false, FallbackDefault, Some(404)),
        ContentAccessDenied => RecoveryConfig::new(code, Error, false, FallbackDefault, Some(403)),
        ContentLoadError => RecoveryConfig::new(code, Error, true, Retry, None),

        StreamSourceError => RecoveryConfig::new(code, Error, true, Retry, Some(500)),
        StreamNotReady => RecoveryConfig::new(code, Warning, true, Retry, Some(503)).with_retry(3, 5000, 1),
        StreamTranscodeFailed => RecoveryConfig::new(code, Error, true, Retry, Some(500)),
        StreamAccessDenied => RecoveryConfig::new(code, Error, false, FallbackDefault, Some(403)),
        StreamNotFound => RecoveryConfig::new(code, Warning, false, FallbackDefault, Some(404)),

        PlayerSourceError => RecoveryConfig::new(code, Error, false, FallbackDefault, Some(404)),
        PlayerNetworkError => RecoveryConfig::new(code, Error, true, Retry, None),
        PlayerDecodeError => RecoveryConfig::new(code, Critical, false, Escalate, None),
        PlayerTimeout => RecoveryConfig::new(code, Warning, true, Retry, Some(504)),

        SearchIndexError => RecoveryConfig::new(code, Error, true, FallbackCache, Some(500)),
        SearchQueryInvalid => RecoveryConfig::new(code, Warning, false, FallbackDefault, Some(400)),
        SearchTimeout => RecoveryConfig::new(code, Error, true, Retry, Some(504)),
    }
}

/// The full matrix in declaration order.
pub fn recovery_matrix() -> impl Iterator<Item = RecoveryConfig> {
    ErrorCode::iter().map(lookup)
}
