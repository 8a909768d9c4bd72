//! Executes the recovery matrix: circuit breaking plus retry with backoff.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::circuit_breaker::{CircuitBreakerConfig, CircuitBreakerStatus, CircuitBreakers};
use super::lookup;
use crate::error::{ApiError, Domain, ErrorCode};
use crate::util::retry::RetryPolicy;

/// Retry behaviour for the executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Disable to surface the first failure unchanged.
    pub enabled: bool,
    /// Upper bound for any single backoff wait.
    pub max_backoff_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_backoff_ms: 30_000,
        }
    }
}

impl RetrySettings {
    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }
}

/// Shared recovery executor; one per application context.
#[derive(Debug, Default)]
pub struct Resilience {
    breakers: CircuitBreakers,
    retry: RetrySettings,
}

impl Resilience {
    pub fn new(breaker: CircuitBreakerConfig, retry: RetrySettings) -> Self {
        Self {
            breakers: CircuitBreakers::new(breaker),
            retry,
        }
    }

    pub fn breakers(&self) -> &CircuitBreakers {
        &self.breakers
    }

    pub fn status(&self, block_id: &str) -> CircuitBreakerStatus {
        self.breakers.status(block_id)
    }

    /// Run `operation` for `block_id` under the recovery matrix.
    ///
    /// Calls are rejected with `BLOCK_UNAVAILABLE` while the block's breaker
    /// is open. Retryable failures are re-issued with backoff; everything else
    /// is returned on first occurrence.
    pub async fn run<T, F, Fut>(
        &self,
        domain: Domain,
        block_id: &str,
        mut operation: F,
    ) -> Result<T, ApiError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let mut attempt = 0u32;
        loop {
            if let Err(remaining) = self.breakers.check(block_id) {
                tracing::debug!(block_id, remaining_ms = remaining.as_millis() as u64, "Circuit open");
                return Err(ApiError::new(
                    domain,
                    ErrorCode::BlockUnavailable,
                    format!(
                        "{block_id} is temporarily unavailable; retry in {}s",
                        remaining.as_secs().max(1)
                    ),
                ));
            }

            let error = match operation().await {
                Ok(value) => {
                    self.breakers.record_success(block_id);
                    return Ok(value);
                }
                Err(error) => error,
            };

            let recovery = lookup(error.code);
            if recovery.trips_breaker() || error.is_server_error() {
                self.breakers.record_failure(block_id);
                // This failure opened the circuit; report it rather than a rejection.
                if self.breakers.check(block_id).is_err() {
                    return Err(error);
                }
            } else {
                self.breakers.release(block_id);
            }

            // Expired tokens are retried by the auth store after a refresh.
            if !self.retry.enabled || error.code == ErrorCode::AuthTokenExpired {
                return Err(error);
            }
            let Some(retry) = recovery.effective_retry() else {
                return Err(error);
            };
            let policy = RetryPolicy::from_config(retry, self.retry.max_backoff());
            if !policy.has_attempts_left(attempt) {
                return Err(error);
            }

            let wait = policy.backoff(attempt);
            tracing::warn!(
                block_id,
                attempt = attempt + 1,
                max_attempts = policy.max_attempts,
                error = %error,
                wait_ms = wait.as_millis() as u64,
                "Retrying after error"
            );
            tokio::time::sleep(wait).await;
            attempt += 1;
        }
    }
}
