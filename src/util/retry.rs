//! Retry backoff with jitter.

use std::time::Duration;

use crate::recovery::RetryConfig;

/// Retry policy configuration.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first).
    pub max_attempts: u32,
    /// Initial backoff duration.
    pub initial_backoff: Duration,
    /// Maximum backoff duration.
    pub max_backoff: Duration,
    /// Backoff multiplier.
    pub multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(RetryConfig::DEFAULT, Duration::from_secs(30))
    }
}

impl RetryPolicy {
    /// Build a policy from a recovery-matrix entry, capping every wait at `max_backoff`.
    pub fn from_config(config: RetryConfig, max_backoff: Duration) -> Self {
        Self {
            max_attempts: config.max_attempts,
            initial_backoff: Duration::from_millis(config.backoff_ms).min(max_backoff),
            max_backoff,
            multiplier: config.multiplier.max(1),
        }
    }

    /// Whether another attempt is allowed after `attempt` (zero-based) failed.
    pub fn has_attempts_left(&self, attempt: u32) -> bool {
        attempt + 1 < self.max_attempts
    }

    /// Un-jittered wait before retrying after `attempt` (zero-based) failed.
    pub fn base_backoff(&self, attempt: u32) -> Duration {
        let factor = u64::from(self.multiplier).saturating_pow(attempt);
        let millis = u64::try_from(self.initial_backoff.as_millis()).unwrap_or(u64::MAX);
        Duration::from_millis(millis.saturating_mul(factor)).min(self.max_backoff)
    }

    /// Wait before retrying, with 75%–125% jitter, never above `max_backoff`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let jitter_factor = 0.75 + (rand_factor() * 0.5);
        self.base_backoff(attempt)
            .mul_f64(jitter_factor)
            .min(self.max_backoff)
    }
}

/// Simple pseudo-random factor [0, 1) without pulling in rand crate.
fn rand_factor() -> f64 {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos()
        .hash(&mut hasher);
    std::thread::current().id().hash(&mut hasher);

    let hash = hasher.finish();
    (hash % 10000) as f64 / 10000.0
}
