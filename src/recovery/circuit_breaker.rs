//! Per-block circuit breakers.
//!
//! ```text
//! [Closed]    --failure_threshold consecutive failures--> [Open]
//! [Open]      --timeout elapsed------------------------> [HalfOpen]
//! [HalfOpen]  --success_threshold consecutive successes-> [Closed]
//! [HalfOpen]  --any failure-----------------------------> [Open]
//! ```
//!
//! Each block id gets its own breaker, so failures in search never block
//! content calls.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

/// Thresholds shared by every breaker in a [`CircuitBreakers`] set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub success_threshold: u32,
    pub timeout_ms: u64,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 3,
            timeout_ms: 30_000,
        }
    }
}

impl CircuitBreakerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Current state of one breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

/// Point-in-time snapshot of a breaker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitBreakerStatus {
    pub block_id: String,
    pub state: CircuitState,
    pub failures: u32,
    pub successes: u32,
    pub last_failure: Option<Instant>,
    pub next_retry_at: Option<Instant>,
}

#[derive(Debug, Clone)]
struct Breaker {
    state: CircuitState,
    failures: u32,
    successes: u32,
    last_failure: Option<Instant>,
    next_retry_at: Option<Instant>,
    /// Half-open calls admitted and not yet settled.
    trials: u32,
}

impl Breaker {
    fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            failures: 0,
            successes: 0,
            last_failure: None,
            next_retry_at: None,
            trials: 0,
        }
    }

    fn advance(&mut self, now: Instant) {
        if self.state == CircuitState::Open && self.next_retry_at.is_some_and(|at| at <= now) {
            self.state = CircuitState::HalfOpen;
            self.successes = 0;
            self.trials = 0;
        }
    }

    fn trip(&mut self, now: Instant, config: &CircuitBreakerConfig) {
        self.state = CircuitState::Open;
        self.successes = 0;
        self.trials = 0;
        self.next_retry_at = Some(now + config.timeout());
    }

    fn snapshot(&self, block_id: &str) -> CircuitBreakerStatus {
        CircuitBreakerStatus {
            block_id: block_id.to_string(),
            state: self.state,
            failures: self.failures,
            successes: self.successes,
            last_failure: self.last_failure,
            next_retry_at: self.next_retry_at,
        }
    }
}

/// A set of breakers keyed by block id.
#[derive(Debug, Default)]
pub struct CircuitBreakers {
    config: CircuitBreakerConfig,
    breakers: Mutex<HashMap<String, Breaker>>,
}

impl CircuitBreakers {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            breakers: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Check whether a call may proceed.
    ///
    /// Returns the remaining cooldown when the breaker is open. While
    /// half-open, at most `success_threshold` calls are admitted until they
    /// settle; a slot left unsettled for a full `timeout` is reclaimed.
    pub fn check(&self, block_id: &str) -> Result<(), Duration> {
        let now = Instant::now();
        let mut breakers = self.lock();
        let Some(breaker) = breakers.get_mut(block_id) else {
            return Ok(());
        };
        let before = breaker.state;
        breaker.advance(now);
        if before != breaker.state {
            tracing::info!(block_id, "Circuit half-open, admitting trial calls");
        }
        match (breaker.state, breaker.next_retry_at) {
            (CircuitState::Open, Some(at)) => Err(at.saturating_duration_since(now)),
            (CircuitState::HalfOpen, window) => {
                if breaker.trials >= self.config.success_threshold.max(1) {
                    match window.filter(|at| *at > now) {
                        Some(at) => return Err(at.saturating_duration_since(now)),
                        None => breaker.trials = 0,
                    }
                }
                if breaker.trials == 0 {
                    breaker.next_retry_at = Some(now + self.config.timeout());
                }
                breaker.trials += 1;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Settle an admitted half-open call whose outcome says nothing about
    /// the block's health.
    pub fn release(&self, block_id: &str) {
        if let Some(breaker) = self.lock().get_mut(block_id) {
            breaker.trials = breaker.trials.saturating_sub(1);
        }
    }

    pub fn record_success(&self, block_id: &str) {
        let mut breakers = self.lock();
        let Some(breaker) = breakers.get_mut(block_id) else {
            return;
        };
        breaker.advance(Instant::now());
        match breaker.state {
            CircuitState::Closed => breaker.failures = 0,
            CircuitState::HalfOpen => {
                breaker.trials = breaker.trials.saturating_sub(1);
                breaker.successes += 1;
                if breaker.successes >= self.config.success_threshold {
                    tracing::info!(block_id, "Circuit closed");
                    *breaker = Breaker::new();
                }
            }
            CircuitState::Open => {}
        }
    }

    pub fn record_failure(&self, block_id: &str) {
        let now = Instant::now();
        let mut breakers = self.lock();
        let breaker = breakers
            .entry(block_id.to_string())
            .or_insert_with(Breaker::new);
        breaker.advance(now);
        breaker.last_failure = Some(now);
        match breaker.state {
            CircuitState::Closed => {
                breaker.failures += 1;
                if breaker.failures >= self.config.failure_threshold {
                    tracing::warn!(block_id, failures = breaker.failures, "Circuit opened");
                    breaker.trip(now, &self.config);
                }
            }
            CircuitState::HalfOpen => {
                breaker.failures += 1;
                tracing::warn!(block_id, "Trial call failed, circuit re-opened");
                breaker.trip(now, &self.config);
            }
            CircuitState::Open => {}
        }
    }

    /// Snapshot of a breaker; unknown ids report a fresh closed breaker.
    pub fn status(&self, block_id: &str) -> CircuitBreakerStatus {
        let mut breakers = self.lock();
        match breakers.get_mut(block_id) {
            Some(breaker) => {
                breaker.advance(Instant::now());
                breaker.snapshot(block_id)
            }
            None => Breaker::new().snapshot(block_id),
        }
    }

    pub fn reset(&self, block_id: &str) {
        self.lock().remove(block_id);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Breaker>> {
        self.breakers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
