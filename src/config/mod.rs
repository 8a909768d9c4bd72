//! Configuration system (layered: defaults < TOML file < environment).

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, WsoptvError};
use crate::recovery::{CircuitBreakerConfig, RetrySettings};
use crate::storage::default_storage_dir;

/// Backend used when nothing else is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8001";

/// Staleness windows and capacity for the response cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub list_stale_ms: u64,
    pub detail_stale_ms: u64,
    pub hands_stale_ms: u64,
    pub catalogs_stale_ms: u64,
    pub max_entries: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            list_stale_ms: 5 * 60 * 1000,
            detail_stale_ms: 10 * 60 * 1000,
            hands_stale_ms: 30 * 60 * 1000,
            catalogs_stale_ms: 30 * 60 * 1000,
            max_entries: crate::util::cache::DEFAULT_MAX_ENTRIES,
        }
    }
}

impl CacheSettings {
    pub fn list_stale(&self) -> Duration {
        Duration::from_millis(self.list_stale_ms)
    }

    pub fn detail_stale(&self) -> Duration {
        Duration::from_millis(self.detail_stale_ms)
    }

    pub fn hands_stale(&self) -> Duration {
        Duration::from_millis(self.hands_stale_ms)
    }

    pub fn catalogs_stale(&self) -> Duration {
        Duration::from_millis(self.catalogs_stale_ms)
    }
}

/// Search-as-you-type tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub debounce_ms: u64,
    pub suggest_debounce_ms: u64,
    pub min_chars: usize,
    pub max_suggestions: u32,
    pub default_limit: u32,
    pub max_limit: u32,
    /// How long the last good result may be served when the index is down.
    pub fallback_stale_ms: u64,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            debounce_ms: 300,
            suggest_debounce_ms: 150,
            min_chars: 2,
            max_suggestions: 8,
            default_limit: 20,
            max_limit: 50,
            fallback_stale_ms: 30 * 60 * 1000,
        }
    }
}

impl SearchSettings {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn suggest_debounce(&self) -> Duration {
        Duration::from_millis(self.suggest_debounce_ms)
    }

    /// Clamp a requested page size into `1..=max_limit`, defaulting when absent.
    pub fn clamp_limit(&self, limit: Option<u32>) -> u32 {
        limit
            .unwrap_or(self.default_limit)
            .clamp(1, self.max_limit.max(1))
    }
}

/// Client configuration.
///
/// # Example
/// ```no_run
/// use wsoptv::config::ClientConfig;
///
/// let config = ClientConfig::load(None)?;
/// println!("{}", config.base_url);
/// # Ok::<(), wsoptv::error::WsoptvError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Backend origin; `/api/v1` is appended per request.
    pub base_url: String,
    /// Directory for durable session state.
    pub storage_dir: PathBuf,
    pub timeout_secs: u64,
    pub progress_debounce_ms: u64,
    pub cache: CacheSettings,
    pub search: SearchSettings,
    pub retry: RetrySettings,
    pub circuit_breaker: CircuitBreakerConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            storage_dir: default_storage_dir(),
            timeout_secs: 30,
            progress_debounce_ms: 5000,
            cache: CacheSettings::default(),
            search: SearchSettings::default(),
            retry: RetrySettings::default(),
            circuit_breaker: CircuitBreakerConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Defaults, then the TOML file (if given), then environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Parse a TOML file; missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|err| WsoptvError::Configuration(err.to_string()))
    }

    /// Apply `WSOPTV_*` overrides read through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("WSOPTV_BASE_URL").filter(|url| !url.trim().is_empty()) {
            self.base_url = url.trim().to_string();
        }
        if let Some(dir) = lookup("WSOPTV_STORAGE_DIR").filter(|dir| !dir.trim().is_empty()) {
            self.storage_dir = PathBuf::from(dir.trim());
        }
        if let Some(raw) = lookup("WSOPTV_TIMEOUT_SECS") {
            self.timeout_secs = raw.trim().parse().map_err(|_| {
                WsoptvError::Configuration(format!("WSOPTV_TIMEOUT_SECS is not a number: {raw}"))
            })?;
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn progress_debounce(&self) -> Duration {
        Duration::from_millis(self.progress_debounce_ms)
    }
}
