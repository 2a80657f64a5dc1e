use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::WardenError;
use crate::retry::RetryStrategy;

/// Top-level configuration, loaded from a TOML file.
///
/// Every section is optional; an empty document yields the defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WardenConfig {
    /// Store connection configuration.
    #[serde(default)]
    pub store: StoreConfig,
    /// Distributed lock defaults.
    #[serde(default)]
    pub lock: LockConfig,
    /// Rate limit tiers keyed by action name.
    #[serde(default)]
    pub rate_limits: HashMap<String, RateLimitTier>,
    /// Delay queue settings keyed by queue name.
    #[serde(default)]
    pub queues: HashMap<String, QueueConfig>,
}

impl WardenConfig {
    /// Parse configuration from a TOML string.
    pub fn from_toml_str(contents: &str) -> Result<Self, WardenError> {
        toml::from_str(contents).map_err(|e| WardenError::Configuration(e.to_string()))
    }

    /// Read and parse a TOML configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, WardenError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            WardenError::Configuration(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&contents)
    }

    /// Settings for the named queue, falling back to defaults.
    pub fn queue(&self, name: &str) -> QueueConfig {
        self.queues.get(name).cloned().unwrap_or_default()
    }
}

/// Connection settings for the key-value store.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Connection URL (e.g. `redis://127.0.0.1:6379`).
    #[serde(default = "default_url")]
    pub url: String,
    /// Prefix applied to every key. Empty means keys are used verbatim.
    #[serde(default)]
    pub prefix: String,
    /// Maximum number of pooled connections.
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
    /// How long to wait for a pooled connection, in milliseconds.
    #[serde(default = "default_connection_timeout_ms")]
    pub connection_timeout_ms: u64,
}

impl StoreConfig {
    pub fn connection_timeout(&self) -> Duration {
        Duration::from_millis(self.connection_timeout_ms)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            prefix: String::new(),
            pool_size: default_pool_size(),
            connection_timeout_ms: default_connection_timeout_ms(),
        }
    }
}

/// Defaults for lock acquisition.
#[derive(Debug, Clone, Deserialize)]
pub struct LockConfig {
    /// TTL applied when the caller does not pick one.
    #[serde(default = "default_lock_ttl_seconds")]
    pub default_ttl_seconds: u64,
    /// How long the blocking acquire helper keeps retrying.
    #[serde(default = "default_acquire_timeout_ms")]
    pub acquire_timeout_ms: u64,
    /// Wait between contended acquisition attempts.
    #[serde(default = "default_retry_interval_ms")]
    pub retry_interval_ms: u64,
}

impl LockConfig {
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_seconds)
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }

    pub fn retry_strategy(&self) -> RetryStrategy {
        RetryStrategy::constant(Duration::from_millis(self.retry_interval_ms))
    }
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            default_ttl_seconds: default_lock_ttl_seconds(),
            acquire_timeout_ms: default_acquire_timeout_ms(),
            retry_interval_ms: default_retry_interval_ms(),
        }
    }
}

/// A sliding-window limit: at most `max_count` actions per `period_seconds`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RateLimitTier {
    /// Window length in seconds.
    #[serde(default = "default_period_seconds")]
    pub period_seconds: u64,
    /// Maximum actions allowed within one window, including the current one.
    #[serde(default = "default_max_count")]
    pub max_count: u64,
}

impl RateLimitTier {
    pub fn period(&self) -> Duration {
        Duration::from_secs(self.period_seconds)
    }
}

impl Default for RateLimitTier {
    fn default() -> Self {
        Self {
            period_seconds: default_period_seconds(),
            max_count: default_max_count(),
        }
    }
}

/// Settings for one delay queue.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct QueueConfig {
    /// Delay added to the enqueue time to compute readiness.
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
    /// Wait after an empty poll.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Cap for the idle wait. When set above `poll_interval_ms`, consecutive
    /// empty polls back off exponentially up to this value.
    #[serde(default)]
    pub max_poll_interval_ms: Option<u64>,
}

impl QueueConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    /// Idle-wait schedule for the consumer loop.
    pub fn idle_backoff(&self) -> RetryStrategy {
        let base = Duration::from_millis(self.poll_interval_ms);
        match self.max_poll_interval_ms {
            Some(cap) if cap > self.poll_interval_ms => {
                RetryStrategy::exponential(base, Duration::from_millis(cap))
            }
            _ => RetryStrategy::constant(base),
        }
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            delay_ms: default_delay_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            max_poll_interval_ms: None,
        }
    }
}

fn default_url() -> String {
    "redis://127.0.0.1:6379".to_owned()
}

fn default_pool_size() -> usize {
    10
}

fn default_connection_timeout_ms() -> u64 {
    5_000
}

fn default_lock_ttl_seconds() -> u64 {
    30
}

fn default_acquire_timeout_ms() -> u64 {
    5_000
}

fn default_retry_interval_ms() -> u64 {
    50
}

fn default_period_seconds() -> u64 {
    60
}

fn default_max_count() -> u64 {
    100
}

fn default_delay_ms() -> u64 {
    5_000
}

fn default_poll_interval_ms() -> u64 {
    500
}
