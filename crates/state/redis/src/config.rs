use std::time::Duration;

use warden_core::StoreConfig;

/// Configuration for the Redis backends.
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// Redis connection URL (e.g. `redis://127.0.0.1:6379`).
    pub url: String,

    /// Key prefix applied to every Redis key. Empty means no prefix.
    pub prefix: String,

    /// Number of connections in the `deadpool-redis` pool.
    pub pool_size: usize,

    /// Timeout for acquiring a pooled connection.
    pub connection_timeout: Duration,
}

impl RedisConfig {
    /// Default settings pointed at `url`.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: String::from("redis://127.0.0.1:6379"),
            prefix: String::new(),
            pool_size: 10,
            connection_timeout: Duration::from_secs(5),
        }
    }
}

impl From<&StoreConfig> for RedisConfig {
    fn from(store: &StoreConfig) -> Self {
        Self {
            url: store.url.clone(),
            prefix: store.prefix.clone(),
            pool_size: store.pool_size,
            connection_timeout: store.connection_timeout(),
        }
    }
}
