use deadpool_redis::{Config, Connection, Pool, Runtime};
use redis::RedisError;

use warden_core::render_key;
use warden_state::error::StateError;

use crate::config::RedisConfig;

/// A `deadpool-redis` pool plus the key prefix shared by every backend.
///
/// Cloning is cheap; clones share the same pool. Each operation checks a
/// connection out for the duration of one command or script and returns it
/// on drop.
#[derive(Clone)]
pub struct RedisPool {
    pool: Pool,
    prefix: String,
}

impl RedisPool {
    /// Create a new pool from the provided configuration.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::Connection`] if the pool cannot be created.
    pub fn new(config: &RedisConfig) -> Result<Self, StateError> {
        let cfg = Config::from_url(&config.url);
        let pool = cfg
            .builder()
            .map(|b| {
                b.max_size(config.pool_size)
                    .wait_timeout(Some(config.connection_timeout))
                    .runtime(Runtime::Tokio1)
                    .build()
            })
            .map_err(|e| StateError::Connection(e.to_string()))?
            .map_err(|e| StateError::Connection(e.to_string()))?;

        Ok(Self {
            pool,
            prefix: config.prefix.clone(),
        })
    }

    /// Build the full Redis key for a logical key.
    pub(crate) fn key(&self, logical: &str) -> String {
        render_key(&self.prefix, logical)
    }

    /// Obtain a connection from the pool.
    pub(crate) async fn conn(&self) -> Result<Connection, StateError> {
        self.pool
            .get()
            .await
            .map_err(|e| StateError::Connection(e.to_string()))
    }
}

fn is_transport(e: &RedisError) -> bool {
    e.is_io_error() || e.is_connection_dropped() || e.is_connection_refusal() || e.is_timeout()
}

/// Classify a failed plain command.
pub(crate) fn command_error(e: &RedisError) -> StateError {
    if is_transport(e) {
        StateError::Connection(e.to_string())
    } else {
        StateError::Backend(e.to_string())
    }
}

/// Classify a failed script invocation.
pub(crate) fn script_error(e: &RedisError) -> StateError {
    if is_transport(e) {
        StateError::Connection(e.to_string())
    } else {
        StateError::Script(e.to_string())
    }
}
