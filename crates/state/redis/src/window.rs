use std::time::Duration;

use async_trait::async_trait;
use redis::Script;

use warden_state::error::StateError;
use warden_state::window::{WindowStore, window_expiry_secs, window_floor};

use crate::config::RedisConfig;
use crate::pool::{RedisPool, script_error};
use crate::scripts;

/// Redis-backed [`WindowStore`].
///
/// Each key is a sorted set whose members and scores are the recorded
/// millisecond timestamps. Recording, trimming, counting, and the expiry
/// refresh run in one Lua script, so no other client can observe or modify
/// the set between those steps.
#[derive(Clone)]
pub struct RedisWindowStore {
    pool: RedisPool,
}

impl RedisWindowStore {
    /// Create a new `RedisWindowStore` with its own pool.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::Connection`] if the pool cannot be created.
    pub fn new(config: &RedisConfig) -> Result<Self, StateError> {
        Ok(Self::from_pool(RedisPool::new(config)?))
    }

    /// Share an existing pool.
    pub fn from_pool(pool: RedisPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WindowStore for RedisWindowStore {
    async fn record_and_count(
        &self,
        key: &str,
        now_ms: i64,
        window: Duration,
    ) -> Result<u64, StateError> {
        let redis_key = self.pool.key(key);
        let trim_bound = format!("({}", window_floor(now_ms, window));
        let mut conn = self.pool.conn().await?;

        let count: u64 = Script::new(scripts::WINDOW_RECORD)
            .key(&redis_key)
            .arg(now_ms)
            .arg(trim_bound)
            .arg(window_expiry_secs(window))
            .invoke_async(&mut conn)
            .await
            .map_err(|e| script_error(&e))?;

        Ok(count)
    }
}
