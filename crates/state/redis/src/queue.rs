use async_trait::async_trait;
use redis::AsyncCommands;

use warden_state::error::StateError;
use warden_state::queue::DelayStore;

use crate::config::RedisConfig;
use crate::pool::{RedisPool, command_error};

/// Redis-backed [`DelayStore`]: one sorted set per queue, scored by
/// readiness time.
///
/// `claim` is a bare `ZREM`. Its removed-count reply is what arbitrates
/// between consumers racing for the same member: Redis executes commands one
/// at a time, so only one `ZREM` of a given member can return 1.
#[derive(Clone)]
pub struct RedisDelayStore {
    pool: RedisPool,
}

impl RedisDelayStore {
    /// Create a new `RedisDelayStore` with its own pool.
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
impl DelayStore for RedisDelayStore {
    async fn schedule(
        &self,
        queue: &str,
        member: &str,
        ready_at_ms: i64,
    ) -> Result<(), StateError> {
        let redis_key = self.pool.key(queue);
        let mut conn = self.pool.conn().await?;

        redis::cmd("ZADD")
            .arg(&redis_key)
            .arg(ready_at_ms)
            .arg(member)
            .query_async::<i64>(&mut conn)
            .await
            .map_err(|e| command_error(&e))?;

        Ok(())
    }

    async fn first_due(&self, queue: &str, now_ms: i64) -> Result<Option<String>, StateError> {
        let redis_key = self.pool.key(queue);
        let mut conn = self.pool.conn().await?;

        // ZRANGEBYSCORE queue 0 <now_ms> LIMIT 0 1
        let members: Vec<String> = redis::cmd("ZRANGEBYSCORE")
            .arg(&redis_key)
            .arg(0)
            .arg(now_ms)
            .arg("LIMIT")
            .arg(0)
            .arg(1)
            .query_async(&mut conn)
            .await
            .map_err(|e| command_error(&e))?;

        Ok(members.into_iter().next())
    }

    async fn claim(&self, queue: &str, member: &str) -> Result<bool, StateError> {
        let redis_key = self.pool.key(queue);
        let mut conn = self.pool.conn().await?;

        let removed: i64 = conn
            .zrem(&redis_key, member)
            .await
            .map_err(|e| command_error(&e))?;

        Ok(removed == 1)
    }

    async fn pending(&self, queue: &str) -> Result<u64, StateError> {
        let redis_key = self.pool.key(queue);
        let mut conn = self.pool.conn().await?;

        conn.zcard(&redis_key).await.map_err(|e| command_error(&e))
    }
}
