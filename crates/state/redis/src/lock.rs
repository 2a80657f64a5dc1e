//! Redis-backed distributed locking.
//!
//! # How It Works
//!
//! Acquisition is one `SET key token NX PX ttl` command:
//!
//! - **NX**: the key is only written if absent, so at most one owner exists.
//! - **PX**: the key expires on its own, so a crashed holder cannot deadlock
//!   every later acquirer. Setting the expiry in a second command would leave
//!   a window where a crash produces a lock that never expires.
//! - **Owner token**: the caller's opaque token is the value, and only a
//!   caller presenting that token can release or extend the lock.
//!
//! Release and extend compare the stored token and mutate the key inside one
//! Lua script. A client-side `GET` followed by `DEL` would let the TTL lapse
//! between the two calls, and the stale holder would then delete a lock that
//! a different owner acquired in the gap.
//!
//! # Guarantees
//!
//! Against a single Redis instance this gives full mutual exclusion as long
//! as the critical section finishes within the TTL. Under Sentinel or Cluster
//! failover, replication is asynchronous: a lock acquired on a master that
//! dies before replicating can be acquired again on the promoted replica.
//! Callers that cannot tolerate an occasional duplicate holder must make the
//! protected work idempotent.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use warden_state::DistributedLock;
//! use warden_state_redis::{RedisConfig, RedisDistributedLock};
//!
//! let lock = RedisDistributedLock::new(&RedisConfig::new("redis://localhost:6379"))?;
//! if lock.try_acquire("orders:lock", &token, Duration::from_secs(30)).await? {
//!     // critical section
//!     lock.release("orders:lock", &token).await?;
//! }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use redis::{AsyncCommands, Script};

use warden_state::error::StateError;
use warden_state::lock::DistributedLock;

use crate::config::RedisConfig;
use crate::pool::{RedisPool, command_error, script_error};
use crate::scripts;

/// Redis-backed implementation of [`DistributedLock`].
///
/// See the [module-level documentation](self) for consistency guarantees
/// under failover.
#[derive(Clone)]
pub struct RedisDistributedLock {
    pool: RedisPool,
}

impl RedisDistributedLock {
    /// Create a new `RedisDistributedLock` with its own pool.
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

/// TTL in milliseconds; `PX 0` is rejected by the server.
fn ttl_millis(ttl: Duration) -> i64 {
    i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX).max(1)
}

#[async_trait]
impl DistributedLock for RedisDistributedLock {
    async fn try_acquire(
        &self,
        key: &str,
        owner: &str,
        ttl: Duration,
    ) -> Result<bool, StateError> {
        let redis_key = self.pool.key(key);
        let mut conn = self.pool.conn().await?;

        // Nil reply means the key already existed.
        let reply: Option<String> = redis::cmd("SET")
            .arg(&redis_key)
            .arg(owner)
            .arg("NX")
            .arg("PX")
            .arg(ttl_millis(ttl))
            .query_async(&mut conn)
            .await
            .map_err(|e| command_error(&e))?;

        Ok(reply.is_some())
    }

    async fn release(&self, key: &str, owner: &str) -> Result<bool, StateError> {
        let redis_key = self.pool.key(key);
        let mut conn = self.pool.conn().await?;

        let deleted: i64 = Script::new(scripts::LOCK_RELEASE)
            .key(&redis_key)
            .arg(owner)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| script_error(&e))?;

        Ok(deleted == 1)
    }

    async fn extend(&self, key: &str, owner: &str, ttl: Duration) -> Result<bool, StateError> {
        let redis_key = self.pool.key(key);
        let mut conn = self.pool.conn().await?;

        let extended: i64 = Script::new(scripts::LOCK_EXTEND)
            .key(&redis_key)
            .arg(owner)
            .arg(ttl_millis(ttl))
            .invoke_async(&mut conn)
            .await
            .map_err(|e| script_error(&e))?;

        Ok(extended == 1)
    }

    async fn owner(&self, key: &str) -> Result<Option<String>, StateError> {
        let redis_key = self.pool.key(key);
        let mut conn = self.pool.conn().await?;

        conn.get(&redis_key).await.map_err(|e| command_error(&e))
    }
}
