use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;
use uuid::Uuid;

use warden_core::LockConfig;
use warden_state::{DistributedLock, StateError};

/// Issues owner tokens and wraps a [`DistributedLock`] backend.
///
/// [`try_lock`](Self::try_lock) is a single attempt. [`lock`](Self::lock)
/// layers a caller-side retry loop on top of it, using the configured
/// [`RetryStrategy`](warden_core::RetryStrategy) between attempts.
#[derive(Clone)]
pub struct LockClient {
    backend: Arc<dyn DistributedLock>,
    config: LockConfig,
}

impl LockClient {
    pub fn new(backend: Arc<dyn DistributedLock>) -> Self {
        Self {
            backend,
            config: LockConfig::default(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: LockConfig) -> Self {
        self.config = config;
        self
    }

    /// One acquisition attempt under a fresh owner token.
    /// Returns `None` if another owner holds `name`.
    pub async fn try_lock(
        &self,
        name: &str,
        ttl: Duration,
    ) -> Result<Option<LockHandle>, StateError> {
        let owner = Uuid::new_v4().to_string();
        if self.backend.try_acquire(name, &owner, ttl).await? {
            Ok(Some(LockHandle {
                backend: Arc::clone(&self.backend),
                key: name.to_owned(),
                owner,
            }))
        } else {
            Ok(None)
        }
    }

    /// Acquire `name` with the configured default TTL and timeout.
    pub async fn lock(&self, name: &str) -> Result<LockHandle, StateError> {
        self.lock_with_timeout(name, self.config.default_ttl(), self.config.acquire_timeout())
            .await
    }

    /// Retry [`try_lock`](Self::try_lock) until it succeeds or `timeout`
    /// elapses.
    ///
    /// # Errors
    ///
    /// [`StateError::Timeout`] if the lock stayed contended for the whole
    /// timeout; store failures are returned immediately.
    pub async fn lock_with_timeout(
        &self,
        name: &str,
        ttl: Duration,
        timeout: Duration,
    ) -> Result<LockHandle, StateError> {
        // No deadline when the timeout does not fit in an `Instant`.
        let deadline = Instant::now().checked_add(timeout);
        let retry = self.config.retry_strategy();
        let mut attempt = 0u32;

        loop {
            if let Some(handle) = self.try_lock(name, ttl).await? {
                return Ok(handle);
            }

            let mut wait = retry.delay_for(attempt);
            if let Some(deadline) = deadline {
                let now = Instant::now();
                if now >= deadline {
                    return Err(StateError::Timeout(timeout));
                }
                wait = wait.min(deadline - now);
            }
            debug!(lock = name, attempt, ?wait, "lock contended");
            attempt = attempt.saturating_add(1);
            tokio::time::sleep(wait).await;
        }
    }
}

/// A lock acquired through [`LockClient`].
///
/// Dropping the handle does not release the lock; it expires after its
/// TTL. Call [`release`](Self::release) for prompt handover.
pub struct LockHandle {
    backend: Arc<dyn DistributedLock>,
    key: String,
    owner: String,
}

impl LockHandle {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn owner_token(&self) -> &str {
        &self.owner
    }

    /// Release the lock if this handle still owns it.
    ///
    /// Returns `false` when the TTL already lapsed, whether or not someone
    /// else has since acquired the key; another owner's lock is never
    /// deleted.
    pub async fn release(self) -> Result<bool, StateError> {
        self.backend.release(&self.key, &self.owner).await
    }

    /// Reset the TTL to `ttl` if this handle still owns the lock.
    pub async fn extend(&self, ttl: Duration) -> Result<bool, StateError> {
        self.backend.extend(&self.key, &self.owner, ttl).await
    }

    /// Whether the store still maps the key to this handle's token.
    pub async fn is_held(&self) -> Result<bool, StateError> {
        Ok(self.backend.owner(&self.key).await?.as_deref() == Some(self.owner.as_str()))
    }
}
