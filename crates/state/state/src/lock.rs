use std::time::Duration;

use async_trait::async_trait;

use crate::error::StateError;

/// Store-resident mutual exclusion keyed by name, owned by an opaque token.
///
/// Implementations must make every method a single atomic store operation.
/// None of them block or retry; a `false` return is a normal contention
/// outcome.
#[async_trait]
pub trait DistributedLock: Send + Sync {
    /// Set `key -> owner` with the given TTL only if `key` is absent.
    /// Returns `true` iff this call created the mapping.
    async fn try_acquire(&self, key: &str, owner: &str, ttl: Duration)
    -> Result<bool, StateError>;

    /// Delete `key` only if it currently maps to `owner`.
    /// Returns `true` iff the mapping was deleted.
    async fn release(&self, key: &str, owner: &str) -> Result<bool, StateError>;

    /// Reset the TTL of `key` only if it currently maps to `owner`.
    /// Returns `true` iff the TTL was updated.
    async fn extend(&self, key: &str, owner: &str, ttl: Duration) -> Result<bool, StateError>;

    /// The token currently holding `key`, if any.
    async fn owner(&self, key: &str) -> Result<Option<String>, StateError>;
}
