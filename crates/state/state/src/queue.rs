use async_trait::async_trait;

use crate::error::StateError;

/// Score-ordered pending set backing a delay queue.
///
/// Members are opaque strings; scores are epoch milliseconds at which the
/// member becomes due.
#[async_trait]
pub trait DelayStore: Send + Sync {
    /// Add `member` to `queue` with score `ready_at_ms`.
    async fn schedule(&self, queue: &str, member: &str, ready_at_ms: i64)
    -> Result<(), StateError>;

    /// At most one member whose score is in `[0, now_ms]`, lowest score first.
    async fn first_due(&self, queue: &str, now_ms: i64) -> Result<Option<String>, StateError>;

    /// Remove exactly `member`. Returns `true` iff this call removed it; with
    /// concurrent callers at most one of them observes `true`.
    async fn claim(&self, queue: &str, member: &str) -> Result<bool, StateError>;

    /// Number of members still pending, due or not.
    async fn pending(&self, queue: &str) -> Result<u64, StateError>;
}
