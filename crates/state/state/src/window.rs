use std::time::Duration;

use async_trait::async_trait;

use crate::error::StateError;

/// Time-ordered event history used for sliding-window rate limiting.
#[async_trait]
pub trait WindowStore: Send + Sync {
    /// Record an event at `now_ms` and return the number of events in the
    /// trailing window, the new one included.
    ///
    /// As one indivisible operation, implementations must:
    /// 1. add member `now_ms` (score `now_ms`) to the set at `key`;
    /// 2. drop every member scored below `now_ms - window`;
    /// 3. read the remaining cardinality;
    /// 4. reset the key's expiry to `window` (rounded up to whole seconds, at least one).
    ///
    /// Members are unique, so events recorded in the same millisecond count
    /// once.
    async fn record_and_count(
        &self,
        key: &str,
        now_ms: i64,
        window: Duration,
    ) -> Result<u64, StateError>;
}

/// Lowest score that survives trimming for an event at `now_ms`.
pub fn window_floor(now_ms: i64, window: Duration) -> i64 {
    let window_ms = i64::try_from(window.as_millis()).unwrap_or(i64::MAX);
    now_ms.saturating_sub(window_ms)
}

/// Key expiry for a window: whole seconds rounded up, never zero.
///
/// The key must outlive every event still inside the window.
pub fn window_expiry_secs(window: Duration) -> u64 {
    window
        .as_secs()
        .saturating_add(u64::from(window.subsec_nanos() > 0))
        .max(1)
}
