//! Wall-clock sources for scores and timestamps.
//!
//! Every score written to the store (rate-limit events, queue readiness) is
//! milliseconds since the Unix epoch as observed by the *client*. Routing all
//! reads through [`Clock`] lets tests swap in [`TokioClock`], which follows
//! tokio's (pausable) time instead of the system clock.

use std::fmt::Debug;

use chrono::Utc;
use tokio::time::Instant;

/// A source of epoch milliseconds.
pub trait Clock: Send + Sync + Debug {
    /// Current time in milliseconds since the Unix epoch.
    fn now_millis(&self) -> i64;
}

/// Reads the system clock on every call.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// A clock anchored to an epoch timestamp once, then advanced by
/// [`tokio::time::Instant`].
///
/// Under `#[tokio::test(start_paused = true)]` this clock only moves when the
/// test calls `tokio::time::advance` (or the runtime auto-advances past a
/// sleep), which makes delay and window scenarios deterministic.
#[derive(Debug, Clone)]
pub struct TokioClock {
    epoch_ms: i64,
    origin: Instant,
}

impl TokioClock {
    /// Anchor at the current system time.
    pub fn new() -> Self {
        Self::starting_at(Utc::now().timestamp_millis())
    }

    /// Anchor at an explicit epoch timestamp.
    pub fn starting_at(epoch_ms: i64) -> Self {
        Self {
            epoch_ms,
            origin: Instant::now(),
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TokioClock {
    fn now_millis(&self) -> i64 {
        let elapsed = i64::try_from(self.origin.elapsed().as_millis()).unwrap_or(i64::MAX);
        self.epoch_ms.saturating_add(elapsed)
    }
}
