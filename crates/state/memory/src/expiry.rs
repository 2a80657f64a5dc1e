use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::time::Instant;

/// Stand-in deadline for TTLs too large to add to an `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Minimum spacing between full sweeps of expired entries.
const SWEEP_INTERVAL_MS: u64 = 1_000;

/// Deadline `ttl` from now, clamped instead of overflowing.
pub(crate) fn expiry_from_ttl(ttl: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(ttl)
        .or_else(|| now.checked_add(FAR_FUTURE))
        .unwrap_or(now)
}

/// Rate-limits full-map sweeps so eviction stays amortized.
#[derive(Debug)]
pub(crate) struct SweepSchedule {
    origin: Instant,
    next_ms: AtomicU64,
}

impl SweepSchedule {
    /// Returns `true` for at most one caller per sweep interval.
    pub(crate) fn claim_due(&self) -> bool {
        let elapsed = u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX);
        let next = self.next_ms.load(Ordering::Relaxed);
        elapsed >= next
            && self
                .next_ms
                .compare_exchange(
                    next,
                    elapsed.saturating_add(SWEEP_INTERVAL_MS),
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                )
                .is_ok()
    }
}

impl Default for SweepSchedule {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
            next_ms: AtomicU64::new(SWEEP_INTERVAL_MS),
        }
    }
}
