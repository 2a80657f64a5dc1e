use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use warden_core::{Clock, RateLimitTier, SystemClock, WardenError, history_key};
use warden_state::{StateError, WindowStore};

/// Outcome of one rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    /// Whether the action may proceed.
    pub allowed: bool,
    /// Events in the trailing window, the checked one included.
    pub count: u64,
    /// The `max_count` the check was made against.
    pub limit: u64,
}

/// Sliding-window limiter: at most `max_count` actions per subject and
/// action within any trailing `period`.
///
/// Every check is recorded, including rejected ones, so a subject that keeps
/// retrying while over the limit stays over it.
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn WindowStore>,
    clock: Arc<dyn Clock>,
    tiers: HashMap<String, RateLimitTier>,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn WindowStore>) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            tiers: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Named tiers used by [`check_configured`](Self::check_configured).
    #[must_use]
    pub fn with_tiers(mut self, tiers: HashMap<String, RateLimitTier>) -> Self {
        self.tiers = tiers;
        self
    }

    /// Record an action and report whether it is within the limit.
    pub async fn is_action_allowed(
        &self,
        subject: &str,
        action: &str,
        period: Duration,
        max_count: u64,
    ) -> Result<bool, StateError> {
        Ok(self.check(subject, action, period, max_count).await?.allowed)
    }

    /// Record an action and return the full decision.
    pub async fn check(
        &self,
        subject: &str,
        action: &str,
        period: Duration,
        max_count: u64,
    ) -> Result<RateDecision, StateError> {
        let key = history_key(subject, action);
        let now_ms = self.clock.now_millis();
        let count = self.store.record_and_count(&key, now_ms, period).await?;

        let decision = RateDecision {
            allowed: count <= max_count,
            count,
            limit: max_count,
        };
        if !decision.allowed {
            debug!(subject, action, count, limit = max_count, "rate limit exceeded");
        }
        Ok(decision)
    }

    /// Check against the tier configured for `action`.
    ///
    /// # Errors
    ///
    /// [`WardenError::Configuration`] if no tier is configured for `action`.
    pub async fn check_configured(
        &self,
        subject: &str,
        action: &str,
    ) -> Result<RateDecision, WardenError> {
        let tier = self.tiers.get(action).ok_or_else(|| {
            WardenError::Configuration(format!("no rate limit configured for action {action}"))
        })?;
        Ok(self
            .check(subject, action, tier.period(), tier.max_count)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use warden_core::TokioClock;
    use warden_state_memory::MemoryWindowStore;

    use super::*;

    fn limiter() -> RateLimiter {
        RateLimiter::new(Arc::new(MemoryWindowStore::new()))
            .with_clock(Arc::new(TokioClock::starting_at(1_700_000_000_000)))
    }

    #[tokio::test(start_paused = true)]
    async fn five_per_second_then_reject_then_recover() {
        let limiter = limiter();
        let period = Duration::from_secs(1);

        for _ in 0..5 {
            assert!(limiter.is_action_allowed("lwh", "reply", period, 5).await.unwrap());
            tokio::time::advance(Duration::from_millis(150)).await;
        }
        // 750ms after the first call, still inside the window.
        assert!(!limiter.is_action_allowed("lwh", "reply", period, 5).await.unwrap());

        tokio::time::advance(Duration::from_millis(1_100)).await;
        assert!(limiter.is_action_allowed("lwh", "reply", period, 5).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn nth_action_allowed_when_limit_equals_n() {
        let limiter = limiter();
        let period = Duration::from_secs(60);

        for expected in 1..=3 {
            let decision = limiter.check("u", "post", period, 3).await.unwrap();
            assert_eq!(decision.count, expected);
            assert!(decision.allowed);
            tokio::time::advance(Duration::from_millis(1)).await;
        }
        let decision = limiter.check("u", "post", period, 3).await.unwrap();
        assert_eq!(
            decision,
            RateDecision {
                allowed: false,
                count: 4,
                limit: 3
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn count_matches_events_in_window() {
        let limiter = limiter();
        let period = Duration::from_secs(1);

        // t = 0, 400, 800, 1200, 1600
        let mut counts = Vec::new();
        for _ in 0..5 {
            counts.push(limiter.check("u", "a", period, 100).await.unwrap().count);
            tokio::time::advance(Duration::from_millis(400)).await;
        }
        // At 1200 the event at 0 is out; at 1600 the event at 400 is out too.
        assert_eq!(counts, vec![1, 2, 3, 3, 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn fractional_period_counts_whole_window() {
        let limiter = limiter();
        let period = Duration::from_millis(1_500);

        assert!(limiter.check("u", "burst", period, 2).await.unwrap().allowed);
        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(limiter.check("u", "burst", period, 2).await.unwrap().allowed);
        tokio::time::advance(Duration::from_millis(1_100)).await;

        let decision = limiter.check("u", "burst", period, 2).await.unwrap();
        assert_eq!(
            decision,
            RateDecision {
                allowed: false,
                count: 3,
                limit: 2
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn subjects_and_actions_are_isolated() {
        let limiter = limiter();
        let period = Duration::from_secs(10);

        assert!(limiter.is_action_allowed("alice", "reply", period, 1).await.unwrap());
        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(!limiter.is_action_allowed("alice", "reply", period, 1).await.unwrap());
        assert!(limiter.is_action_allowed("bob", "reply", period, 1).await.unwrap());
        assert!(limiter.is_action_allowed("alice", "post", period, 1).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn zero_limit_rejects_everything() {
        let limiter = limiter();
        assert!(
            !limiter
                .is_action_allowed("u", "a", Duration::from_secs(1), 0)
                .await
                .unwrap()
        );
    }

    #[tokio::test(start_paused = true)]
    async fn configured_tier_is_applied() {
        let mut tiers = HashMap::new();
        tiers.insert(
            "reply".to_owned(),
            RateLimitTier {
                period_seconds: 1,
                max_count: 2,
            },
        );
        let limiter = limiter().with_tiers(tiers);

        assert!(limiter.check_configured("u", "reply").await.unwrap().allowed);
        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(limiter.check_configured("u", "reply").await.unwrap().allowed);
        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(!limiter.check_configured("u", "reply").await.unwrap().allowed);
    }

    #[tokio::test]
    async fn unknown_tier_is_configuration_error() {
        let limiter = limiter();
        let err = limiter.check_configured("u", "missing").await.unwrap_err();
        assert!(matches!(err, WardenError::Configuration(_)));
    }
}
