use std::time::Duration;

/// Wait schedule for caller-side retry loops.
///
/// Used by the lock acquisition helper between contended attempts and by
/// the polling loop between consecutive empty polls. The store primitives
/// themselves never retry.
#[derive(Debug, Clone, PartialEq)]
pub enum RetryStrategy {
    /// Same wait after every attempt.
    Constant {
        /// Fixed wait.
        delay: Duration,
    },
    /// `base * multiplier^attempt`, clamped to `max`.
    Exponential {
        /// Wait after the first attempt.
        base: Duration,
        /// Upper bound on any single wait.
        max: Duration,
        /// Growth factor per attempt.
        multiplier: f64,
    },
}

impl RetryStrategy {
    /// Constant wait of `delay`.
    pub fn constant(delay: Duration) -> Self {
        Self::Constant { delay }
    }

    /// Doubling wait from `base` up to `max`.
    pub fn exponential(base: Duration, max: Duration) -> Self {
        Self::Exponential {
            base,
            max,
            multiplier: 2.0,
        }
    }

    /// Wait to apply after the zero-based `attempt`.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    /// use warden_core::RetryStrategy;
    ///
    /// let strategy =
    ///     RetryStrategy::exponential(Duration::from_millis(100), Duration::from_secs(1));
    /// assert_eq!(strategy.delay_for(0), Duration::from_millis(100));
    /// assert_eq!(strategy.delay_for(3), Duration::from_millis(800));
    /// assert_eq!(strategy.delay_for(9), Duration::from_secs(1));
    /// ```
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match self {
            Self::Constant { delay } => *delay,
            Self::Exponential {
                base,
                max,
                multiplier,
            } => {
                // Capped so the float stays finite.
                let exponent = i32::try_from(attempt.min(63)).unwrap_or(63);
                let raw = base.as_secs_f64() * multiplier.powi(exponent);
                Duration::from_secs_f64(raw.min(max.as_secs_f64()))
            }
        }
    }
}

impl Default for RetryStrategy {
    fn default() -> Self {
        Self::constant(Duration::from_millis(500))
    }
}
