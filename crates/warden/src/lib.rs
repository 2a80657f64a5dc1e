//! Coordination primitives over a shared key-value store.
//!
//! - [`LockClient`]: owner-token mutual exclusion with TTL.
//! - [`RateLimiter`]: sliding-window action counting per subject.
//! - [`DelayQueue`] / [`QueueConsumer`]: deferred work claimed by exactly one
//!   of any number of competing consumers.
//!
//! All coordination state lives in the store behind the `warden-state`
//! traits; nothing here keeps authoritative state in process memory, so
//! independent processes pointed at the same store interoperate.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use warden::{DelayQueue, RateLimiter};
//! use warden_core::WardenConfig;
//! use warden_state_redis::{RedisConfig, RedisDelayStore, RedisPool, RedisWindowStore};
//!
//! let config = WardenConfig::load("warden.toml")?;
//! let pool = RedisPool::new(&RedisConfig::from(&config.store))?;
//!
//! let limiter = RateLimiter::new(Arc::new(RedisWindowStore::from_pool(pool.clone())))
//!     .with_tiers(config.rate_limits.clone());
//! let allowed = limiter.check_configured("lwh", "reply").await?.allowed;
//!
//! let queue = DelayQueue::new(
//!     Arc::new(RedisDelayStore::from_pool(pool)),
//!     "test-queue",
//!     config.queue("test-queue"),
//! );
//! queue.enqueue(b"hello".to_vec()).await?;
//! ```

pub mod consumer;
pub mod limiter;
pub mod lock;
pub mod poll;
pub mod queue;

pub use consumer::{ConsumerStats, QueueConsumer, TaskHandler};
pub use limiter::{RateDecision, RateLimiter};
pub use lock::{LockClient, LockHandle};
pub use poll::PollLoop;
pub use queue::{DelayQueue, PollOutcome};
