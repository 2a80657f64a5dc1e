//! Redis backend for Warden.
//!
//! This crate provides Redis-backed implementations of the
//! [`DistributedLock`], [`WindowStore`], and [`DelayStore`] traits from
//! `warden-state`.
//!
//! # Features
//!
//! - **Distributed locking**: `SET NX PX` to acquire, owner-checked Lua
//!   scripts to release and extend.
//! - **Sliding windows**: sorted sets of timestamps, recorded and trimmed by
//!   a single Lua script.
//! - **Delay sets**: sorted sets scored by readiness time, claimed with
//!   `ZREM`.
//! - **Connection pooling**: `deadpool-redis`; one [`RedisPool`] can be
//!   shared by all three backends.
//!
//! # Example
//!
//! ```ignore
//! use warden_state_redis::{RedisConfig, RedisDelayStore, RedisDistributedLock, RedisPool};
//!
//! let pool = RedisPool::new(&RedisConfig::new("redis://localhost:6379"))?;
//! let lock = RedisDistributedLock::from_pool(pool.clone());
//! let queue = RedisDelayStore::from_pool(pool);
//! ```
//!
//! [`DistributedLock`]: warden_state::DistributedLock
//! [`WindowStore`]: warden_state::WindowStore
//! [`DelayStore`]: warden_state::DelayStore

mod config;
pub mod lock;
mod pool;
mod queue;
mod scripts;
mod window;

pub use config::RedisConfig;
pub use lock::RedisDistributedLock;
pub use pool::RedisPool;
pub use queue::RedisDelayStore;
pub use window::RedisWindowStore;
