//! In-process backend for Warden.
//!
//! Mirrors the observable semantics of the Redis backend (owner-checked
//! locks, unique-member windows, score-ordered delay sets) on top of
//! [`dashmap::DashMap`]. Every operation runs under a single shard lock, which
//! gives it the same indivisibility a Lua script has on the server. State
//! lives in one process only, so this backend suits tests and single-node
//! deployments.

mod expiry;
mod lock;
mod queue;
mod window;

pub use lock::MemoryDistributedLock;
pub use queue::MemoryDelayStore;
pub use window::MemoryWindowStore;
