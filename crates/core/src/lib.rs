pub mod clock;
pub mod config;
pub mod error;
pub mod key;
pub mod retry;
pub mod task;

pub use clock::{Clock, SystemClock, TokioClock};
pub use config::{LockConfig, QueueConfig, RateLimitTier, StoreConfig, WardenConfig};
pub use error::WardenError;
pub use key::{history_key, render_key};
pub use retry::RetryStrategy;
pub use task::{DelayedTask, EnvelopeError, TaskId};
