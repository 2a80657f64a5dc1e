pub mod error;
pub mod lock;
pub mod queue;
pub mod testing;
pub mod window;

pub use error::StateError;
pub use lock::DistributedLock;
pub use queue::DelayStore;
pub use window::WindowStore;
