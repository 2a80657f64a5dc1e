//! Cooperative polling loop shared by store-polling workers.
//!
//! Callers drive the loop themselves:
//!
//! ```ignore
//! while poller.should_continue() {
//!     if found_work().await? {
//!         poller.worked();
//!     } else if !poller.idle().await {
//!         break;
//!     }
//! }
//! ```
//!
//! The stop signal is the receiving half of a shutdown channel. A message, or
//! the sender being dropped, stops the loop the next time
//! [`should_continue`](PollLoop::should_continue) runs, or immediately if the
//! loop is waiting in [`idle`](PollLoop::idle). Work in progress between
//! those points is never interrupted.

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;

use warden_core::RetryStrategy;

/// Tracks the idle streak and the shutdown signal for a polling worker.
#[derive(Debug)]
pub struct PollLoop {
    backoff: RetryStrategy,
    shutdown_rx: mpsc::Receiver<()>,
    idle_streak: u32,
    stopped: bool,
}

impl PollLoop {
    /// `backoff` is indexed by the number of consecutive empty polls.
    pub fn new(backoff: RetryStrategy, shutdown_rx: mpsc::Receiver<()>) -> Self {
        Self {
            backoff,
            shutdown_rx,
            idle_streak: 0,
            stopped: false,
        }
    }

    /// Create a loop together with the sender that stops it.
    pub fn channel(backoff: RetryStrategy) -> (Self, mpsc::Sender<()>) {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        (Self::new(backoff, shutdown_rx), shutdown_tx)
    }

    /// Top-of-iteration check. Returns `false` once a stop was requested.
    pub fn should_continue(&mut self) -> bool {
        if !self.stopped {
            match self.shutdown_rx.try_recv() {
                Ok(()) | Err(TryRecvError::Disconnected) => self.stopped = true,
                Err(TryRecvError::Empty) => {}
            }
        }
        !self.stopped
    }

    /// Record a productive iteration; the next idle wait starts from the
    /// base interval again.
    pub fn worked(&mut self) {
        self.idle_streak = 0;
    }

    /// Wait after an empty poll. Returns `false` if a stop was requested
    /// during the wait.
    pub async fn idle(&mut self) -> bool {
        let wait = self.backoff.delay_for(self.idle_streak);
        self.idle_streak = self.idle_streak.saturating_add(1);

        tokio::select! {
            _ = self.shutdown_rx.recv() => {
                self.stopped = true;
            }
            () = tokio::time::sleep(wait) => {}
        }
        !self.stopped
    }

    /// Consecutive empty polls since the last productive one.
    pub fn idle_streak(&self) -> u32 {
        self.idle_streak
    }
}
