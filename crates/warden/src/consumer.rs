use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use warden_core::DelayedTask;
use warden_state::StateError;

use crate::poll::PollLoop;
use crate::queue::{DelayQueue, PollOutcome};

/// Processes tasks claimed from a [`DelayQueue`].
///
/// Plain async closures taking a [`DelayedTask`] implement this trait.
#[async_trait]
pub trait TaskHandler: Send + Sync {
    /// Run a claimed task. The task has already left the queue.
    async fn handle(&self, task: DelayedTask);

    /// Called for a claimed member that does not decode as a task.
    async fn malformed(&self, member: &str, error: &StateError) {
        warn!(member, %error, "discarding malformed queue member");
    }
}

#[async_trait]
impl<F, Fut> TaskHandler for F
where
    F: Fn(DelayedTask) -> Fut + Send + Sync,
    Fut: Future<Output = ()> + Send,
{
    async fn handle(&self, task: DelayedTask) {
        (self)(task).await;
    }
}

/// Counters for one consumer run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsumerStats {
    pub claimed: u64,
    pub lost: u64,
    pub malformed: u64,
    pub idle_polls: u64,
}

/// Long-running loop that claims due tasks and hands them to a handler.
///
/// Any number of consumers may run against the same queue name; each due
/// task is handled by at most one of them.
pub struct QueueConsumer {
    queue: DelayQueue,
    handler: Arc<dyn TaskHandler>,
    poller: PollLoop,
}

impl QueueConsumer {
    pub fn new(queue: DelayQueue, handler: Arc<dyn TaskHandler>, poller: PollLoop) -> Self {
        Self {
            queue,
            handler,
            poller,
        }
    }

    /// Run until the stop signal arrives.
    ///
    /// A store error ends the run and is returned; the caller decides whether
    /// to restart. The handler is never interrupted by a stop request.
    pub async fn run(&mut self) -> Result<ConsumerStats, StateError> {
        let mut stats = ConsumerStats::default();
        info!(queue = self.queue.name(), "queue consumer started");

        while self.poller.should_continue() {
            let outcome = match self.queue.poll_once().await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(queue = self.queue.name(), error = %e, "queue poll failed");
                    return Err(e);
                }
            };

            match outcome {
                PollOutcome::Empty => {
                    stats.idle_polls += 1;
                    if !self.poller.idle().await {
                        break;
                    }
                }
                PollOutcome::Lost => {
                    stats.lost += 1;
                    debug!(queue = self.queue.name(), "due task claimed by another consumer");
                    self.poller.worked();
                }
                PollOutcome::Claimed(task) => {
                    stats.claimed += 1;
                    debug!(queue = self.queue.name(), task_id = %task.id, "task claimed");
                    self.handler.handle(task).await;
                    self.poller.worked();
                }
                PollOutcome::Malformed { member, error } => {
                    stats.malformed += 1;
                    self.handler.malformed(&member, &error).await;
                    self.poller.worked();
                }
            }
        }

        info!(
            queue = self.queue.name(),
            claimed = stats.claimed,
            lost = stats.lost,
            malformed = stats.malformed,
            "queue consumer stopped"
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use warden_core::{QueueConfig, TokioClock};
    use warden_state::DelayStore;
    use warden_state_memory::MemoryDelayStore;

    use super::*;

    fn queue(store: &Arc<MemoryDelayStore>) -> DelayQueue {
        DelayQueue::new(
            Arc::clone(store) as Arc<dyn DelayStore>,
            "test-queue",
            QueueConfig {
                delay_ms: 1_000,
                poll_interval_ms: 100,
                max_poll_interval_ms: None,
            },
        )
        .with_clock(Arc::new(TokioClock::starting_at(1_700_000_000_000)))
    }

    #[derive(Default)]
    struct Recorder {
        handled: Mutex<Vec<Vec<u8>>>,
        malformed: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl TaskHandler for Recorder {
        async fn handle(&self, task: DelayedTask) {
            self.handled.lock().unwrap().push(task.payload);
        }

        async fn malformed(&self, member: &str, _error: &StateError) {
            self.malformed.lock().unwrap().push(member.to_owned());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn handles_due_tasks_then_stops() {
        let store = Arc::new(MemoryDelayStore::new());
        let queue = queue(&store);
        queue.enqueue(b"a".to_vec()).await.unwrap();
        queue.enqueue(b"b".to_vec()).await.unwrap();

        let recorder = Arc::new(Recorder::default());
        let (mut consumer, stop) = queue.consumer(Arc::clone(&recorder));
        let run = tokio::spawn(async move { consumer.run().await });

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(recorder.handled.lock().unwrap().is_empty());

        tokio::time::sleep(Duration::from_millis(700)).await;
        stop.send(()).await.unwrap();
        let stats = run.await.unwrap().unwrap();

        let mut handled = recorder.handled.lock().unwrap().clone();
        handled.sort();
        assert_eq!(handled, vec![b"a".to_vec(), b"b".to_vec()]);
        assert_eq!(stats.claimed, 2);
        assert!(stats.idle_polls > 0);
        assert_eq!(queue.pending().await.unwrap(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn closure_handler() {
        let store = Arc::new(MemoryDelayStore::new());
        let queue = queue(&store);
        queue
            .enqueue_after(b"c".to_vec(), Duration::ZERO)
            .await
            .unwrap();

        let (seen_tx, mut seen_rx) = tokio::sync::mpsc::unbounded_channel();
        let (mut consumer, stop) = queue.consumer(Arc::new(move |task: DelayedTask| {
            let seen_tx = seen_tx.clone();
            async move {
                let _ = seen_tx.send(task.payload);
            }
        }));
        let run = tokio::spawn(async move { consumer.run().await });

        assert_eq!(seen_rx.recv().await.unwrap(), b"c".to_vec());
        drop(stop);
        assert_eq!(run.await.unwrap().unwrap().claimed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_member_goes_to_handler() {
        let store = Arc::new(MemoryDelayStore::new());
        let queue = queue(&store);
        store.schedule("test-queue", "not-a-task", 0).await.unwrap();

        let recorder = Arc::new(Recorder::default());
        let (mut consumer, stop) = queue.consumer(Arc::clone(&recorder));
        let run = tokio::spawn(async move { consumer.run().await });

        tokio::time::sleep(Duration::from_millis(250)).await;
        stop.send(()).await.unwrap();
        let stats = run.await.unwrap().unwrap();

        assert_eq!(stats.malformed, 1);
        assert_eq!(*recorder.malformed.lock().unwrap(), vec!["not-a-task".to_owned()]);
        assert!(recorder.handled.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_before_start_never_polls() {
        let store = Arc::new(MemoryDelayStore::new());
        let queue = queue(&store);
        queue
            .enqueue_after(b"left".to_vec(), Duration::ZERO)
            .await
            .unwrap();

        let recorder = Arc::new(Recorder::default());
        let (mut consumer, stop) = queue.consumer(Arc::clone(&recorder));
        stop.send(()).await.unwrap();

        let stats = consumer.run().await.unwrap();
        assert_eq!(stats, ConsumerStats::default());
        assert_eq!(queue.pending().await.unwrap(), 1);
    }

    struct FailingStore;

    #[async_trait]
    impl DelayStore for FailingStore {
        async fn schedule(&self, _: &str, _: &str, _: i64) -> Result<(), StateError> {
            Ok(())
        }

        async fn first_due(&self, _: &str, _: i64) -> Result<Option<String>, StateError> {
            Err(StateError::Connection("refused".into()))
        }

        async fn claim(&self, _: &str, _: &str) -> Result<bool, StateError> {
            Ok(false)
        }

        async fn pending(&self, _: &str) -> Result<u64, StateError> {
            Ok(0)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn store_error_ends_run() {
        let queue = DelayQueue::new(Arc::new(FailingStore), "test-queue", QueueConfig::default());
        let (mut consumer, _stop) = queue.consumer(Arc::new(|_task: DelayedTask| async {}));

        let err = consumer.run().await.unwrap_err();
        assert!(matches!(err, StateError::Connection(_)));
    }
}
