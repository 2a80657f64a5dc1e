use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::debug;

use warden_core::{Clock, DelayedTask, QueueConfig, SystemClock, TaskId};
use warden_state::{DelayStore, StateError};

use crate::consumer::{QueueConsumer, TaskHandler};
use crate::poll::PollLoop;

/// Result of a single poll-and-claim attempt.
#[derive(Debug)]
pub enum PollOutcome {
    /// Nothing is due yet.
    Empty,
    /// A due member was found but another consumer removed it first.
    Lost,
    /// This consumer removed the member and owns the task.
    Claimed(DelayedTask),
    /// This consumer removed the member but it does not decode. The member is
    /// gone from the queue and will not be redelivered.
    Malformed { member: String, error: StateError },
}

/// A named delay queue stored as one sorted set, scored by readiness time.
///
/// Delivery is at-least-once up to the claim and at-most-once after it: a
/// member is removed before its handler runs, so a consumer that crashes
/// mid-handler loses that task.
#[derive(Clone)]
pub struct DelayQueue {
    store: Arc<dyn DelayStore>,
    clock: Arc<dyn Clock>,
    name: String,
    config: QueueConfig,
}

impl DelayQueue {
    pub fn new(store: Arc<dyn DelayStore>, name: impl Into<String>, config: QueueConfig) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            name: name.into(),
            config,
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Enqueue `payload` to become due after the queue's configured delay.
    pub async fn enqueue(&self, payload: impl Into<Vec<u8>>) -> Result<TaskId, StateError> {
        self.enqueue_after(payload, self.config.delay()).await
    }

    /// Enqueue `payload` to become due after `delay`.
    pub async fn enqueue_after(
        &self,
        payload: impl Into<Vec<u8>>,
        delay: Duration,
    ) -> Result<TaskId, StateError> {
        let task = DelayedTask::new(payload);
        let member = task.encode()?;
        let delay_ms = i64::try_from(delay.as_millis()).unwrap_or(i64::MAX);
        let ready_at_ms = self.clock.now_millis().saturating_add(delay_ms);

        self.store.schedule(&self.name, &member, ready_at_ms).await?;
        debug!(queue = %self.name, task_id = %task.id, ready_at_ms, "task enqueued");
        Ok(task.id)
    }

    /// Look for one due member and try to claim it.
    pub async fn poll_once(&self) -> Result<PollOutcome, StateError> {
        let now_ms = self.clock.now_millis();
        let Some(member) = self.store.first_due(&self.name, now_ms).await? else {
            return Ok(PollOutcome::Empty);
        };

        if !self.store.claim(&self.name, &member).await? {
            return Ok(PollOutcome::Lost);
        }

        Ok(match DelayedTask::decode(&member) {
            Ok(task) => PollOutcome::Claimed(task),
            Err(e) => PollOutcome::Malformed {
                member,
                error: e.into(),
            },
        })
    }

    /// Members still pending, due or not.
    pub async fn pending(&self) -> Result<u64, StateError> {
        self.store.pending(&self.name).await
    }

    /// Build a consumer for this queue and the sender that stops it.
    pub fn consumer<H>(&self, handler: Arc<H>) -> (QueueConsumer, mpsc::Sender<()>)
    where
        H: TaskHandler + 'static,
    {
        let (poller, shutdown_tx) = PollLoop::channel(self.config.idle_backoff());
        (QueueConsumer::new(self.clone(), handler, poller), shutdown_tx)
    }
}

#[cfg(test)]
mod tests {
    use futures::future::join_all;
    use warden_core::TokioClock;
    use warden_state_memory::MemoryDelayStore;

    use super::*;

    fn queue(store: &Arc<MemoryDelayStore>) -> DelayQueue {
        DelayQueue::new(
            Arc::clone(store) as Arc<dyn DelayStore>,
            "test-queue",
            QueueConfig {
                delay_ms: 5_000,
                ..QueueConfig::default()
            },
        )
        .with_clock(Arc::new(TokioClock::starting_at(1_700_000_000_000)))
    }

    #[tokio::test(start_paused = true)]
    async fn not_claimable_before_ready() {
        let store = Arc::new(MemoryDelayStore::new());
        let queue = queue(&store);

        queue.enqueue(b"lwh0".to_vec()).await.unwrap();
        assert!(matches!(queue.poll_once().await.unwrap(), PollOutcome::Empty));

        tokio::time::advance(Duration::from_millis(4_999)).await;
        assert!(matches!(queue.poll_once().await.unwrap(), PollOutcome::Empty));
        assert_eq!(queue.pending().await.unwrap(), 1);

        tokio::time::advance(Duration::from_millis(1)).await;
        match queue.poll_once().await.unwrap() {
            PollOutcome::Claimed(task) => assert_eq!(task.payload, b"lwh0"),
            other => panic!("expected a claim, got {other:?}"),
        }
        assert_eq!(queue.pending().await.unwrap(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn claimed_task_carries_enqueued_id_and_payload() {
        let store = Arc::new(MemoryDelayStore::new());
        let queue = queue(&store);

        for payload in [Vec::new(), vec![0, 159, 146, 150], b"{\"json\":true}".to_vec()] {
            let id = queue
                .enqueue_after(payload.clone(), Duration::ZERO)
                .await
                .unwrap();
            match queue.poll_once().await.unwrap() {
                PollOutcome::Claimed(task) => {
                    assert_eq!(task.id, id);
                    assert_eq!(task.payload, payload);
                }
                other => panic!("expected a claim, got {other:?}"),
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_pollers_claim_once() {
        let store = Arc::new(MemoryDelayStore::new());
        let queue = queue(&store);
        queue
            .enqueue_after(b"once".to_vec(), Duration::ZERO)
            .await
            .unwrap();

        let pollers: Vec<DelayQueue> = (0..8).map(|_| queue.clone()).collect();
        let outcomes = join_all(pollers.iter().map(|q| q.poll_once())).await;

        let claimed = outcomes
            .iter()
            .filter(|o| matches!(o, Ok(PollOutcome::Claimed(_))))
            .count();
        assert_eq!(claimed, 1);
        assert!(outcomes.iter().all(|o| matches!(
            o,
            Ok(PollOutcome::Claimed(_) | PollOutcome::Lost | PollOutcome::Empty)
        )));
    }

    /// Hands out a due member, then lets a rival remove it before the caller
    /// gets to claim.
    struct RivalStore(MemoryDelayStore);

    #[async_trait::async_trait]
    impl DelayStore for RivalStore {
        async fn schedule(
            &self,
            queue: &str,
            member: &str,
            ready_at_ms: i64,
        ) -> Result<(), StateError> {
            self.0.schedule(queue, member, ready_at_ms).await
        }

        async fn first_due(
            &self,
            queue: &str,
            now_ms: i64,
        ) -> Result<Option<String>, StateError> {
            let due = self.0.first_due(queue, now_ms).await?;
            if let Some(member) = &due {
                self.0.claim(queue, member).await?;
            }
            Ok(due)
        }

        async fn claim(&self, queue: &str, member: &str) -> Result<bool, StateError> {
            self.0.claim(queue, member).await
        }

        async fn pending(&self, queue: &str) -> Result<u64, StateError> {
            self.0.pending(queue).await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn racing_claim_reports_lost() {
        let queue = DelayQueue::new(
            Arc::new(RivalStore(MemoryDelayStore::new())),
            "test-queue",
            QueueConfig::default(),
        )
        .with_clock(Arc::new(TokioClock::starting_at(0)));
        queue
            .enqueue_after(b"x".to_vec(), Duration::ZERO)
            .await
            .unwrap();

        assert!(matches!(queue.poll_once().await.unwrap(), PollOutcome::Lost));
        assert_eq!(queue.pending().await.unwrap(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_member_is_consumed() {
        let store = Arc::new(MemoryDelayStore::new());
        let queue = queue(&store);
        store.schedule("test-queue", "garbage", 0).await.unwrap();

        match queue.poll_once().await.unwrap() {
            PollOutcome::Malformed { member, error } => {
                assert_eq!(member, "garbage");
                assert!(matches!(error, StateError::Serialization(_)));
            }
            other => panic!("expected malformed, got {other:?}"),
        }
        assert_eq!(queue.pending().await.unwrap(), 0, "malformed member must not be redelivered");
        assert!(matches!(queue.poll_once().await.unwrap(), PollOutcome::Empty));
    }
}
