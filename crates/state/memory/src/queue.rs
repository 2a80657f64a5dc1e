use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

use warden_state::error::StateError;
use warden_state::queue::DelayStore;

/// A sorted set: unique members, ordered by `(score, member)`.
#[derive(Debug, Default)]
struct PendingSet {
    scores: HashMap<String, i64>,
    ordered: BTreeSet<(i64, String)>,
}

impl PendingSet {
    fn insert(&mut self, member: &str, score: i64) {
        if let Some(previous) = self.scores.insert(member.to_owned(), score) {
            self.ordered.remove(&(previous, member.to_owned()));
        }
        self.ordered.insert((score, member.to_owned()));
    }

    fn remove(&mut self, member: &str) -> bool {
        match self.scores.remove(member) {
            Some(score) => self.ordered.remove(&(score, member.to_owned())),
            None => false,
        }
    }

    fn first_in(&self, min: i64, max: i64) -> Option<&str> {
        self.ordered
            .range((min, String::new())..)
            .next()
            .filter(|(score, _)| *score <= max)
            .map(|(_, member)| member.as_str())
    }
}

/// In-memory [`DelayStore`] keyed by queue name.
#[derive(Debug, Clone, Default)]
pub struct MemoryDelayStore {
    queues: Arc<DashMap<String, PendingSet>>,
}

impl MemoryDelayStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DelayStore for MemoryDelayStore {
    async fn schedule(
        &self,
        queue: &str,
        member: &str,
        ready_at_ms: i64,
    ) -> Result<(), StateError> {
        self.queues
            .entry(queue.to_owned())
            .or_default()
            .insert(member, ready_at_ms);
        Ok(())
    }

    async fn first_due(&self, queue: &str, now_ms: i64) -> Result<Option<String>, StateError> {
        Ok(self
            .queues
            .get(queue)
            .and_then(|set| set.first_in(0, now_ms).map(str::to_owned)))
    }

    async fn claim(&self, queue: &str, member: &str) -> Result<bool, StateError> {
        let Some(mut set) = self.queues.get_mut(queue) else {
            return Ok(false);
        };
        let removed = set.remove(member);
        let now_empty = set.scores.is_empty();
        drop(set);

        if now_empty {
            self.queues.remove_if(queue, |_, set| set.scores.is_empty());
        }
        Ok(removed)
    }

    async fn pending(&self, queue: &str) -> Result<u64, StateError> {
        Ok(self
            .queues
            .get(queue)
            .map_or(0, |set| set.scores.len() as u64))
    }
}
