use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::time::Instant;

use warden_state::error::StateError;
use warden_state::lock::DistributedLock;

use crate::expiry::{SweepSchedule, expiry_from_ttl};

/// Internal entry representing a held lock.
#[derive(Debug, Clone)]
struct LockEntry {
    owner: String,
    expires_at: Instant,
}

impl LockEntry {
    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// In-memory [`DistributedLock`] backed by a [`DashMap`].
///
/// Expiry is lazy: an expired entry is treated as absent and replaced by the
/// next acquirer. Acquires also sweep out every expired entry, at most once
/// per second.
#[derive(Debug, Clone, Default)]
pub struct MemoryDistributedLock {
    locks: Arc<DashMap<String, LockEntry>>,
    sweeps: Arc<SweepSchedule>,
}

impl MemoryDistributedLock {
    pub fn new() -> Self {
        Self::default()
    }

    fn sweep_expired(&self) {
        if self.sweeps.claim_due() {
            self.locks.retain(|_, entry| !entry.is_expired());
        }
    }
}

#[async_trait]
impl DistributedLock for MemoryDistributedLock {
    async fn try_acquire(
        &self,
        key: &str,
        owner: &str,
        ttl: Duration,
    ) -> Result<bool, StateError> {
        self.sweep_expired();
        let fresh = LockEntry {
            owner: owner.to_owned(),
            expires_at: expiry_from_ttl(ttl),
        };
        match self.locks.entry(key.to_owned()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().is_expired() {
                    occupied.insert(fresh);
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(fresh);
                Ok(true)
            }
        }
    }

    async fn release(&self, key: &str, owner: &str) -> Result<bool, StateError> {
        let removed = self
            .locks
            .remove_if(key, |_, entry| entry.owner == owner && !entry.is_expired());
        Ok(removed.is_some())
    }

    async fn extend(&self, key: &str, owner: &str, ttl: Duration) -> Result<bool, StateError> {
        let Some(mut entry) = self.locks.get_mut(key) else {
            return Ok(false);
        };
        if entry.owner != owner || entry.is_expired() {
            return Ok(false);
        }
        entry.expires_at = expiry_from_ttl(ttl);
        Ok(true)
    }

    async fn owner(&self, key: &str) -> Result<Option<String>, StateError> {
        Ok(self
            .locks
            .get(key)
            .filter(|entry| !entry.is_expired())
            .map(|entry| entry.owner.clone()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use warden_state::testing::run_lock_conformance_tests;

    use super::*;

    #[tokio::test]
    async fn conformance() {
        let lock = MemoryDistributedLock::new();
        run_lock_conformance_tests(&lock)
            .await
            .expect("lock conformance tests should pass");
    }

    #[tokio::test(start_paused = true)]
    async fn lock_expires_after_ttl() {
        let lock = MemoryDistributedLock::new();

        assert!(
            lock.try_acquire("expire-lock", "owner-a", Duration::from_secs(2))
                .await
                .unwrap()
        );
        assert!(
            !lock
                .try_acquire("expire-lock", "owner-b", Duration::from_secs(2))
                .await
                .unwrap()
        );

        tokio::time::advance(Duration::from_secs(3)).await;

        assert!(lock.owner("expire-lock").await.unwrap().is_none());
        assert!(
            lock.try_acquire("expire-lock", "owner-b", Duration::from_secs(10))
                .await
                .unwrap(),
            "should acquire after TTL expiry"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn stale_owner_cannot_release_successor() {
        let lock = MemoryDistributedLock::new();

        assert!(
            lock.try_acquire("handover", "owner-a", Duration::from_secs(1))
                .await
                .unwrap()
        );
        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(
            lock.try_acquire("handover", "owner-b", Duration::from_secs(10))
                .await
                .unwrap()
        );

        // owner-a finishes late and tries to clean up.
        assert!(!lock.release("handover", "owner-a").await.unwrap());
        assert_eq!(
            lock.owner("handover").await.unwrap().as_deref(),
            Some("owner-b")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn extend_keeps_lock_alive() {
        let lock = MemoryDistributedLock::new();

        assert!(
            lock.try_acquire("extended", "owner-a", Duration::from_secs(2))
                .await
                .unwrap()
        );
        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(
            lock.extend("extended", "owner-a", Duration::from_secs(5))
                .await
                .unwrap()
        );
        tokio::time::advance(Duration::from_secs(3)).await;
        assert_eq!(
            lock.owner("extended").await.unwrap().as_deref(),
            Some("owner-a")
        );

        tokio::time::advance(Duration::from_secs(3)).await;
        assert!(
            !lock
                .extend("extended", "owner-a", Duration::from_secs(5))
                .await
                .unwrap(),
            "an expired lock cannot be extended"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn huge_ttl_does_not_overflow() {
        let lock = MemoryDistributedLock::new();

        assert!(
            lock.try_acquire("forever", "owner-a", Duration::MAX)
                .await
                .unwrap()
        );
        assert!(
            lock.extend("forever", "owner-a", Duration::MAX)
                .await
                .unwrap()
        );

        tokio::time::advance(Duration::from_secs(365 * 24 * 60 * 60)).await;
        assert_eq!(
            lock.owner("forever").await.unwrap().as_deref(),
            Some("owner-a")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn expired_locks_are_evicted() {
        let lock = MemoryDistributedLock::new();
        for i in 0..100 {
            let key = format!("short-{i}");
            assert!(
                lock.try_acquire(&key, "owner", Duration::from_secs(1))
                    .await
                    .unwrap()
            );
        }
        assert_eq!(lock.locks.len(), 100);

        tokio::time::advance(Duration::from_secs(3_600)).await;
        assert!(
            lock.try_acquire("fresh", "owner", Duration::from_secs(30))
                .await
                .unwrap()
        );
        assert_eq!(lock.locks.len(), 1);
    }

    #[tokio::test]
    async fn concurrent_tasks_single_winner() {
        let lock = Arc::new(MemoryDistributedLock::new());
        let winners = Arc::new(AtomicU32::new(0));

        let mut handles = Vec::new();
        for i in 0..10 {
            let lock = Arc::clone(&lock);
            let winners = Arc::clone(&winners);
            handles.push(tokio::spawn(async move {
                let owner = format!("task-{i}");
                if lock
                    .try_acquire("contention-lock", &owner, Duration::from_secs(30))
                    .await
                    .expect("store call should succeed")
                {
                    winners.fetch_add(1, Ordering::SeqCst);
                }
            }));
        }

        for h in handles {
            h.await.expect("task should not panic");
        }

        assert_eq!(winners.load(Ordering::SeqCst), 1);
    }
}
