//! Backend conformance suites.
//!
//! Each backend crate calls these from its own test module with a fresh
//! instance, so every backend is held to the same observable behavior.

use std::time::Duration;

use futures::future::join_all;

use crate::error::StateError;
use crate::lock::DistributedLock;
use crate::queue::DelayStore;
use crate::window::WindowStore;

/// Run the full distributed lock conformance test suite.
///
/// # Errors
///
/// Returns an error if the backend fails a store call.
pub async fn run_lock_conformance_tests(lock: &dyn DistributedLock) -> Result<(), StateError> {
    test_acquire_and_release(lock).await?;
    test_acquire_contention(lock).await?;
    test_foreign_release_is_refused(lock).await?;
    test_extend_requires_ownership(lock).await?;
    test_concurrent_acquire_single_winner(lock).await?;
    Ok(())
}

async fn test_acquire_and_release(lock: &dyn DistributedLock) -> Result<(), StateError> {
    let ttl = Duration::from_secs(10);
    assert!(lock.try_acquire("conf-lock-1", "owner-a", ttl).await?);
    assert_eq!(lock.owner("conf-lock-1").await?.as_deref(), Some("owner-a"));

    assert!(lock.release("conf-lock-1", "owner-a").await?);
    assert!(lock.owner("conf-lock-1").await?.is_none());

    assert!(
        !lock.release("conf-lock-1", "owner-a").await?,
        "second release should report nothing deleted"
    );
    Ok(())
}

async fn test_acquire_contention(lock: &dyn DistributedLock) -> Result<(), StateError> {
    let ttl = Duration::from_secs(10);
    assert!(lock.try_acquire("conf-lock-2", "owner-a", ttl).await?);
    assert!(
        !lock.try_acquire("conf-lock-2", "owner-b", ttl).await?,
        "second acquire should fail while lock is held"
    );
    assert!(
        !lock.try_acquire("conf-lock-2", "owner-a", ttl).await?,
        "acquire is not reentrant"
    );
    assert!(lock.release("conf-lock-2", "owner-a").await?);
    assert!(lock.try_acquire("conf-lock-2", "owner-b", ttl).await?);
    assert!(lock.release("conf-lock-2", "owner-b").await?);
    Ok(())
}

async fn test_foreign_release_is_refused(lock: &dyn DistributedLock) -> Result<(), StateError> {
    let ttl = Duration::from_secs(10);
    assert!(lock.try_acquire("conf-lock-3", "owner-a", ttl).await?);

    assert!(
        !lock.release("conf-lock-3", "owner-b").await?,
        "non-owner release must be refused"
    );
    assert_eq!(
        lock.owner("conf-lock-3").await?.as_deref(),
        Some("owner-a"),
        "non-owner release must not delete the lock"
    );

    assert!(lock.release("conf-lock-3", "owner-a").await?);
    Ok(())
}

async fn test_extend_requires_ownership(lock: &dyn DistributedLock) -> Result<(), StateError> {
    assert!(
        lock.try_acquire("conf-lock-4", "owner-a", Duration::from_secs(5))
            .await?
    );
    assert!(
        lock.extend("conf-lock-4", "owner-a", Duration::from_secs(10))
            .await?
    );
    assert!(
        !lock
            .extend("conf-lock-4", "owner-b", Duration::from_secs(10))
            .await?
    );
    assert!(
        !lock
            .extend("conf-lock-missing", "owner-a", Duration::from_secs(10))
            .await?
    );
    assert!(lock.release("conf-lock-4", "owner-a").await?);
    Ok(())
}

async fn test_concurrent_acquire_single_winner(
    lock: &dyn DistributedLock,
) -> Result<(), StateError> {
    let owners: Vec<String> = (0..16).map(|i| format!("racer-{i}")).collect();
    let attempts = owners
        .iter()
        .map(|owner| lock.try_acquire("conf-lock-5", owner, Duration::from_secs(10)));

    let mut winners = Vec::new();
    for (owner, result) in owners.iter().zip(join_all(attempts).await) {
        if result? {
            winners.push(owner.clone());
        }
    }
    assert_eq!(winners.len(), 1, "exactly one racer should win the lock");
    assert!(lock.release("conf-lock-5", &winners[0]).await?);
    Ok(())
}

/// Run the sliding-window store conformance test suite.
///
/// Timestamps are synthetic; the suite never sleeps.
///
/// # Errors
///
/// Returns an error if the backend fails a store call.
pub async fn run_window_conformance_tests(store: &dyn WindowStore) -> Result<(), StateError> {
    test_window_counts_current_event(store).await?;
    test_window_same_millisecond_counts_once(store).await?;
    test_window_trims_old_events(store).await?;
    test_window_boundary_is_inclusive(store).await?;
    test_window_keys_are_independent(store).await?;
    test_window_fractional_period(store).await?;
    Ok(())
}

const BASE_MS: i64 = 1_700_000_000_000;

async fn test_window_counts_current_event(store: &dyn WindowStore) -> Result<(), StateError> {
    let window = Duration::from_secs(1);
    let mut expected = 0;
    for offset in [0, 100, 200, 300, 400] {
        expected += 1;
        let count = store
            .record_and_count("hist:conf-1:reply", BASE_MS + offset, window)
            .await?;
        assert_eq!(count, expected);
    }
    Ok(())
}

async fn test_window_same_millisecond_counts_once(
    store: &dyn WindowStore,
) -> Result<(), StateError> {
    let window = Duration::from_secs(1);
    assert_eq!(
        store
            .record_and_count("hist:conf-2:reply", BASE_MS, window)
            .await?,
        1
    );
    assert_eq!(
        store
            .record_and_count("hist:conf-2:reply", BASE_MS, window)
            .await?,
        1,
        "members are unique per timestamp"
    );
    Ok(())
}

async fn test_window_trims_old_events(store: &dyn WindowStore) -> Result<(), StateError> {
    let window = Duration::from_secs(1);
    for i in 0..3i64 {
        store
            .record_and_count("hist:conf-3:reply", BASE_MS + i, window)
            .await?;
    }
    let count = store
        .record_and_count("hist:conf-3:reply", BASE_MS + 1_500, window)
        .await?;
    assert_eq!(count, 1, "events older than the window must be trimmed");
    Ok(())
}

async fn test_window_boundary_is_inclusive(store: &dyn WindowStore) -> Result<(), StateError> {
    let window = Duration::from_secs(1);
    store
        .record_and_count("hist:conf-4:reply", BASE_MS, window)
        .await?;
    let count = store
        .record_and_count("hist:conf-4:reply", BASE_MS + 1_000, window)
        .await?;
    assert_eq!(count, 2, "an event exactly one window old is still counted");

    let count = store
        .record_and_count("hist:conf-4:reply", BASE_MS + 1_001, window)
        .await?;
    assert_eq!(count, 2, "the oldest event falls out one millisecond later");
    Ok(())
}

async fn test_window_keys_are_independent(store: &dyn WindowStore) -> Result<(), StateError> {
    let window = Duration::from_secs(60);
    store
        .record_and_count("hist:conf-5:reply", BASE_MS, window)
        .await?;
    store
        .record_and_count("hist:conf-5:reply", BASE_MS + 1, window)
        .await?;
    let other = store
        .record_and_count("hist:conf-5:post", BASE_MS + 2, window)
        .await?;
    assert_eq!(other, 1);
    Ok(())
}

async fn test_window_fractional_period(store: &dyn WindowStore) -> Result<(), StateError> {
    let window = Duration::from_millis(1_500);
    store
        .record_and_count("hist:conf-6:reply", BASE_MS, window)
        .await?;
    store
        .record_and_count("hist:conf-6:reply", BASE_MS + 1, window)
        .await?;
    let count = store
        .record_and_count("hist:conf-6:reply", BASE_MS + 1_101, window)
        .await?;
    assert_eq!(count, 3, "events under 1.5s old are counted");

    let count = store
        .record_and_count("hist:conf-6:reply", BASE_MS + 1_501, window)
        .await?;
    assert_eq!(count, 3, "only the event older than 1.5s falls out");
    Ok(())
}

/// Run the delay-set conformance test suite.
///
/// # Errors
///
/// Returns an error if the backend fails a store call.
pub async fn run_delay_conformance_tests(store: &dyn DelayStore) -> Result<(), StateError> {
    test_delay_not_due_before_score(store).await?;
    test_delay_due_at_score(store).await?;
    test_delay_lowest_score_first(store).await?;
    test_delay_claim_once(store).await?;
    test_delay_concurrent_claims(store).await?;
    Ok(())
}

async fn test_delay_not_due_before_score(store: &dyn DelayStore) -> Result<(), StateError> {
    store.schedule("conf-q-1", "task-a", BASE_MS + 5_000).await?;
    assert!(store.first_due("conf-q-1", BASE_MS).await?.is_none());
    assert!(store.first_due("conf-q-1", BASE_MS + 4_999).await?.is_none());
    assert_eq!(store.pending("conf-q-1").await?, 1);
    Ok(())
}

async fn test_delay_due_at_score(store: &dyn DelayStore) -> Result<(), StateError> {
    store.schedule("conf-q-2", "task-a", BASE_MS).await?;
    assert_eq!(
        store.first_due("conf-q-2", BASE_MS).await?.as_deref(),
        Some("task-a"),
        "a member is due once its score equals now"
    );
    assert_eq!(
        store.pending("conf-q-2").await?,
        1,
        "first_due must not remove anything"
    );
    Ok(())
}

async fn test_delay_lowest_score_first(store: &dyn DelayStore) -> Result<(), StateError> {
    store.schedule("conf-q-3", "late", BASE_MS + 20).await?;
    store.schedule("conf-q-3", "early", BASE_MS + 10).await?;
    store.schedule("conf-q-3", "future", BASE_MS + 1_000).await?;

    let now = BASE_MS + 100;
    assert_eq!(
        store.first_due("conf-q-3", now).await?.as_deref(),
        Some("early")
    );
    assert!(store.claim("conf-q-3", "early").await?);
    assert_eq!(
        store.first_due("conf-q-3", now).await?.as_deref(),
        Some("late")
    );
    assert!(store.claim("conf-q-3", "late").await?);
    assert!(store.first_due("conf-q-3", now).await?.is_none());
    assert_eq!(store.pending("conf-q-3").await?, 1);
    Ok(())
}

async fn test_delay_claim_once(store: &dyn DelayStore) -> Result<(), StateError> {
    store.schedule("conf-q-4", "task-a", BASE_MS).await?;
    assert!(store.claim("conf-q-4", "task-a").await?);
    assert!(
        !store.claim("conf-q-4", "task-a").await?,
        "a claimed member cannot be claimed again"
    );
    assert!(!store.claim("conf-q-4", "never-scheduled").await?);
    assert_eq!(store.pending("conf-q-4").await?, 0);
    Ok(())
}

async fn test_delay_concurrent_claims(store: &dyn DelayStore) -> Result<(), StateError> {
    store.schedule("conf-q-5", "contested", BASE_MS).await?;

    let claims = (0..16).map(|_| store.claim("conf-q-5", "contested"));
    let mut removed = 0;
    for result in join_all(claims).await {
        if result? {
            removed += 1;
        }
    }
    assert_eq!(removed, 1, "exactly one claimant may remove the member");
    Ok(())
}
