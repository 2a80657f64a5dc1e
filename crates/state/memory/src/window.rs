use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::time::Instant;

use warden_state::error::StateError;
use warden_state::window::{WindowStore, window_expiry_secs, window_floor};

use crate::expiry::{SweepSchedule, expiry_from_ttl};

#[derive(Debug)]
struct History {
    events: BTreeSet<i64>,
    expires_at: Instant,
}

/// In-memory [`WindowStore`]: one ordered timestamp set per key.
///
/// Histories of subjects that stop acting are swept out once their key
/// expiry passes.
#[derive(Debug, Clone, Default)]
pub struct MemoryWindowStore {
    histories: Arc<DashMap<String, History>>,
    sweeps: Arc<SweepSchedule>,
}

impl MemoryWindowStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn sweep_expired(&self) {
        if self.sweeps.claim_due() {
            let now = Instant::now();
            self.histories.retain(|_, history| now < history.expires_at);
        }
    }
}

#[async_trait]
impl WindowStore for MemoryWindowStore {
    async fn record_and_count(
        &self,
        key: &str,
        now_ms: i64,
        window: Duration,
    ) -> Result<u64, StateError> {
        self.sweep_expired();
        let now = Instant::now();
        let mut history = self
            .histories
            .entry(key.to_owned())
            .or_insert_with(|| History {
                events: BTreeSet::new(),
                expires_at: now,
            });

        if now >= history.expires_at {
            history.events.clear();
        }

        history.events.insert(now_ms);
        let floor = window_floor(now_ms, window);
        let retained = history.events.split_off(&floor);
        history.events = retained;
        history.expires_at = expiry_from_ttl(Duration::from_secs(window_expiry_secs(window)));

        Ok(history.events.len() as u64)
    }
}
