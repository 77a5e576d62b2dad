// src/ingest/cache.rs
//! Single-slot, time-boxed holder of the last reconciled set.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::clock::{Clock, SystemClock};
use crate::model::Quake;

pub const DEFAULT_FRESHNESS: Duration = Duration::from_secs(30);

#[derive(Debug, Default, Clone)]
struct Slot {
    data: Option<Vec<Quake>>,
    timestamp_ms: i64,
    last_seen_id: Option<String>,
}

pub struct QuakeCache {
    slot: Mutex<Slot>,
    freshness: Duration,
    clock: Arc<dyn Clock>,
}

impl QuakeCache {
    pub fn new(freshness: Duration) -> Self {
        Self::with_clock(freshness, Arc::new(SystemClock))
    }

    pub fn with_clock(freshness: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            slot: Mutex::new(Slot::default()),
            freshness,
            clock,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self) -> Option<Vec<Quake>> {
        self.lock().data.clone()
    }

    /// True iff data is present and younger than the freshness window.
    pub fn is_valid(&self) -> bool {
        let slot = self.lock();
        if slot.data.is_none() {
            return false;
        }
        let age_ms = self.clock.now_ms().saturating_sub(slot.timestamp_ms);
        u128::try_from(age_ms).map_or(true, |age| age < self.freshness.as_millis())
    }

    /// Overwrites data and timestamp in one step.
    pub fn put(&self, data: Vec<Quake>) {
        let now = self.clock.now_ms();
        let mut slot = self.lock();
        if let Some(first) = data.first() {
            slot.last_seen_id = Some(first.id.clone());
        }
        slot.data = Some(data);
        slot.timestamp_ms = now;
    }

    pub fn clear(&self) {
        *self.lock() = Slot::default();
    }

    pub fn last_seen_id(&self) -> Option<String> {
        self.lock().last_seen_id.clone()
    }

    pub fn timestamp_ms(&self) -> i64 {
        self.lock().timestamp_ms
    }

    /// Clock shared with the rest of the pipeline.
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn freshness(&self) -> Duration {
        self.freshness
    }
}
