// tests/common/mod.rs
// Shared test doubles for scheduler/pipeline tests.
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use quake_watch::{FeedEvent, FetchError, Quake, QuakeSource, SourceTag, UpdateBroadcaster};
use tokio::sync::Semaphore;

/// Quake at 2024-01-01T00:00Z plus `mins` minutes.
pub fn quake(id: &str, mins: i64, tag: SourceTag) -> Quake {
    let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    Quake::new(id, base + Duration::minutes(mins), tag)
}

/// Source whose data and failure mode can be flipped between cycles.
pub struct MockSource {
    name: &'static str,
    tag: SourceTag,
    data: Mutex<Vec<Quake>>,
    fail: AtomicBool,
    calls: AtomicUsize,
}

impl MockSource {
    pub fn ok(name: &'static str, tag: SourceTag, data: Vec<Quake>) -> Arc<Self> {
        Arc::new(Self {
            name,
            tag,
            data: Mutex::new(data),
            fail: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing(name: &'static str, tag: SourceTag) -> Arc<Self> {
        let s = Self::ok(name, tag, vec![]);
        s.set_failing(true);
        s
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn set_data(&self, data: Vec<Quake>) {
        *self.data.lock().unwrap() = data;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QuakeSource for MockSource {
    async fn fetch(&self) -> Result<Vec<Quake>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(FetchError::Status {
                url: format!("mock://{}", self.name),
                status: 503,
            });
        }
        Ok(self.data.lock().unwrap().clone())
    }

    fn name(&self) -> &'static str {
        self.name
    }

    fn tag(&self) -> SourceTag {
        self.tag
    }
}

/// Source that blocks inside `fetch` until the test opens the gate.
pub struct GatedSource {
    pub gate: Semaphore,
    data: Vec<Quake>,
}

impl GatedSource {
    pub fn new(data: Vec<Quake>) -> Arc<Self> {
        Arc::new(Self {
            gate: Semaphore::new(0),
            data,
        })
    }

    pub fn open(&self) {
        self.gate.add_permits(1);
    }
}

#[async_trait]
impl QuakeSource for GatedSource {
    async fn fetch(&self) -> Result<Vec<Quake>, FetchError> {
        let permit = self.gate.acquire().await.expect("gate closed");
        permit.forget();
        Ok(self.data.clone())
    }

    fn name(&self) -> &'static str {
        "gated"
    }

    fn tag(&self) -> SourceTag {
        SourceTag::Primary
    }
}

/// Subscribe a recorder and return the shared event log.
pub fn record_events(b: &UpdateBroadcaster) -> Arc<Mutex<Vec<FeedEvent>>> {
    let log = Arc::new(Mutex::new(Vec::new()));
    let sink = log.clone();
    let _sub = b.subscribe(move |ev| sink.lock().unwrap().push(ev.clone()));
    log
}

pub fn as_source<S: QuakeSource + 'static>(s: &Arc<S>) -> Arc<dyn QuakeSource> {
    s.clone()
}

pub fn ids(quakes: &[Quake]) -> Vec<&str> {
    quakes.iter().map(|q| q.id.as_str()).collect()
}
