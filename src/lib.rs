// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod clock;
pub mod config;
pub mod ingest;
pub mod model;
pub mod notify;
pub mod telemetry;
pub mod translate;

// ---- Re-exports for stable public API ----
pub use crate::config::WatchConfig;
pub use crate::ingest::cache::QuakeCache;
pub use crate::ingest::reconcile::{find_new, Reconciler};
pub use crate::ingest::scheduler::{
    Connectivity, CycleOutcome, PollScheduler, SchedulerConfig, SchedulerHandle, Visibility,
};
pub use crate::ingest::types::{FetchError, QuakeSource};
pub use crate::model::{Quake, Severity, SourceTag};
pub use crate::notify::{FeedEvent, FeedStatus, QuakeUpdate, UpdateBroadcaster, UpdateOrigin};

use anyhow::Context;
use std::sync::Arc;

/// Wire sources, cache, broadcaster and scheduler from a loaded config.
///
/// ```ignore
/// let cfg = quake_watch::WatchConfig::load_default()?;
/// let scheduler = quake_watch::build_scheduler(&cfg)?;
/// let handle = scheduler.spawn();
/// ```
pub fn build_scheduler(cfg: &WatchConfig) -> anyhow::Result<PollScheduler> {
    let sources = ingest::build_sources(cfg).context("building sources")?;
    if sources.is_empty() {
        tracing::warn!("no sources enabled; every cycle will fail");
    }
    let cache = Arc::new(QuakeCache::new(cfg.cache_freshness()));
    Ok(PollScheduler::new(
        sources,
        cache,
        UpdateBroadcaster::new(),
        SchedulerConfig::from(cfg),
    ))
}
