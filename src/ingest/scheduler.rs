// src/ingest/scheduler.rs
//! Poll cycle execution and the background driver that schedules it.
//!
//! One cycle: fetch all sources -> reconcile -> cache -> publish.
//! Cycles never overlap: a single-permit semaphore guards execution and a cycle
//! requested while another is in flight is dropped, not queued.
//!
//! Phases: `Idle -> Polling -> Idle` on every cycle; after `error_threshold`
//! consecutive all-sources-failed cycles the scheduler enters `Degraded`, stops
//! ticking for `recovery_cooldown`, runs one `Recovering` cycle and returns to
//! `Idle` with the error count reset whatever the outcome.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use metrics::{counter, gauge};
use tokio::sync::{watch, Notify, Semaphore};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::config::WatchConfig;
use crate::ingest::cache::QuakeCache;
use crate::ingest::reconcile::{find_new, prune_older_than, Reconciler, DEFAULT_MAX_QUAKES};
use crate::ingest::types::QuakeSource;
use crate::model::Quake;
use crate::notify::{FeedEvent, FeedStatus, QuakeUpdate, UpdateBroadcaster, UpdateOrigin};

const MIN_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerConfig {
    pub interval: Duration,
    pub error_threshold: u32,
    pub reduced_multiplier: u32,
    pub recovery_cooldown: Duration,
    pub max_quakes: usize,
    /// Feed the previous set back in as the lowest-priority input, so records an
    /// incremental source no longer re-sends stay in the working set.
    pub carry_forward: bool,
    pub retention: Option<Duration>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            error_threshold: 5,
            reduced_multiplier: 4,
            recovery_cooldown: Duration::from_secs(30),
            max_quakes: DEFAULT_MAX_QUAKES,
            carry_forward: false,
            retention: None,
        }
    }
}

impl From<&WatchConfig> for SchedulerConfig {
    fn from(cfg: &WatchConfig) -> Self {
        Self {
            interval: cfg.poll_interval(),
            error_threshold: cfg.poll.error_threshold,
            reduced_multiplier: cfg.poll.reduced_multiplier,
            recovery_cooldown: cfg.recovery_cooldown(),
            max_quakes: cfg.data.max_quakes,
            carry_forward: cfg.data.incremental,
            retention: cfg.retention(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Polling,
    Degraded,
    Recovering,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Visible,
    Hidden,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connectivity {
    Online,
    Offline,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerSnapshot {
    pub phase: Phase,
    pub is_fetching: bool,
    pub consecutive_errors: u32,
    pub current_interval: Duration,
    pub is_degraded: bool,
    pub hidden: bool,
    pub offline: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// Another cycle held the guard.
    Skipped,
    Success {
        total: usize,
        new: usize,
        failed_sources: usize,
    },
    /// Every source failed.
    Failed {
        consecutive_errors: u32,
        origin: UpdateOrigin,
        degraded: bool,
    },
}

struct State {
    phase: Phase,
    consecutive_errors: u32,
    hidden: bool,
    offline: bool,
    previous: Vec<Quake>,
}

struct Shared {
    sources: Vec<Arc<dyn QuakeSource>>,
    reconciler: Reconciler,
    cache: Arc<QuakeCache>,
    broadcaster: UpdateBroadcaster,
    cfg: SchedulerConfig,
    in_flight: Semaphore,
    state: Mutex<State>,
    interval_tx: watch::Sender<Duration>,
    trigger: Notify,
    degraded: Notify,
}

#[derive(Clone)]
pub struct PollScheduler {
    shared: Arc<Shared>,
}

impl PollScheduler {
    /// `sources` must be in priority order (primary first).
    /// A zero interval, threshold or multiplier is raised to the smallest usable value.
    pub fn new(
        sources: Vec<Arc<dyn QuakeSource>>,
        cache: Arc<QuakeCache>,
        broadcaster: UpdateBroadcaster,
        mut cfg: SchedulerConfig,
    ) -> Self {
        cfg.interval = cfg.interval.max(MIN_INTERVAL);
        cfg.error_threshold = cfg.error_threshold.max(1);
        cfg.reduced_multiplier = cfg.reduced_multiplier.max(1);
        let (interval_tx, _) = watch::channel(cfg.interval);
        Self {
            shared: Arc::new(Shared {
                sources,
                reconciler: Reconciler::new(cfg.max_quakes),
                cache,
                broadcaster,
                in_flight: Semaphore::new(1),
                state: Mutex::new(State {
                    phase: Phase::Idle,
                    consecutive_errors: 0,
                    hidden: false,
                    offline: false,
                    previous: Vec::new(),
                }),
                interval_tx,
                trigger: Notify::new(),
                degraded: Notify::new(),
                cfg,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.shared.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn cache(&self) -> &Arc<QuakeCache> {
        &self.shared.cache
    }

    pub fn broadcaster(&self) -> &UpdateBroadcaster {
        &self.shared.broadcaster
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.shared.cfg
    }

    pub fn snapshot(&self) -> SchedulerSnapshot {
        let current_interval = *self.shared.interval_tx.borrow();
        let st = self.state();
        SchedulerSnapshot {
            phase: st.phase,
            is_fetching: self.shared.in_flight.available_permits() == 0,
            consecutive_errors: st.consecutive_errors,
            current_interval,
            is_degraded: st.phase == Phase::Degraded,
            hidden: st.hidden,
            offline: st.offline,
        }
    }

    /// Run one cycle now unless one is already in flight.
    pub async fn run_cycle(&self) -> CycleOutcome {
        let Ok(_permit) = self.shared.in_flight.try_acquire() else {
            tracing::debug!(target: "scheduler", "cycle already in flight, request dropped");
            return CycleOutcome::Skipped;
        };
        self.execute().await
    }

    /// Cached data when still fresh, otherwise the result of a (possibly shared) cycle.
    pub async fn latest(&self, force_refresh: bool) -> Vec<Quake> {
        let cache = &self.shared.cache;
        if !force_refresh && cache.is_valid() {
            return cache.get().unwrap_or_default();
        }
        if self.run_cycle().await == CycleOutcome::Skipped {
            // wait for the in-flight cycle to finish, then read what it cached
            let _ = self.shared.in_flight.acquire().await;
        }
        cache.get().unwrap_or_default()
    }

    async fn execute(&self) -> CycleOutcome {
        let recovering = {
            let mut st = self.state();
            if st.phase == Phase::Idle {
                st.phase = Phase::Polling;
            }
            st.phase == Phase::Recovering
        };
        self.publish_status(FeedStatus::Updating);

        let results = crate::ingest::fetch_all(&self.shared.sources).await;
        counter!("quake_cycles_total").increment(1);
        let failed_sources = results.iter().filter(|r| r.outcome.is_err()).count();
        if failed_sources == results.len() {
            return self.fail_cycle(recovering, "all sources failed");
        }

        let mut inputs: Vec<Vec<Quake>> = results
            .into_iter()
            .map(|r| r.outcome.unwrap_or_default())
            .collect();
        let previous = self.state().previous.clone();
        if self.shared.cfg.carry_forward {
            inputs.push(previous.clone());
        }

        let mut merged = self.shared.reconciler.merge(inputs);
        if merged.is_empty() && !previous.is_empty() {
            // an upstream answering `[]` must not wipe a known-good set
            return self.fail_cycle(recovering, "sources returned no records");
        }
        let keep = self
            .shared
            .cfg
            .retention
            .and_then(|d| chrono::Duration::from_std(d).ok());
        if let Some(keep) = keep {
            if let Some(cutoff) = self.shared.cache.clock().now().checked_sub_signed(keep) {
                merged = prune_older_than(merged, cutoff);
            }
        }
        let new_quakes = find_new(&previous, &merged);

        self.shared.cache.put(merged.clone());
        let status = {
            let mut st = self.state();
            st.previous = merged.clone();
            st.consecutive_errors = 0;
            if st.phase == Phase::Polling {
                st.phase = Phase::Idle;
            }
            if st.offline {
                FeedStatus::Offline
            } else {
                FeedStatus::Online
            }
        };

        counter!("quake_new_records_total").increment(new_quakes.len() as u64);
        gauge!("quake_working_set_size").set(merged.len() as f64);
        gauge!("quake_last_cycle_ts").set(chrono::Utc::now().timestamp() as f64);
        tracing::info!(
            target: "scheduler",
            total = merged.len(),
            new = new_quakes.len(),
            failed_sources,
            "cycle complete"
        );

        self.shared.broadcaster.publish(&merged, &new_quakes);
        self.publish_status(status);

        CycleOutcome::Success {
            total: merged.len(),
            new: new_quakes.len(),
            failed_sources,
        }
    }

    fn fail_cycle(&self, recovering: bool, reason: &'static str) -> CycleOutcome {
        counter!("quake_cycle_failures_total").increment(1);
        let threshold = self.shared.cfg.error_threshold;
        let (consecutive_errors, degraded, previous) = {
            let mut st = self.state();
            st.consecutive_errors = st.consecutive_errors.saturating_add(1);
            let degraded =
                !recovering && st.phase != Phase::Degraded && st.consecutive_errors >= threshold;
            if degraded {
                st.phase = Phase::Degraded;
            } else if st.phase == Phase::Polling {
                st.phase = Phase::Idle;
            }
            (st.consecutive_errors, degraded, st.previous.clone())
        };

        let cache = &self.shared.cache;
        let (quakes, origin) = if cache.is_valid() {
            (cache.get().unwrap_or_default(), UpdateOrigin::CacheFallback)
        } else {
            (Vec::new(), UpdateOrigin::NoData)
        };
        tracing::error!(
            target: "scheduler",
            consecutive_errors,
            threshold,
            ?origin,
            reason,
            "cycle failed"
        );

        let new_quakes = find_new(&previous, &quakes);
        self.shared
            .broadcaster
            .publish_event(&FeedEvent::Updated(QuakeUpdate {
                quakes,
                new_quakes,
                origin,
            }));
        self.publish_status(FeedStatus::Error);

        if degraded {
            counter!("quake_degraded_total").increment(1);
            tracing::error!(
                target: "scheduler",
                consecutive_errors,
                cooldown_ms = self.shared.cfg.recovery_cooldown.as_millis() as u64,
                "entering degraded state"
            );
            self.shared.broadcaster.publish_event(&FeedEvent::Degraded {
                consecutive_errors,
                cooldown: self.shared.cfg.recovery_cooldown,
            });
            self.shared.degraded.notify_one();
        }

        CycleOutcome::Failed {
            consecutive_errors,
            origin,
            degraded,
        }
    }

    /// The single recovery attempt after the degraded cooldown. Waits for any
    /// in-flight cycle instead of dropping, then resets the error count whatever
    /// the outcome.
    pub async fn recover(&self) -> CycleOutcome {
        self.state().phase = Phase::Recovering;
        tracing::info!(target: "scheduler", "attempting recovery");
        let outcome = match self.shared.in_flight.acquire().await {
            Ok(_permit) => self.execute().await,
            Err(_) => CycleOutcome::Skipped,
        };
        let mut st = self.state();
        st.consecutive_errors = 0;
        st.phase = Phase::Idle;
        outcome
    }

    pub fn set_visibility(&self, visibility: Visibility) {
        let hidden = visibility == Visibility::Hidden;
        self.state().hidden = hidden;
        tracing::info!(target: "scheduler", ?visibility, "visibility changed");
        self.update_interval();
        if !hidden {
            self.refresh_now();
        }
    }

    pub fn set_connectivity(&self, connectivity: Connectivity) {
        let offline = connectivity == Connectivity::Offline;
        self.state().offline = offline;
        tracing::info!(target: "scheduler", ?connectivity, "connectivity changed");
        self.update_interval();
        if offline {
            self.publish_status(FeedStatus::Offline);
        } else {
            self.publish_status(FeedStatus::Online);
            self.refresh_now();
        }
    }

    /// Ask the driver for an out-of-band cycle. Ignored while degraded: the
    /// recovery cycle after the cooldown is the next fetch.
    pub fn refresh_now(&self) {
        if self.state().phase == Phase::Degraded {
            tracing::debug!(target: "scheduler", "degraded, refresh request ignored");
            return;
        }
        self.shared.trigger.notify_one();
    }

    fn update_interval(&self) {
        let reduced = {
            let st = self.state();
            st.hidden || st.offline
        };
        let cfg = &self.shared.cfg;
        let next = if reduced {
            cfg.interval.saturating_mul(cfg.reduced_multiplier.max(1))
        } else {
            cfg.interval
        };
        self.shared.interval_tx.send_if_modified(|cur| {
            if *cur == next {
                return false;
            }
            tracing::info!(target: "scheduler", interval_ms = next.as_millis() as u64, "poll interval changed");
            *cur = next;
            true
        });
    }

    fn publish_status(&self, status: FeedStatus) {
        self.shared
            .broadcaster
            .publish_event(&FeedEvent::Status(status));
    }

    fn spawn_cycle(&self) {
        if self.state().phase == Phase::Degraded {
            return;
        }
        let this = self.clone();
        tokio::spawn(async move {
            this.run_cycle().await;
        });
    }

    /// Start the background driver. The first cycle runs immediately.
    pub fn spawn(&self) -> SchedulerHandle {
        let (stop_tx, stop_rx) = watch::channel(false);
        let this = self.clone();
        let task = tokio::spawn(async move { this.drive(stop_rx).await });
        SchedulerHandle {
            scheduler: self.clone(),
            stop_tx,
            task,
        }
    }

    async fn drive(self, mut stop: watch::Receiver<bool>) {
        let mut interval_rx = self.shared.interval_tx.subscribe();
        tracing::info!(
            target: "scheduler",
            interval_ms = self.shared.cfg.interval.as_millis() as u64,
            "polling started"
        );
        self.spawn_cycle();

        'outer: loop {
            let degraded = self.state().phase == Phase::Degraded;
            if degraded {
                tokio::select! {
                    _ = stop.changed() => break 'outer,
                    _ = tokio::time::sleep(self.shared.cfg.recovery_cooldown) => {}
                }
                self.recover().await;
                continue;
            }

            let period = *interval_rx.borrow_and_update();
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = stop.changed() => break 'outer,
                    _ = ticker.tick() => self.spawn_cycle(),
                    _ = self.shared.trigger.notified() => self.spawn_cycle(),
                    _ = interval_rx.changed() => continue 'outer,
                    _ = self.shared.degraded.notified() => continue 'outer,
                }
            }
        }
        tracing::info!(target: "scheduler", "polling stopped");
    }
}

/// Running driver. Dropping the handle also stops scheduling.
pub struct SchedulerHandle {
    scheduler: PollScheduler,
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    pub fn scheduler(&self) -> &PollScheduler {
        &self.scheduler
    }

    /// Stop scheduling new cycles. An in-flight cycle still runs to completion.
    pub fn stop(&self) {
        let _ = self.stop_tx.send(true);
    }

    pub async fn shutdown(self) {
        self.stop();
        if let Err(e) = self.task.await {
            tracing::warn!(target: "scheduler", error = %e, "driver task ended abnormally");
        }
    }
}
