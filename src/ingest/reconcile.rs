// src/ingest/reconcile.rs
//! Merge per-source outputs into one deduplicated, newest-first, size-capped set.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use metrics::counter;

use crate::model::Quake;

pub const DEFAULT_MAX_QUAKES: usize = 100;

#[derive(Debug, Clone, Copy)]
pub struct Reconciler {
    max_quakes: usize,
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_QUAKES)
    }
}

impl Reconciler {
    pub fn new(max_quakes: usize) -> Self {
        Self { max_quakes }
    }

    /// `results_per_source` must be in priority order: on an id collision the
    /// earlier source's record is kept.
    pub fn merge(&self, results_per_source: Vec<Vec<Quake>>) -> Vec<Quake> {
        let total: usize = results_per_source.iter().map(Vec::len).sum();
        let mut seen: HashSet<String> = HashSet::with_capacity(total);
        let mut merged = Vec::with_capacity(total);

        for q in results_per_source.into_iter().flatten() {
            if seen.insert(q.id.clone()) {
                merged.push(q);
            }
        }
        let dups = total - merged.len();
        if dups > 0 {
            counter!("quake_dedup_total").increment(dups as u64);
        }

        // sort_by is stable: equal times keep insertion (priority) order
        merged.sort_by(|a, b| b.time.cmp(&a.time));
        merged.truncate(self.max_quakes);
        merged
    }
}

/// Records of `current` whose id is absent from `previous`, in `current` order.
pub fn find_new(previous: &[Quake], current: &[Quake]) -> Vec<Quake> {
    let known: HashSet<&str> = previous.iter().map(|q| q.id.as_str()).collect();
    current
        .iter()
        .filter(|q| !known.contains(q.id.as_str()))
        .cloned()
        .collect()
}

/// Drops records at or before `cutoff`.
pub fn prune_older_than(set: Vec<Quake>, cutoff: DateTime<Utc>) -> Vec<Quake> {
    set.into_iter().filter(|q| q.time > cutoff).collect()
}
