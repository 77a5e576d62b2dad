mod common;

use std::sync::Arc;
use std::time::Duration;

use common::quake;
use quake_watch::clock::ManualClock;
use quake_watch::{QuakeCache, SourceTag};

fn cache_at(ms: i64) -> (Arc<ManualClock>, QuakeCache) {
    let clock = Arc::new(ManualClock::new(ms));
    let cache = QuakeCache::with_clock(Duration::from_secs(30), clock.clone());
    (clock, cache)
}

#[test]
fn empty_cache_is_never_valid() {
    let (_, cache) = cache_at(1_000);
    assert!(!cache.is_valid());
    assert!(cache.get().is_none());
    assert!(cache.last_seen_id().is_none());
}

#[test]
fn validity_expires_after_freshness_window() {
    let (clock, cache) = cache_at(1_000);
    cache.put(vec![quake("a", 1, SourceTag::Primary)]);
    assert_eq!(cache.timestamp_ms(), 1_000);
    assert!(cache.is_valid());

    clock.advance(Duration::from_millis(29_999));
    assert!(cache.is_valid());

    clock.advance(Duration::from_millis(1));
    assert!(!cache.is_valid());
    // stale data is still readable
    assert_eq!(cache.get().unwrap().len(), 1);
}

#[test]
fn put_refreshes_timestamp_and_last_seen() {
    let (clock, cache) = cache_at(0);
    cache.put(vec![
        quake("newest", 9, SourceTag::Primary),
        quake("older", 1, SourceTag::Secondary),
    ]);
    assert_eq!(cache.last_seen_id().as_deref(), Some("newest"));

    clock.advance(Duration::from_secs(60));
    assert!(!cache.is_valid());

    // an empty set is valid data but does not move last_seen
    cache.put(vec![]);
    assert!(cache.is_valid());
    assert_eq!(cache.get(), Some(vec![]));
    assert_eq!(cache.last_seen_id().as_deref(), Some("newest"));
}

#[test]
fn clear_resets_everything() {
    let (_, cache) = cache_at(5_000);
    cache.put(vec![quake("a", 1, SourceTag::Primary)]);
    cache.clear();

    assert!(cache.get().is_none());
    assert!(!cache.is_valid());
    assert_eq!(cache.timestamp_ms(), 0);
    assert!(cache.last_seen_id().is_none());
}
