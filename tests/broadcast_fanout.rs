mod common;

use std::sync::{Arc, Mutex};

use common::quake;
use quake_watch::{FeedEvent, FeedStatus, SourceTag, UpdateBroadcaster, UpdateOrigin};

#[test]
fn listeners_run_in_subscription_order() {
    let b = UpdateBroadcaster::new();
    let calls = Arc::new(Mutex::new(Vec::new()));
    for n in 0..3 {
        let calls = calls.clone();
        let _ = b.subscribe(move |_| calls.lock().unwrap().push(n));
    }

    b.publish_event(&FeedEvent::Status(FeedStatus::Online));
    assert_eq!(*calls.lock().unwrap(), vec![0, 1, 2]);
}

#[test]
fn publish_carries_full_set_and_delta() {
    let b = UpdateBroadcaster::new();
    let seen = common::record_events(&b);
    let all = vec![quake("a", 2, SourceTag::Primary), quake("b", 1, SourceTag::Primary)];
    let new = vec![all[0].clone()];

    b.publish(&all, &new);

    let events = seen.lock().unwrap();
    let update = events[0].as_update().expect("update event");
    assert_eq!(update.quakes, all);
    assert_eq!(update.new_quakes, new);
    assert_eq!(update.origin, UpdateOrigin::Live);
}

#[test]
fn panicking_listener_does_not_starve_the_rest() {
    let b = UpdateBroadcaster::new();
    let before = common::record_events(&b);
    let _ = b.subscribe(|_| panic!("listener bug"));
    let after = common::record_events(&b);

    b.publish_event(&FeedEvent::Status(FeedStatus::Error));
    b.publish_event(&FeedEvent::Status(FeedStatus::Online));

    assert_eq!(before.lock().unwrap().len(), 2);
    assert_eq!(after.lock().unwrap().len(), 2);
}

#[test]
fn unsubscribed_listener_stops_receiving() {
    let b = UpdateBroadcaster::new();
    let count = Arc::new(Mutex::new(0));
    let c = count.clone();
    let sub = b.subscribe(move |_| *c.lock().unwrap() += 1);
    assert_eq!(b.listener_count(), 1);

    b.publish_event(&FeedEvent::Status(FeedStatus::Updating));
    sub.unsubscribe();
    b.publish_event(&FeedEvent::Status(FeedStatus::Online));

    assert_eq!(*count.lock().unwrap(), 1);
    assert_eq!(b.listener_count(), 0);
}

#[test]
fn publishing_without_listeners_is_a_no_op() {
    let b = UpdateBroadcaster::new();
    b.publish(&[], &[]);
    b.publish_event(&FeedEvent::Status(FeedStatus::Offline));
    assert_eq!(b.listener_count(), 0);
}

#[test]
fn clones_share_the_listener_list() {
    let b = UpdateBroadcaster::new();
    let seen = common::record_events(&b);
    b.clone().publish_event(&FeedEvent::Status(FeedStatus::Online));
    assert_eq!(seen.lock().unwrap().len(), 1);
}
