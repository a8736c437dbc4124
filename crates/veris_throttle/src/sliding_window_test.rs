use std::sync::Arc;
use std::time::Duration;

use veris_time::ManualClock;

use crate::SlidingWindow;

fn window(window_secs: u64, buckets: u32) -> (SlidingWindow, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new());
    (SlidingWindow::new(Duration::from_secs(window_secs), buckets, clock.clone()), clock)
}

#[test]
fn counts_events_within_window() {
    let (window, _clock) = window(60, 6);
    window.add(3);
    window.add(2);
    assert_eq!(window.count(), 5);
}

#[test]
fn advancing_past_granularity_opens_a_new_bucket() {
    let (window, clock) = window(60, 6);
    window.add(1);
    clock.advance(Duration::from_secs(11));
    window.add(1);
    assert_eq!(window.count(), 2);
}

#[test]
fn events_expire_after_the_window() {
    let (window, clock) = window(60, 6);
    window.add(4);
    clock.advance(Duration::from_secs(30));
    window.add(1);
    assert_eq!(window.count(), 5);

    clock.advance(Duration::from_secs(31));
    // The first bucket is now 61s old; the second is 31s old.
    assert_eq!(window.count(), 1);

    clock.advance(Duration::from_secs(30));
    assert_eq!(window.count(), 0);
}

#[test]
fn count_is_idempotent_without_new_events() {
    let (window, clock) = window(10, 2);
    window.add(7);
    clock.advance(Duration::from_secs(3));
    assert_eq!(window.count(), 7);
    assert_eq!(window.count(), 7);
}
