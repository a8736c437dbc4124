use std::time::Duration;

use crate::{Clock, ManualClock, SystemClock};

#[test]
fn manual_clock_advances_only_when_told() {
    let clock = ManualClock::new();
    let start = clock.now();
    assert_eq!(clock.now(), start);

    clock.advance(Duration::from_secs(90));
    assert_eq!(clock.now() - start, Duration::from_secs(90));
    clock.advance(Duration::from_millis(500));
    assert_eq!(clock.now() - start, Duration::from_millis(90_500));
}

#[test]
fn manual_clock_unix_time_tracks_offset() {
    let clock = ManualClock::new();
    let start = clock.unix_now();
    clock.advance(Duration::from_secs(61));
    assert_eq!(clock.unix_now(), start + 61);
}

#[test]
fn system_clock_is_monotonic() {
    let clock = SystemClock;
    let a = clock.now();
    let b = clock.now();
    assert!(b >= a);
}
