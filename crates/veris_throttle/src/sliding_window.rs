use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use veris_time::Clock;

#[cfg(test)]
#[path = "sliding_window_test.rs"]
mod sliding_window_test;

/// A fixed-horizon event counter over a ring of time buckets.
///
/// The window `W` is partitioned into `k` buckets of width `W/k`. `add`
/// credits the bucket covering the current instant; buckets older than `W`
/// are expired on every access. The count approximates the true number of
/// events in the last `W` with granularity `W/k`.
#[derive(Debug)]
pub struct SlidingWindow {
    clock: Arc<dyn Clock>,
    window: Duration,
    granularity: Duration,
    inner: Mutex<VecDeque<WindowBucket>>,
}

#[derive(Debug)]
struct WindowBucket {
    start: Instant,
    count: u64,
}

impl SlidingWindow {
    /// Creates a window of `window` split into `bucket_count` buckets.
    ///
    /// `bucket_count` must be non-zero.
    pub fn new(window: Duration, bucket_count: u32, clock: Arc<dyn Clock>) -> Self {
        assert!(bucket_count > 0, "sliding window needs at least one bucket");
        Self {
            clock,
            window,
            granularity: window / bucket_count,
            inner: Mutex::new(VecDeque::with_capacity(usize::try_from(bucket_count).unwrap_or(8))),
        }
    }

    /// Credits `n` events to the current bucket.
    pub fn add(&self, n: u64) {
        let now = self.clock.now();
        let mut buckets = self.inner.lock().expect("sliding window lock poisoned");
        Self::expire(&mut buckets, now, self.window);
        match buckets.back_mut() {
            Some(bucket) if now.saturating_duration_since(bucket.start) < self.granularity => {
                bucket.count += n;
            }
            _ => buckets.push_back(WindowBucket { start: now, count: n }),
        }
    }

    /// The number of live events inside the window.
    pub fn count(&self) -> u64 {
        let now = self.clock.now();
        let mut buckets = self.inner.lock().expect("sliding window lock poisoned");
        Self::expire(&mut buckets, now, self.window);
        buckets.iter().map(|bucket| bucket.count).sum()
    }

    fn expire(buckets: &mut VecDeque<WindowBucket>, now: Instant, window: Duration) {
        while let Some(front) = buckets.front() {
            if now.saturating_duration_since(front.start) >= window {
                buckets.pop_front();
            } else {
                break;
            }
        }
    }
}
