use std::sync::{Arc, Mutex};
use std::time::Instant;

use veris_time::Clock;

#[cfg(test)]
#[path = "token_bucket_test.rs"]
mod token_bucket_test;

/// A lazy-refill token bucket.
///
/// Tokens refill continuously at `refill_rate` per second up to `max_tokens`;
/// the refill is computed from elapsed clock time on each access, so an idle
/// bucket costs nothing. Concurrent callers serialize on the interior mutex.
/// The bucket makes no fairness guarantee between callers.
#[derive(Debug)]
pub struct TokenBucket {
    clock: Arc<dyn Clock>,
    inner: Mutex<BucketState>,
}

#[derive(Debug)]
struct BucketState {
    max_tokens: f64,
    refill_rate: f64,
    tokens: f64,
    last_refill: Instant,
}

impl BucketState {
    fn refill(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_rate).min(self.max_tokens);
        self.last_refill = now;
    }
}

impl TokenBucket {
    /// Creates a full bucket.
    pub fn new(max_tokens: f64, refill_rate: f64, clock: Arc<dyn Clock>) -> Self {
        let now = clock.now();
        Self {
            clock,
            inner: Mutex::new(BucketState {
                max_tokens,
                refill_rate,
                tokens: max_tokens,
                last_refill: now,
            }),
        }
    }

    /// Removes `n` tokens if at least `n` are available, returning whether the
    /// consumption happened.
    pub fn try_consume(&self, n: f64) -> bool {
        let now = self.clock.now();
        let mut state = self.inner.lock().expect("token bucket lock poisoned");
        state.refill(now);
        if state.tokens >= n {
            state.tokens -= n;
            true
        } else {
            false
        }
    }

    /// The number of tokens currently available.
    pub fn available(&self) -> f64 {
        let now = self.clock.now();
        let mut state = self.inner.lock().expect("token bucket lock poisoned");
        state.refill(now);
        state.tokens
    }

    /// Changes the refill rate, settling the accrual at the old rate first.
    pub fn set_rate(&self, refill_rate: f64) {
        let now = self.clock.now();
        let mut state = self.inner.lock().expect("token bucket lock poisoned");
        state.refill(now);
        state.refill_rate = refill_rate;
    }

    /// The configured refill rate, tokens per second.
    pub fn rate(&self) -> f64 {
        self.inner.lock().expect("token bucket lock poisoned").refill_rate
    }
}
