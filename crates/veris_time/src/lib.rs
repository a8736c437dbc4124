//! Time source abstraction.
//!
//! Components that measure elapsed time (rate limiters, ban tables, score
//! decay, challenge TTLs) take a [`Clock`] so tests can drive time manually
//! instead of sleeping.

use std::fmt::Debug;
use std::sync::Mutex;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

#[cfg(test)]
#[path = "lib_test.rs"]
mod lib_test;

/// A source of monotonic and wall-clock time.
pub trait Clock: Send + Sync + Debug {
    /// Monotonic time, used for elapsed-time arithmetic.
    fn now(&self) -> Instant;

    /// Wall-clock seconds since the unix epoch.
    fn unix_now(&self) -> u64 {
        SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
    }
}

/// The process clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to. Test-only.
#[cfg(any(feature = "testing", test))]
#[derive(Debug)]
pub struct ManualClock {
    base: Instant,
    unix_base: u64,
    offset: Mutex<Duration>,
}

#[cfg(any(feature = "testing", test))]
impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(feature = "testing", test))]
impl ManualClock {
    pub fn new() -> Self {
        Self { base: Instant::now(), unix_base: 1_700_000_000, offset: Mutex::new(Duration::ZERO) }
    }

    /// Moves the clock forward by `delta`.
    pub fn advance(&self, delta: Duration) {
        let mut offset = self.offset.lock().expect("manual clock lock poisoned");
        *offset += delta;
    }
}

#[cfg(any(feature = "testing", test))]
impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + *self.offset.lock().expect("manual clock lock poisoned")
    }

    fn unix_now(&self) -> u64 {
        let offset = self.offset.lock().expect("manual clock lock poisoned");
        self.unix_base + offset.as_secs()
    }
}
