use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

use tracing::debug;
use veris_throttle::TokenBucket;
use veris_time::Clock;

use crate::config::NetRateLimitConfig;

#[cfg(test)]
#[path = "ratelimit_test.rs"]
mod ratelimit_test;

/// The most adaptive mode may shave off a per-IP refill rate.
const MAX_ADAPTIVE_REDUCTION: f64 = 0.75;

struct IpBuckets {
    connections: TokenBucket,
    messages: TokenBucket,
    bandwidth: TokenBucket,
    last_seen: Mutex<Instant>,
}

/// Token-bucket limits at the network edge: one global pair of buckets plus
/// a connection/message/bandwidth triple per remote IP.
///
/// Decisions on the same IP from concurrent threads may interleave; the
/// guarantee is only that admitted work over a window stays within the
/// configured rate plus one burst.
pub struct NetRateLimiter {
    config: NetRateLimitConfig,
    clock: Arc<dyn Clock>,
    global_connections: TokenBucket,
    global_messages: TokenBucket,
    per_ip: RwLock<HashMap<IpAddr, Arc<IpBuckets>>>,
    /// Multiplier applied to per-IP refill rates; 1.0 unless adaptive mode
    /// engaged.
    load_factor: Mutex<f64>,
}

impl NetRateLimiter {
    pub fn new(config: NetRateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        // Global budgets scale a fixed multiple above the per-IP rates.
        let global_connection_rate = config.connections_per_second * 32.0;
        let global_message_rate = config.messages_per_second * 32.0;
        Self {
            global_connections: TokenBucket::new(
                global_connection_rate * 2.0,
                global_connection_rate,
                clock.clone(),
            ),
            global_messages: TokenBucket::new(
                global_message_rate * 2.0,
                global_message_rate,
                clock.clone(),
            ),
            per_ip: RwLock::new(HashMap::new()),
            load_factor: Mutex::new(1.0),
            config,
            clock,
        }
    }

    /// One token from the global connection bucket, then one from the IP's.
    pub fn allow_connection(&self, addr: IpAddr) -> bool {
        if !self.config.enabled {
            return true;
        }
        if !self.global_connections.try_consume(1.0) {
            debug!(%addr, "global connection budget exhausted");
            return false;
        }
        let buckets = self.buckets_for(addr);
        buckets.connections.try_consume(1.0)
    }

    /// A message token plus `size`-proportional bandwidth tokens.
    pub fn allow_message(&self, addr: IpAddr, size: usize) -> bool {
        if !self.config.enabled {
            return true;
        }
        if !self.global_messages.try_consume(1.0) {
            debug!(%addr, "global message budget exhausted");
            return false;
        }
        let buckets = self.buckets_for(addr);
        if !buckets.messages.try_consume(1.0) {
            return false;
        }
        if self.config.bytes_per_second > 0.0 {
            let tokens = (size as f64) / self.config.bytes_per_token();
            if !buckets.bandwidth.try_consume(tokens) {
                return false;
            }
        }
        true
    }

    /// Feeds the observed system load into adaptive mode. Past the
    /// configured threshold, per-IP refill rates shrink linearly, down to a
    /// quarter of their configured value at full load.
    pub fn set_system_load(&self, load: f64) {
        if !self.config.adaptive_enabled {
            return;
        }
        let factor = if load <= self.config.load_threshold {
            1.0
        } else {
            let overload = (load - self.config.load_threshold)
                / (1.0 - self.config.load_threshold).max(f64::EPSILON);
            1.0 - MAX_ADAPTIVE_REDUCTION * overload.clamp(0.0, 1.0)
        };
        *self.load_factor.lock().expect("load factor lock poisoned") = factor;

        let per_ip = self.per_ip.read().expect("per-ip table lock poisoned");
        for buckets in per_ip.values() {
            buckets.connections.set_rate(self.config.connections_per_second * factor);
            buckets.messages.set_rate(self.config.messages_per_second * factor);
            buckets.bandwidth.set_rate(self.config.messages_per_second * factor);
        }
    }

    /// Reclaims per-IP records idle past the configured window; returns how
    /// many were dropped.
    pub fn prune_stale(&self) -> usize {
        let now = self.clock.now();
        let idle_window = Duration::from_secs(self.config.idle_reclaim_secs);
        let mut per_ip = self.per_ip.write().expect("per-ip table lock poisoned");
        let before = per_ip.len();
        per_ip.retain(|_, buckets| {
            let last_seen = *buckets.last_seen.lock().expect("last seen lock poisoned");
            now.saturating_duration_since(last_seen) < idle_window
        });
        before - per_ip.len()
    }

    pub fn tracked_ip_count(&self) -> usize {
        self.per_ip.read().expect("per-ip table lock poisoned").len()
    }

    fn buckets_for(&self, addr: IpAddr) -> Arc<IpBuckets> {
        {
            let per_ip = self.per_ip.read().expect("per-ip table lock poisoned");
            if let Some(buckets) = per_ip.get(&addr) {
                *buckets.last_seen.lock().expect("last seen lock poisoned") = self.clock.now();
                return buckets.clone();
            }
        }
        let factor = *self.load_factor.lock().expect("load factor lock poisoned");
        let mut per_ip = self.per_ip.write().expect("per-ip table lock poisoned");
        per_ip
            .entry(addr)
            .or_insert_with(|| {
                Arc::new(IpBuckets {
                    connections: TokenBucket::new(
                        self.config.connection_burst,
                        self.config.connections_per_second * factor,
                        self.clock.clone(),
                    ),
                    messages: TokenBucket::new(
                        self.config.message_burst,
                        self.config.messages_per_second * factor,
                        self.clock.clone(),
                    ),
                    // Bandwidth tokens are denominated in bytes-per-token, so
                    // the bucket refills at the message rate.
                    bandwidth: TokenBucket::new(
                        self.config.message_burst,
                        self.config.messages_per_second * factor,
                        self.clock.clone(),
                    ),
                    last_seen: Mutex::new(self.clock.now()),
                })
            })
            .clone()
    }
}
