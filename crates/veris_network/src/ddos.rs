use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use strum::Display;
use tracing::warn;
use veris_throttle::SlidingWindow;
use veris_time::Clock;

use crate::config::DdosConfig;
use crate::errors::{NetworkError, NetworkResult};

#[cfg(test)]
#[path = "ddos_test.rs"]
mod ddos_test;

/// Buckets per detection window.
const WINDOW_BUCKETS: u32 = 6;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum AlertSeverity {
    Info,
    Warning,
    Critical,
}

/// An alert handed to the intrusion-detection collaborator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IdsAlert {
    pub severity: AlertSeverity,
    pub kind: String,
    pub source: IpAddr,
    pub observed: u64,
    pub threshold: u64,
}

/// The IDS collaborator surface.
pub trait IntrusionSink: Send + Sync {
    fn alert(&self, alert: IdsAlert);
}

/// An [`IntrusionSink`] that logs alerts.
#[derive(Debug, Default)]
pub struct LogIntrusionSink;

impl IntrusionSink for LogIntrusionSink {
    fn alert(&self, alert: IdsAlert) {
        warn!(
            severity = %alert.severity,
            kind = alert.kind,
            source = %alert.source,
            observed = alert.observed,
            threshold = alert.threshold,
            "intrusion alert"
        );
    }
}

#[derive(Clone, Debug)]
struct IpBan {
    until: Instant,
}

/// Flood detection over global sliding windows plus a per-IP ban table.
///
/// When a window crosses its threshold the address that tipped it is banned
/// for the configured duration and an alert goes to the IDS sink.
pub struct DdosProtector {
    config: DdosConfig,
    clock: Arc<dyn Clock>,
    connection_window: SlidingWindow,
    message_window: SlidingWindow,
    bans: RwLock<HashMap<IpAddr, IpBan>>,
    ids: Arc<dyn IntrusionSink>,
}

impl DdosProtector {
    pub fn new(config: DdosConfig, clock: Arc<dyn Clock>, ids: Arc<dyn IntrusionSink>) -> Self {
        let window = Duration::from_secs(config.window_secs);
        Self {
            connection_window: SlidingWindow::new(window, WINDOW_BUCKETS, clock.clone()),
            message_window: SlidingWindow::new(window, WINDOW_BUCKETS, clock.clone()),
            bans: RwLock::new(HashMap::new()),
            ids,
            config,
            clock,
        }
    }

    /// Counts a connection attempt; bans the address on a flood.
    pub fn record_connection(&self, addr: IpAddr) -> NetworkResult<()> {
        if !self.config.enabled {
            return Ok(());
        }
        self.check_ban(addr)?;

        self.connection_window.add(1);
        let observed = self.connection_window.count();
        if observed > self.config.max_connections_per_window {
            self.ban(addr);
            self.ids.alert(IdsAlert {
                severity: AlertSeverity::Critical,
                kind: "connection_flood".to_owned(),
                source: addr,
                observed,
                threshold: self.config.max_connections_per_window,
            });
            return Err(NetworkError::ConnectionFlood { addr });
        }
        Ok(())
    }

    /// Counts a message; bans the sender on a flood.
    pub fn record_message(&self, addr: IpAddr) -> NetworkResult<()> {
        if !self.config.enabled {
            return Ok(());
        }
        self.check_ban(addr)?;

        self.message_window.add(1);
        let observed = self.message_window.count();
        if observed > self.config.max_messages_per_window {
            self.ban(addr);
            self.ids.alert(IdsAlert {
                severity: AlertSeverity::Warning,
                kind: "message_flood".to_owned(),
                source: addr,
                observed,
                threshold: self.config.max_messages_per_window,
            });
            return Err(NetworkError::MessageFlood { addr });
        }
        Ok(())
    }

    pub fn is_banned(&self, addr: IpAddr) -> bool {
        let now = self.clock.now();
        self.bans
            .read()
            .expect("ddos ban table lock poisoned")
            .get(&addr)
            .is_some_and(|ban| ban.until > now)
    }

    /// Reclaims expired bans; returns how many were dropped.
    pub fn prune_expired_bans(&self) -> usize {
        let now = self.clock.now();
        let mut bans = self.bans.write().expect("ddos ban table lock poisoned");
        let before = bans.len();
        bans.retain(|_, ban| ban.until > now);
        before - bans.len()
    }

    pub fn ban_count(&self) -> usize {
        self.bans.read().expect("ddos ban table lock poisoned").len()
    }

    fn check_ban(&self, addr: IpAddr) -> NetworkResult<()> {
        let now = self.clock.now();
        let bans = self.bans.read().expect("ddos ban table lock poisoned");
        if let Some(ban) = bans.get(&addr) {
            if ban.until > now {
                return Err(NetworkError::AddressBanned {
                    addr,
                    remaining_secs: (ban.until - now).as_secs(),
                });
            }
        }
        Ok(())
    }

    fn ban(&self, addr: IpAddr) {
        let until = self.clock.now() + Duration::from_secs(self.config.ban_duration_secs);
        self.bans.write().expect("ddos ban table lock poisoned").insert(addr, IpBan { until });
    }
}
