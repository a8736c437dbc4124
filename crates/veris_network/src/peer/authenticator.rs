use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use tracing::info;
use veris_time::Clock;

use crate::errors::PeerError;
use crate::peer::{PeerId, PeerInfo};

#[cfg(test)]
#[path = "authenticator_test.rs"]
mod authenticator_test;

const PUBLIC_KEY_SIZE: usize = 32;

/// An active ban.
#[derive(Clone, Debug)]
pub struct BanEntry {
    pub until: Instant,
    pub reason: String,
}

/// First gate of the peer lifecycle: bans, the trusted set, and structural
/// key checks.
#[derive(Debug)]
pub struct PeerAuthenticator {
    clock: Arc<dyn Clock>,
    trusted: RwLock<HashSet<PeerId>>,
    bans: RwLock<HashMap<PeerId, BanEntry>>,
}

impl PeerAuthenticator {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock, trusted: RwLock::new(HashSet::new()), bans: RwLock::new(HashMap::new()) }
    }

    /// Seeds the trusted and banned sets from configuration.
    pub fn with_seeds(
        self,
        trusted_peers: impl IntoIterator<Item = PeerId>,
        banned_peers: impl IntoIterator<Item = PeerId>,
        startup_ban_duration: Duration,
    ) -> Self {
        {
            let mut trusted = self.trusted.write().expect("trusted set lock poisoned");
            trusted.extend(trusted_peers);
        }
        for peer_id in banned_peers {
            self.ban(peer_id, startup_ban_duration, "banned at startup");
        }
        self
    }

    /// Accepts or rejects a peer before any table is touched.
    ///
    /// Ban lookup first (expired bans are reclaimed lazily), then the trusted
    /// set short-circuits, then the structural key check.
    pub fn authenticate(&self, info: &PeerInfo) -> Result<(), PeerError> {
        if let Some(remaining) = self.ban_remaining(&info.peer_id) {
            let reason = self
                .bans
                .read()
                .expect("ban table lock poisoned")
                .get(&info.peer_id)
                .map(|entry| entry.reason.clone())
                .unwrap_or_default();
            return Err(PeerError::Banned {
                peer_id: info.peer_id.clone(),
                remaining_secs: remaining.as_secs(),
                reason,
            });
        }

        if self.trusted.read().expect("trusted set lock poisoned").contains(&info.peer_id) {
            return Ok(());
        }

        if info.public_key.len() != PUBLIC_KEY_SIZE {
            return Err(PeerError::MalformedPublicKey { peer_id: info.peer_id.clone() });
        }
        Ok(())
    }

    /// Bans a peer for `duration`.
    pub fn ban(&self, peer_id: PeerId, duration: Duration, reason: &str) {
        info!(%peer_id, ?duration, reason, "banning peer");
        let mut bans = self.bans.write().expect("ban table lock poisoned");
        bans.insert(
            peer_id,
            BanEntry { until: self.clock.now() + duration, reason: reason.to_owned() },
        );
    }

    /// Whether an unexpired ban exists.
    pub fn is_banned(&self, peer_id: &PeerId) -> bool {
        self.ban_remaining(peer_id).is_some()
    }

    fn ban_remaining(&self, peer_id: &PeerId) -> Option<Duration> {
        let now = self.clock.now();
        {
            let bans = self.bans.read().expect("ban table lock poisoned");
            match bans.get(peer_id) {
                Some(entry) if entry.until > now => return Some(entry.until - now),
                Some(_) => {}
                None => return None,
            }
        }
        // The ban expired; reclaim it.
        let mut bans = self.bans.write().expect("ban table lock poisoned");
        if bans.get(peer_id).is_some_and(|entry| entry.until <= now) {
            bans.remove(peer_id);
        }
        None
    }

    pub fn trust(&self, peer_id: PeerId) {
        self.trusted.write().expect("trusted set lock poisoned").insert(peer_id);
    }

    /// Reclaims every expired ban; returns how many were dropped.
    pub fn prune_expired_bans(&self) -> usize {
        let now = self.clock.now();
        let mut bans = self.bans.write().expect("ban table lock poisoned");
        let before = bans.len();
        bans.retain(|_, entry| entry.until > now);
        before - bans.len()
    }

    pub fn ban_count(&self) -> usize {
        self.bans.read().expect("ban table lock poisoned").len()
    }
}
