use std::collections::HashSet;
use std::sync::{Arc, Mutex, RwLock};

use rand::seq::SliceRandom;
use tracing::debug;
use veris_time::Clock;

use crate::config::EclipseConfig;
use crate::errors::PeerError;
use crate::peer::registry::ConnectedPeer;
use crate::peer::scorer::PeerScorer;
use crate::peer::{PeerId, PeerInfo};

#[cfg(test)]
#[path = "eclipse_test.rs"]
mod eclipse_test;

/// Eclipse-attack protections: reserved outbound slots, anchor pinning, and
/// periodic rotation of non-anchor peers.
pub struct EclipseGuard {
    config: EclipseConfig,
    clock: Arc<dyn Clock>,
    anchors: RwLock<HashSet<PeerId>>,
    last_rotation: Mutex<std::time::Instant>,
    last_seed_refresh: Mutex<std::time::Instant>,
}

impl EclipseGuard {
    pub fn new(config: EclipseConfig, clock: Arc<dyn Clock>) -> Self {
        let now = clock.now();
        Self {
            config,
            clock,
            anchors: RwLock::new(HashSet::new()),
            last_rotation: Mutex::new(now),
            last_seed_refresh: Mutex::new(now),
        }
    }

    /// Rejects an inbound peer that would eat into the reserved
    /// outbound-only slots.
    pub fn check(
        &self,
        info: &PeerInfo,
        current_inbound: usize,
        max_peers: usize,
    ) -> Result<(), PeerError> {
        if !self.config.enabled || !info.is_inbound {
            return Ok(());
        }
        let inbound_capacity = max_peers.saturating_sub(self.config.outbound_only_slots);
        if current_inbound >= inbound_capacity {
            return Err(PeerError::InboundSlotsReserved {
                reserved: self.config.outbound_only_slots,
            });
        }
        Ok(())
    }

    /// Re-selects the anchor set: long-lived, high-reputation peers, with
    /// validators preferred. Anchors are exempt from rotation.
    pub fn select_anchors(&self, peers: &[ConnectedPeer], scorer: &PeerScorer) {
        let mut candidates: Vec<&ConnectedPeer> = peers.iter().collect();
        candidates.sort_by(|a, b| {
            b.info
                .is_validator
                .cmp(&a.info.is_validator)
                .then_with(|| {
                    let score_a = scorer.total(&a.info.peer_id).unwrap_or(0.0);
                    let score_b = scorer.total(&b.info.peer_id).unwrap_or(0.0);
                    score_b.partial_cmp(&score_a).unwrap_or(std::cmp::Ordering::Equal)
                })
                // Older connections win the final tie.
                .then_with(|| a.connected_at.cmp(&b.connected_at))
        });

        let selected: HashSet<PeerId> = candidates
            .into_iter()
            .take(self.config.anchor_count)
            .map(|peer| peer.info.peer_id.clone())
            .collect();
        debug!(anchors = selected.len(), "anchor set re-selected");
        *self.anchors.write().expect("anchor set lock poisoned") = selected;
    }

    pub fn is_anchor(&self, peer_id: &PeerId) -> bool {
        self.anchors.read().expect("anchor set lock poisoned").contains(peer_id)
    }

    pub fn anchor_count(&self) -> usize {
        self.anchors.read().expect("anchor set lock poisoned").len()
    }

    /// Whether the rotation interval elapsed since the last rotation.
    pub fn rotation_due(&self) -> bool {
        if !self.config.enabled {
            return false;
        }
        let last = *self.last_rotation.lock().expect("rotation clock lock poisoned");
        self.clock.now().saturating_duration_since(last).as_secs()
            >= self.config.rotation_interval_secs
    }

    /// Picks the non-anchor peers to disconnect this rotation: a random
    /// `random_selection_ratio` share of them.
    pub fn rotation_victims(&self, peers: &[ConnectedPeer]) -> Vec<PeerId> {
        let anchors = self.anchors.read().expect("anchor set lock poisoned");
        let mut rotatable: Vec<PeerId> = peers
            .iter()
            .filter(|peer| !anchors.contains(&peer.info.peer_id))
            .map(|peer| peer.info.peer_id.clone())
            .collect();
        drop(anchors);

        let victim_count =
            ((rotatable.len() as f64) * self.config.random_selection_ratio).ceil() as usize;
        let mut rng = rand::thread_rng();
        rotatable.shuffle(&mut rng);
        rotatable.truncate(victim_count);
        rotatable
    }

    pub fn mark_rotated(&self) {
        *self.last_rotation.lock().expect("rotation clock lock poisoned") = self.clock.now();
    }

    /// Whether the seed refresh interval elapsed.
    pub fn seed_refresh_due(&self) -> bool {
        if !self.config.enabled {
            return false;
        }
        let last = *self.last_seed_refresh.lock().expect("seed clock lock poisoned");
        self.clock.now().saturating_duration_since(last).as_secs()
            >= self.config.seed_refresh_interval_secs
    }

    pub fn mark_seed_refreshed(&self) {
        *self.last_seed_refresh.lock().expect("seed clock lock poisoned") = self.clock.now();
    }

    /// Drops a departed peer from the anchor set.
    pub fn unregister(&self, peer_id: &PeerId) {
        self.anchors.write().expect("anchor set lock poisoned").remove(peer_id);
    }
}
