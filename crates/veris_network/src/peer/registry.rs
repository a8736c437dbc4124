use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Instant;

use veris_time::Clock;

use crate::errors::PeerError;
use crate::peer::{PeerId, PeerInfo};

#[cfg(test)]
#[path = "registry_test.rs"]
mod registry_test;

/// A registered peer with its connection time.
#[derive(Clone, Debug)]
pub struct ConnectedPeer {
    pub info: PeerInfo,
    pub connected_at: Instant,
}

/// The table of currently connected peers.
#[derive(Debug)]
pub struct PeerRegistry {
    clock: Arc<dyn Clock>,
    peers: RwLock<HashMap<PeerId, ConnectedPeer>>,
}

impl PeerRegistry {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock, peers: RwLock::new(HashMap::new()) }
    }

    pub fn register(&self, info: PeerInfo) -> Result<(), PeerError> {
        let mut peers = self.peers.write().expect("peer registry lock poisoned");
        if peers.contains_key(&info.peer_id) {
            return Err(PeerError::DuplicatePeer { peer_id: info.peer_id });
        }
        peers.insert(
            info.peer_id.clone(),
            ConnectedPeer { info, connected_at: self.clock.now() },
        );
        Ok(())
    }

    pub fn unregister(&self, peer_id: &PeerId) -> Result<ConnectedPeer, PeerError> {
        let mut peers = self.peers.write().expect("peer registry lock poisoned");
        peers.remove(peer_id).ok_or_else(|| PeerError::UnknownPeer { peer_id: peer_id.clone() })
    }

    pub fn get(&self, peer_id: &PeerId) -> Option<ConnectedPeer> {
        self.peers.read().expect("peer registry lock poisoned").get(peer_id).cloned()
    }

    pub fn contains(&self, peer_id: &PeerId) -> bool {
        self.peers.read().expect("peer registry lock poisoned").contains_key(peer_id)
    }

    pub fn count(&self) -> usize {
        self.peers.read().expect("peer registry lock poisoned").len()
    }

    pub fn inbound_count(&self) -> usize {
        self.peers
            .read()
            .expect("peer registry lock poisoned")
            .values()
            .filter(|peer| peer.info.is_inbound)
            .count()
    }

    pub fn outbound_count(&self) -> usize {
        self.peers
            .read()
            .expect("peer registry lock poisoned")
            .values()
            .filter(|peer| !peer.info.is_inbound)
            .count()
    }

    /// A snapshot of every connected peer.
    pub fn snapshot(&self) -> Vec<ConnectedPeer> {
        self.peers.read().expect("peer registry lock poisoned").values().cloned().collect()
    }
}
