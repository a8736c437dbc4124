use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use crate::config::SybilConfig;
use crate::errors::PeerError;
use crate::peer::{PeerId, PeerInfo};

#[cfg(test)]
#[path = "sybil_test.rs"]
mod sybil_test;

/// Caps peers per subnet and per origin ASN, and optionally demands a
/// minimum stake, to raise the cost of flooding the peer table from one
/// network position.
#[derive(Debug)]
pub struct SybilGuard {
    config: SybilConfig,
    subnets: RwLock<HashMap<String, HashSet<PeerId>>>,
    asns: RwLock<HashMap<u32, HashSet<PeerId>>>,
}

impl SybilGuard {
    pub fn new(config: SybilConfig) -> Self {
        Self { config, subnets: RwLock::new(HashMap::new()), asns: RwLock::new(HashMap::new()) }
    }

    /// Rejects a peer that would breach a subnet or ASN cap or the stake
    /// floor. Re-registrations of an already-counted peer pass.
    pub fn check(&self, info: &PeerInfo) -> Result<(), PeerError> {
        if !self.config.enabled {
            return Ok(());
        }

        if info.stake < self.config.min_stake {
            return Err(PeerError::InsufficientStake {
                peer_id: info.peer_id.clone(),
                stake: info.stake,
                min_stake: self.config.min_stake,
            });
        }

        let subnet = info.subnet();
        {
            let subnets = self.subnets.read().expect("subnet table lock poisoned");
            if let Some(members) = subnets.get(&subnet) {
                if !members.contains(&info.peer_id)
                    && members.len() >= self.config.max_peers_per_subnet
                {
                    return Err(PeerError::SubnetLimitExceeded {
                        subnet,
                        count: members.len(),
                        limit: self.config.max_peers_per_subnet,
                    });
                }
            }
        }

        if let Some(asn) = info.asn {
            let asns = self.asns.read().expect("asn table lock poisoned");
            if let Some(members) = asns.get(&asn) {
                if !members.contains(&info.peer_id)
                    && members.len() >= self.config.max_peers_per_asn
                {
                    return Err(PeerError::AsnLimitExceeded {
                        asn,
                        count: members.len(),
                        limit: self.config.max_peers_per_asn,
                    });
                }
            }
        }
        Ok(())
    }

    /// Counts a registered peer against its subnet and ASN.
    pub fn register(&self, info: &PeerInfo) {
        let mut subnets = self.subnets.write().expect("subnet table lock poisoned");
        subnets.entry(info.subnet()).or_default().insert(info.peer_id.clone());
        drop(subnets);

        if let Some(asn) = info.asn {
            let mut asns = self.asns.write().expect("asn table lock poisoned");
            asns.entry(asn).or_default().insert(info.peer_id.clone());
        }
    }

    /// Removes a peer from its subnet and ASN counts, dropping empty groups.
    pub fn unregister(&self, info: &PeerInfo) {
        let subnet = info.subnet();
        let mut subnets = self.subnets.write().expect("subnet table lock poisoned");
        if let Some(members) = subnets.get_mut(&subnet) {
            members.remove(&info.peer_id);
            if members.is_empty() {
                subnets.remove(&subnet);
            }
        }
        drop(subnets);

        if let Some(asn) = info.asn {
            let mut asns = self.asns.write().expect("asn table lock poisoned");
            if let Some(members) = asns.get_mut(&asn) {
                members.remove(&info.peer_id);
                if members.is_empty() {
                    asns.remove(&asn);
                }
            }
        }
    }

    /// Peers currently counted in `subnet`.
    pub fn subnet_count(&self, subnet: &str) -> usize {
        self.subnets
            .read()
            .expect("subnet table lock poisoned")
            .get(subnet)
            .map_or(0, HashSet::len)
    }

    /// Peers currently counted against `asn`.
    pub fn asn_count(&self, asn: u32) -> usize {
        self.asns.read().expect("asn table lock poisoned").get(&asn).map_or(0, HashSet::len)
    }
}
