//! Peer lifecycle: authentication, authorization, reputation, and the Sybil
//! and Eclipse guards.
//!
//! Every table is keyed by a stable identifier (peer id, subnet string, ASN
//! number); registration inserts into each relevant table and unregistration
//! deletes from each, so no back-pointers exist between them.

mod authenticator;
mod authorizer;
mod eclipse;
mod registry;
mod scorer;
mod sybil;

#[cfg(test)]
pub(crate) mod test_utils;

use std::fmt;
use std::net::{IpAddr, SocketAddr};

use serde::{Deserialize, Serialize};

pub use authenticator::{BanEntry, PeerAuthenticator};
pub use authorizer::PeerAuthorizer;
pub use eclipse::EclipseGuard;
pub use registry::{ConnectedPeer, PeerRegistry};
pub use scorer::{PeerScore, PeerScorer};
pub use sybil::SybilGuard;

/// A stable peer identifier, conventionally the hex of the peer's public key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerId(String);

impl PeerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The conventional id of a public key.
    pub fn from_public_key(public_key: &[u8]) -> Self {
        Self(hex::encode(public_key))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PeerId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

/// Everything known about a peer at connection time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PeerInfo {
    pub peer_id: PeerId,
    pub address: SocketAddr,
    pub public_key: Vec<u8>,
    pub is_inbound: bool,
    pub stake: u128,
    pub is_validator: bool,
    /// Origin autonomous system, when the resolver knows it.
    pub asn: Option<u32>,
}

impl PeerInfo {
    pub fn ip(&self) -> IpAddr {
        self.address.ip()
    }

    /// The peer's subnet key: /24 for IPv4, /48 for IPv6.
    pub fn subnet(&self) -> String {
        subnet_of(self.address.ip())
    }
}

/// Collapses an address into its Sybil-grouping subnet.
pub fn subnet_of(ip: IpAddr) -> String {
    match ip {
        IpAddr::V4(v4) => {
            let octets = v4.octets();
            format!("{}.{}.{}.0/24", octets[0], octets[1], octets[2])
        }
        IpAddr::V6(v6) => {
            let segments = v6.segments();
            format!("{:x}:{:x}:{:x}::/48", segments[0], segments[1], segments[2])
        }
    }
}
