use std::net::SocketAddr;

use crate::peer::{PeerId, PeerInfo};

/// A deterministic peer on its own /24 subnet and ASN.
pub(crate) fn peer_info(n: u8, is_inbound: bool) -> PeerInfo {
    let address: SocketAddr = format!("10.0.{n}.1:26656").parse().unwrap();
    PeerInfo {
        peer_id: PeerId::new(format!("peer-{n:02}")),
        address,
        public_key: vec![n; 32],
        is_inbound,
        stake: 1_000,
        is_validator: false,
        asn: Some(u32::from(n)),
    }
}

/// A peer pinned to the given subnet-defining address.
pub(crate) fn peer_info_at(n: u8, addr: &str, asn: Option<u32>) -> PeerInfo {
    PeerInfo {
        peer_id: PeerId::new(format!("peer-{n:02}")),
        address: addr.parse().unwrap(),
        public_key: vec![n; 32],
        is_inbound: true,
        stake: 1_000,
        is_validator: false,
        asn,
    }
}
