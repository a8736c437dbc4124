use std::net::IpAddr;

use thiserror::Error;

use crate::peer::PeerId;

/// Transport errors. Any of these closes the session; the remote peer's
/// misbehavior penalty is raised by the caller.
#[derive(Debug, Error)]
pub enum NoiseError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("handshake authentication tag mismatch")]
    AuthTagMismatch,
    #[error("record failed to decrypt")]
    Decrypt,
    #[error("record payload of {len} bytes exceeds the {max}-byte maximum")]
    RecordTooLarge { len: usize, max: usize },
    #[error("session nonce space exhausted")]
    NonceExhausted,
    #[error("remote public key is not a valid curve point encoding")]
    InvalidPublicKey,
}

/// Peer-policy rejections. These prevent a connection without disturbing
/// existing sessions.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PeerError {
    #[error("peer {peer_id} is banned for another {remaining_secs}s: {reason}")]
    Banned { peer_id: PeerId, remaining_secs: u64, reason: String },
    #[error("peer table is full: {current} of {max}")]
    TooManyPeers { current: usize, max: usize },
    #[error("inbound peer limit reached: {current} of {max}")]
    TooManyInbound { current: usize, max: usize },
    #[error("outbound peer limit reached: {current} of {max}")]
    TooManyOutbound { current: usize, max: usize },
    #[error("peer {peer_id} score {score} is below the admission threshold {threshold}")]
    ScoreBelowThreshold { peer_id: PeerId, score: i64, threshold: i64 },
    #[error("peer {peer_id} supplied a malformed public key")]
    MalformedPublicKey { peer_id: PeerId },
    #[error("subnet {subnet} already hosts {count} peers; limit is {limit}")]
    SubnetLimitExceeded { subnet: String, count: usize, limit: usize },
    #[error("ASN {asn} already hosts {count} peers; limit is {limit}")]
    AsnLimitExceeded { asn: u32, count: usize, limit: usize },
    #[error("peer {peer_id} stake {stake} is below the required minimum {min_stake}")]
    InsufficientStake { peer_id: PeerId, stake: u128, min_stake: u128 },
    #[error("inbound slots exhausted; {reserved} slots are reserved for outbound peers")]
    InboundSlotsReserved { reserved: usize },
    #[error("peer {peer_id} is already registered")]
    DuplicatePeer { peer_id: PeerId },
    #[error("peer {peer_id} is not registered")]
    UnknownPeer { peer_id: PeerId },
}

/// Any failure on the network path.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error(transparent)]
    Noise(#[from] NoiseError),
    #[error(transparent)]
    Peer(#[from] PeerError),
    #[error("connection rate limit exceeded for {addr}")]
    ConnectionRateLimited { addr: IpAddr },
    #[error("message rate limit exceeded for {addr}")]
    MessageRateLimited { addr: IpAddr },
    #[error("address {addr} is banned for another {remaining_secs}s")]
    AddressBanned { addr: IpAddr, remaining_secs: u64 },
    #[error("connection flood detected; {addr} banned")]
    ConnectionFlood { addr: IpAddr },
    #[error("message flood detected; {addr} banned")]
    MessageFlood { addr: IpAddr },
}

pub type NetworkResult<T> = Result<T, NetworkError>;
