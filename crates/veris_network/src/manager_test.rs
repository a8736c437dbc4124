use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use assert_matches::assert_matches;
use pretty_assertions::assert_eq;
use veris_time::ManualClock;

use crate::config::{
    DdosConfig,
    EclipseConfig,
    NetRateLimitConfig,
    NetworkSecurityConfig,
    PeerConfig,
    ScoreConfig,
    SybilConfig,
};
use crate::errors::{NetworkError, PeerError};
use crate::manager::NetworkSecurityManager;
use crate::peer::test_utils::peer_info;
use crate::peer::PeerId;

fn permissive_config() -> NetworkSecurityConfig {
    NetworkSecurityConfig {
        peer: PeerConfig { max_peers: 10, max_inbound: 8, max_outbound: 8, ..Default::default() },
        sybil: SybilConfig { max_peers_per_subnet: 10, max_peers_per_asn: 10, ..Default::default() },
        eclipse: EclipseConfig { outbound_only_slots: 2, ..Default::default() },
        rate_limit: NetRateLimitConfig {
            connections_per_second: 100.0,
            connection_burst: 100.0,
            ..Default::default()
        },
        ddos: DdosConfig { max_connections_per_window: 1_000, ..Default::default() },
        ..Default::default()
    }
}

fn manager(config: NetworkSecurityConfig) -> (Arc<NetworkSecurityManager>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new());
    (Arc::new(NetworkSecurityManager::new(config, clock.clone())), clock)
}

#[test]
fn admitted_peer_lands_in_every_table() {
    let (manager, _clock) = manager(permissive_config());
    let info = peer_info(1, true);

    manager.admit_peer(info.clone()).unwrap();
    assert!(manager.registry().contains(&info.peer_id));
    assert!(manager.scorer().score_record(&info.peer_id).is_some());

    manager.disconnect_peer(&info.peer_id).unwrap();
    assert!(!manager.registry().contains(&info.peer_id));
    // Score history survives the disconnect.
    assert!(manager.scorer().score_record(&info.peer_id).is_some());
}

#[test]
fn duplicate_admission_is_rejected() {
    let (manager, _clock) = manager(permissive_config());
    manager.admit_peer(peer_info(1, true)).unwrap();
    assert_matches!(
        manager.admit_peer(peer_info(1, true)),
        Err(NetworkError::Peer(PeerError::DuplicatePeer { .. }))
    );
}

#[test]
fn connection_rate_limit_fires_before_the_peer_gates() {
    let mut config = permissive_config();
    config.rate_limit.connections_per_second = 1.0;
    config.rate_limit.connection_burst = 1.0;
    let (manager, _clock) = manager(config);

    manager.admit_peer(peer_info(1, true)).unwrap();
    // Same source address, fresh peer id: the IP bucket is dry.
    let mut second = peer_info(2, true);
    second.address = peer_info(1, true).address;
    assert_matches!(
        manager.admit_peer(second),
        Err(NetworkError::ConnectionRateLimited { .. })
    );
}

#[test]
fn severe_misbehavior_bans_the_peer() {
    let mut config = permissive_config();
    config.score = ScoreConfig {
        severe_misbehavior_threshold: 10.0,
        auto_ban_duration_secs: 3600,
        ..Default::default()
    };
    let (manager, _clock) = manager(config);
    let info = peer_info(1, true);
    manager.admit_peer(info.clone()).unwrap();

    manager.report_misbehavior(&info.peer_id, 10.0, "invalid block");
    manager.disconnect_peer(&info.peer_id).unwrap();

    assert_matches!(
        manager.admit_peer(info),
        Err(NetworkError::Peer(PeerError::Banned { .. }))
    );
}

#[test]
fn message_rate_limit_penalizes_the_peer() {
    let mut config = permissive_config();
    config.rate_limit.messages_per_second = 1.0;
    config.rate_limit.message_burst = 1.0;
    config.rate_limit.bytes_per_second = 0.0;
    let (manager, _clock) = manager(config);
    let info = peer_info(1, true);
    manager.admit_peer(info.clone()).unwrap();

    manager.on_message(&info.peer_id, 100).unwrap();
    assert_matches!(
        manager.on_message(&info.peer_id, 100),
        Err(NetworkError::MessageRateLimited { .. })
    );
    assert!(manager.scorer().score_record(&info.peer_id).unwrap().rate_limit_penalty > 0.0);
}

#[test]
fn messages_from_unknown_peers_are_refused() {
    let (manager, _clock) = manager(permissive_config());
    assert_matches!(
        manager.on_message(&PeerId::from("ghost"), 10),
        Err(NetworkError::Peer(PeerError::UnknownPeer { .. }))
    );
}

#[test]
fn maintenance_selects_anchors_and_rotates_on_schedule() {
    let mut config = permissive_config();
    config.eclipse = EclipseConfig {
        anchor_count: 1,
        rotation_interval_secs: 3600,
        random_selection_ratio: 1.0,
        outbound_only_slots: 2,
        ..Default::default()
    };
    let (manager, clock) = manager(config);
    for n in 1..=3 {
        manager.admit_peer(peer_info(n, false)).unwrap();
    }

    // First pass: interval not yet elapsed, nothing rotates.
    assert!(manager.run_maintenance().is_empty());

    clock.advance(Duration::from_secs(3600));
    let victims = manager.run_maintenance();
    assert_eq!(victims.len(), 2, "non-anchor peers rotate");
}

#[test]
fn firewall_rendering_is_stable_between_policy_updates() {
    let (manager, _clock) = manager(permissive_config());
    let first = manager.render_firewall();
    assert_eq!(manager.render_firewall(), first);

    manager.update_firewall_policy(
        vec![crate::firewall::IpRule {
            ip: "198.51.100.9".parse().unwrap(),
            port: None,
            expires_at: None,
        }],
        Vec::new(),
    );
    let updated = manager.render_firewall();
    assert!(updated.contains("198.51.100.9"));
    assert_eq!(manager.render_firewall(), updated);
}

#[test]
fn require_peer_auth_refuses_untrusted_transport_keys() {
    let mut config = permissive_config();
    config.noise.require_peer_auth = true;
    let (manager, _clock) = manager(config);

    let stranger = [9u8; 32];
    // No I/O happens: the key check fails before the first handshake byte.
    let io = std::io::Cursor::new(Vec::new());
    assert_matches!(
        manager.secure_outbound(io, &stranger),
        Err(NetworkError::Noise(crate::errors::NoiseError::InvalidPublicKey))
    );

    manager.trust_transport_key(stranger);
    // Now the handshake itself runs (and fails on the empty stream).
    let io = std::io::Cursor::new(Vec::new());
    assert_matches!(
        manager.secure_outbound(io, &stranger),
        Err(NetworkError::Noise(crate::errors::NoiseError::Io(_)))
    );
}

#[test]
fn manager_secures_connections_end_to_end() {
    let (manager, _clock) = manager(permissive_config());
    let server_manager = Arc::clone(&manager);

    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let responder = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        server_manager.secure_inbound(stream).unwrap()
    });

    let stream = TcpStream::connect(addr).unwrap();
    let transport_key = manager.transport_public_key();
    let outbound = manager.secure_outbound(stream, &transport_key).unwrap();
    let inbound = responder.join().unwrap();

    outbound.write_message(b"block gossip").unwrap();
    assert_eq!(inbound.read_message().unwrap(), b"block gossip");
    inbound.write_message(b"ack").unwrap();
    assert_eq!(outbound.read_message().unwrap(), b"ack");
}
