use std::sync::Arc;

use assert_matches::assert_matches;
use pretty_assertions::assert_eq;
use veris_time::ManualClock;

use crate::errors::PeerError;
use crate::peer::test_utils::peer_info;
use crate::peer::PeerRegistry;

#[test]
fn register_and_unregister_round_trip() {
    let registry = PeerRegistry::new(Arc::new(ManualClock::new()));
    let info = peer_info(1, true);

    registry.register(info.clone()).unwrap();
    assert!(registry.contains(&info.peer_id));
    assert_eq!(registry.count(), 1);

    let departed = registry.unregister(&info.peer_id).unwrap();
    assert_eq!(departed.info, info);
    assert_eq!(registry.count(), 0);
    assert_matches!(
        registry.unregister(&info.peer_id),
        Err(PeerError::UnknownPeer { .. })
    );
}

#[test]
fn duplicate_registration_is_rejected() {
    let registry = PeerRegistry::new(Arc::new(ManualClock::new()));
    registry.register(peer_info(1, true)).unwrap();
    assert_matches!(
        registry.register(peer_info(1, false)),
        Err(PeerError::DuplicatePeer { .. })
    );
}

#[test]
fn direction_counts() {
    let registry = PeerRegistry::new(Arc::new(ManualClock::new()));
    registry.register(peer_info(1, true)).unwrap();
    registry.register(peer_info(2, true)).unwrap();
    registry.register(peer_info(3, false)).unwrap();

    assert_eq!(registry.inbound_count(), 2);
    assert_eq!(registry.outbound_count(), 1);
    assert_eq!(registry.snapshot().len(), 3);
}
