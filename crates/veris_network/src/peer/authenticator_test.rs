use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use pretty_assertions::assert_eq;
use veris_time::ManualClock;

use crate::errors::PeerError;
use crate::peer::authenticator::PeerAuthenticator;
use crate::peer::test_utils::peer_info;
use crate::peer::PeerId;

fn authenticator() -> (PeerAuthenticator, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new());
    (PeerAuthenticator::new(clock.clone()), clock)
}

#[test]
fn structural_key_check() {
    let (auth, _clock) = authenticator();
    auth.authenticate(&peer_info(1, true)).unwrap();

    let mut malformed = peer_info(2, true);
    malformed.public_key = vec![2; 16];
    assert_matches!(
        auth.authenticate(&malformed),
        Err(PeerError::MalformedPublicKey { .. })
    );
}

#[test]
fn trusted_peers_skip_the_structural_check() {
    let (auth, _clock) = authenticator();
    let mut info = peer_info(1, true);
    info.public_key = Vec::new();
    auth.trust(info.peer_id.clone());
    auth.authenticate(&info).unwrap();
}

#[test]
fn bans_expire_with_the_clock() {
    let (auth, clock) = authenticator();
    let info = peer_info(1, true);
    auth.ban(info.peer_id.clone(), Duration::from_secs(60), "misbehavior");

    assert_matches!(
        auth.authenticate(&info),
        Err(PeerError::Banned { remaining_secs, .. }) if remaining_secs <= 60
    );
    assert!(auth.is_banned(&info.peer_id));

    clock.advance(Duration::from_secs(60));
    assert!(!auth.is_banned(&info.peer_id));
    auth.authenticate(&info).unwrap();
}

#[test]
fn a_ban_overrides_trust() {
    let (auth, _clock) = authenticator();
    let info = peer_info(1, true);
    auth.trust(info.peer_id.clone());
    auth.ban(info.peer_id.clone(), Duration::from_secs(60), "severe misbehavior");
    assert_matches!(auth.authenticate(&info), Err(PeerError::Banned { .. }));
}

#[test]
fn prune_reclaims_expired_bans_only() {
    let (auth, clock) = authenticator();
    auth.ban(PeerId::from("short"), Duration::from_secs(10), "short ban");
    auth.ban(PeerId::from("long"), Duration::from_secs(100), "long ban");

    clock.advance(Duration::from_secs(10));
    assert_eq!(auth.prune_expired_bans(), 1);
    assert_eq!(auth.ban_count(), 1);
    assert!(auth.is_banned(&PeerId::from("long")));
}
