use std::sync::Arc;

use assert_matches::assert_matches;
use pretty_assertions::assert_eq;
use veris_time::{Clock, ManualClock};
use veris_types::address::AccountAddress;
use veris_types::sensitive::SensitiveTxType;
use veris_types::transaction::MfaProofAttachment;

use crate::adapter::{LocalMfaAdapter, MfaAdapter, MfaPolicy};
use crate::errors::MfaError;
use crate::factors::{secret_digest, totp_code, FactorEnrollment, FactorStatus, FactorType};

fn address() -> AccountAddress {
    AccountAddress::from("veris1qy352euf40x77qfrg4ncn27")
}

fn enrollment(
    factor_id: &str,
    factor_type: FactorType,
    status: FactorStatus,
    security_level: u8,
    enrolled_at: u64,
    verified_at: Option<u64>,
) -> FactorEnrollment {
    let (secret, totp_seed) = match factor_type {
        FactorType::Totp => (b"totp-seed".to_vec(), Some(b"totp-seed".to_vec())),
        _ => (b"backup-code".to_vec(), None),
    };
    FactorEnrollment {
        factor_id: factor_id.to_owned(),
        factor_type,
        status,
        security_level,
        enrolled_at,
        verified_at,
        secret_digest: secret_digest(&secret),
        totp_seed,
    }
}

fn adapter() -> (LocalMfaAdapter, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new());
    (LocalMfaAdapter::new(MfaPolicy::default(), clock.clone()), clock)
}

#[test]
fn mfa_not_required_without_active_enrollment() {
    let (adapter, _clock) = adapter();
    assert!(!adapter.requires_mfa(&address(), SensitiveTxType::KeyRotation).required);

    adapter.enroll(
        address(),
        enrollment("totp-1", FactorType::Totp, FactorStatus::Pending, 2, 100, None),
    );
    assert!(!adapter.requires_mfa(&address(), SensitiveTxType::KeyRotation).required);
}

#[test]
fn mfa_required_only_for_covered_tx_types() {
    let (adapter, _clock) = adapter();
    adapter.enroll(
        address(),
        enrollment("totp-1", FactorType::Totp, FactorStatus::Active, 2, 100, None),
    );

    assert!(adapter.requires_mfa(&address(), SensitiveTxType::KeyRotation).required);
    assert!(adapter.requires_mfa(&address(), SensitiveTxType::AccountRecovery).required);
    assert!(!adapter.requires_mfa(&address(), SensitiveTxType::HighValueOrder).required);
}

#[test]
fn trusted_device_bypasses() {
    let (adapter, _clock) = adapter();
    adapter.trust_device(address(), "laptop-1");

    let decision = adapter.can_bypass(&address(), SensitiveTxType::KeyRotation, "laptop-1");
    assert!(decision.bypass);
    assert!(decision.reduced_factors.is_empty());
    assert!(!adapter.can_bypass(&address(), SensitiveTxType::KeyRotation, "laptop-2").bypass);
}

#[test]
fn challenge_targets_best_enrollment() {
    let (adapter, _clock) = adapter();
    adapter.enroll(
        address(),
        enrollment("backup-1", FactorType::BackupCode, FactorStatus::Active, 1, 300, Some(400)),
    );
    adapter.enroll(
        address(),
        enrollment("totp-old", FactorType::Totp, FactorStatus::Active, 3, 100, Some(150)),
    );
    adapter.enroll(
        address(),
        enrollment("totp-new", FactorType::Totp, FactorStatus::Active, 3, 200, Some(250)),
    );
    adapter.enroll(
        address(),
        enrollment("webauthn-revoked", FactorType::Webauthn, FactorStatus::Revoked, 5, 500, None),
    );

    // Highest security level wins; the tie breaks on the later verification.
    let challenge = adapter.create_challenge(&address(), SensitiveTxType::AccountRecovery).unwrap();
    assert_eq!(challenge.factor_id, "totp-new");
    assert_eq!(challenge.tx_type, "account_recovery");
}

#[test]
fn create_challenge_without_enrollment_fails() {
    let (adapter, _clock) = adapter();
    assert_matches!(
        adapter.create_challenge(&address(), SensitiveTxType::AccountRecovery),
        Err(MfaError::NoActiveFactor { .. })
    );
}

#[test]
fn totp_proof_round_trip_via_challenge() {
    let (adapter, clock) = adapter();
    adapter.enroll(
        address(),
        enrollment("totp-1", FactorType::Totp, FactorStatus::Active, 2, 100, None),
    );

    let challenge = adapter.create_challenge(&address(), SensitiveTxType::KeyRotation).unwrap();
    let code = totp_code(b"totp-seed", clock.unix_now() / 30);
    let consumed = adapter.verify_challenge(&challenge.challenge_id, code.as_bytes()).unwrap();
    assert_eq!(consumed.factor_id, "totp-1");
}

#[test]
fn direct_proof_validation_without_challenge() {
    let (adapter, clock) = adapter();
    adapter.enroll(
        address(),
        enrollment("totp-1", FactorType::Totp, FactorStatus::Active, 2, 100, None),
    );

    let proof = MfaProofAttachment {
        device_fingerprint: "laptop-1".to_owned(),
        factor_id: "totp-1".to_owned(),
        challenge_id: None,
        payload: totp_code(b"totp-seed", clock.unix_now() / 30).into_bytes(),
    };
    adapter.validate_proof(&address(), SensitiveTxType::KeyRotation, &proof).unwrap();

    let bad = MfaProofAttachment { payload: b"000000".to_vec(), ..proof };
    assert_matches!(
        adapter.validate_proof(&address(), SensitiveTxType::KeyRotation, &bad),
        Err(MfaError::ProofRejected { .. })
    );
}

#[test]
fn unknown_factor_is_rejected() {
    let (adapter, _clock) = adapter();
    let proof = MfaProofAttachment {
        device_fingerprint: "laptop-1".to_owned(),
        factor_id: "ghost".to_owned(),
        challenge_id: None,
        payload: b"123456".to_vec(),
    };
    assert_matches!(
        adapter.validate_proof(&address(), SensitiveTxType::KeyRotation, &proof),
        Err(MfaError::UnknownFactor { .. })
    );
}
