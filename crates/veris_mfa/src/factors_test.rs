use pretty_assertions::assert_eq;
use rstest::rstest;

use crate::factors::{secret_digest, totp_code, FactorEnrollment, FactorStatus, FactorType};

fn totp_enrollment(seed: &[u8]) -> FactorEnrollment {
    FactorEnrollment {
        factor_id: "totp-1".to_owned(),
        factor_type: FactorType::Totp,
        status: FactorStatus::Active,
        security_level: 2,
        enrolled_at: 1_700_000_000,
        verified_at: None,
        secret_digest: secret_digest(seed),
        totp_seed: Some(seed.to_vec()),
    }
}

#[test]
fn totp_code_is_six_digits_and_deterministic() {
    let code = totp_code(b"seed", 12345);
    assert_eq!(code.len(), 6);
    assert!(code.chars().all(|c| c.is_ascii_digit()));
    assert_eq!(code, totp_code(b"seed", 12345));
    assert_ne!(totp_code(b"seed", 12345), totp_code(b"seed", 12346));
}

#[rstest]
#[case::current_step(0i64)]
#[case::one_step_behind(-30)]
#[case::one_step_ahead(30)]
fn totp_accepts_adjacent_steps(#[case] skew_secs: i64) {
    let enrollment = totp_enrollment(b"seed");
    let unix_now: u64 = 1_700_000_000;
    let code_time = unix_now.checked_add_signed(skew_secs).unwrap();
    let code = totp_code(b"seed", code_time / 30);
    assert!(enrollment.verify_response(code.as_bytes(), unix_now));
}

#[test]
fn totp_rejects_distant_steps() {
    let enrollment = totp_enrollment(b"seed");
    let unix_now: u64 = 1_700_000_000;
    let stale = totp_code(b"seed", unix_now / 30 - 2);
    assert!(!enrollment.verify_response(stale.as_bytes(), unix_now));
}

#[test]
fn backup_code_verifies_against_digest() {
    let enrollment = FactorEnrollment {
        factor_id: "backup-1".to_owned(),
        factor_type: FactorType::BackupCode,
        status: FactorStatus::Active,
        security_level: 1,
        enrolled_at: 1_700_000_000,
        verified_at: None,
        secret_digest: secret_digest(b"rescue-code-42"),
        totp_seed: None,
    };
    assert!(enrollment.verify_response(b"rescue-code-42", 1_700_000_000));
    assert!(!enrollment.verify_response(b"rescue-code-43", 1_700_000_000));
}
