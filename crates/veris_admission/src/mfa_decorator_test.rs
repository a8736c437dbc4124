use std::sync::Arc;

use assert_matches::assert_matches;
use veris_mfa::{BypassDecision, MfaError, MockMfaAdapter, RequirementDecision};
use veris_types::sensitive::SensitiveTxType;
use veris_types::transaction::MfaProofAttachment;

use crate::chain::AdmissionDecorator;
use crate::context::AdmissionContext;
use crate::errors::{AdmissionError, MfaGateError};
use crate::mfa_decorator::MfaGateDecorator;
use crate::test_utils::{sensitive_tx, sensitive_tx_with_proof, test_address};

fn ctx() -> AdmissionContext {
    AdmissionContext::new(1, 1_700_000_000)
}

fn proof(device_fingerprint: &str) -> MfaProofAttachment {
    MfaProofAttachment {
        device_fingerprint: device_fingerprint.to_owned(),
        factor_id: "totp-1".to_owned(),
        challenge_id: None,
        payload: b"123456".to_vec(),
    }
}

#[test]
fn non_gated_categories_skip_the_adapter() {
    let mut adapter = MockMfaAdapter::new();
    adapter.expect_requires_mfa().never();
    let decorator = MfaGateDecorator::new(Arc::new(adapter));

    let signer = test_address(1);
    decorator.check(&mut ctx(), &sensitive_tx(SensitiveTxType::HighValueOrder, &signer)).unwrap();
}

#[test]
fn not_required_skips_proof_handling() {
    let mut adapter = MockMfaAdapter::new();
    adapter
        .expect_requires_mfa()
        .return_const(RequirementDecision { required: false, reduced_factors: Vec::new() });
    adapter.expect_validate_proof().never();
    let decorator = MfaGateDecorator::new(Arc::new(adapter));

    let signer = test_address(1);
    decorator.check(&mut ctx(), &sensitive_tx(SensitiveTxType::KeyRotation, &signer)).unwrap();
}

#[test]
fn missing_proof_is_rejected_when_required() {
    let mut adapter = MockMfaAdapter::new();
    adapter
        .expect_requires_mfa()
        .return_const(RequirementDecision { required: true, reduced_factors: Vec::new() });
    let decorator = MfaGateDecorator::new(Arc::new(adapter));

    let signer = test_address(1);
    let err = decorator
        .check(&mut ctx(), &sensitive_tx(SensitiveTxType::KeyRotation, &signer))
        .unwrap_err();
    assert_matches!(err, AdmissionError::Mfa(MfaGateError::MfaRequired { .. }));
}

#[test]
fn trusted_device_bypass_skips_proof_validation() {
    let mut adapter = MockMfaAdapter::new();
    adapter
        .expect_requires_mfa()
        .return_const(RequirementDecision { required: true, reduced_factors: Vec::new() });
    adapter
        .expect_can_bypass()
        .withf(|_, _, device_fingerprint| device_fingerprint == "laptop-1")
        .return_const(BypassDecision { bypass: true, reduced_factors: Vec::new() });
    adapter.expect_validate_proof().never();
    let decorator = MfaGateDecorator::new(Arc::new(adapter));

    let signer = test_address(1);
    let tx = sensitive_tx_with_proof(SensitiveTxType::KeyRotation, &signer, proof("laptop-1"));
    decorator.check(&mut ctx(), &tx).unwrap();
}

#[test]
fn valid_proof_is_accepted_without_bypass() {
    let mut adapter = MockMfaAdapter::new();
    adapter
        .expect_requires_mfa()
        .return_const(RequirementDecision { required: true, reduced_factors: Vec::new() });
    adapter.expect_can_bypass().return_const(BypassDecision::default());
    adapter.expect_validate_proof().times(1).returning(|_, _, _| Ok(()));
    let decorator = MfaGateDecorator::new(Arc::new(adapter));

    let signer = test_address(1);
    let tx = sensitive_tx_with_proof(SensitiveTxType::AccountRecovery, &signer, proof("other"));
    decorator.check(&mut ctx(), &tx).unwrap();
}

#[test]
fn adapter_rejection_propagates_with_the_sentinel() {
    let mut adapter = MockMfaAdapter::new();
    adapter
        .expect_requires_mfa()
        .return_const(RequirementDecision { required: true, reduced_factors: Vec::new() });
    adapter.expect_can_bypass().return_const(BypassDecision::default());
    adapter.expect_validate_proof().returning(|_, _, proof| {
        Err(MfaError::ProofRejected { factor_id: proof.factor_id.clone() })
    });
    let decorator = MfaGateDecorator::new(Arc::new(adapter));

    let signer = test_address(1);
    let tx = sensitive_tx_with_proof(SensitiveTxType::KeyRotation, &signer, proof("other"));
    let err = decorator.check(&mut ctx(), &tx).unwrap_err();
    assert_matches!(
        err,
        AdmissionError::Mfa(MfaGateError::Adapter(MfaError::ProofRejected { .. }))
    );
}
