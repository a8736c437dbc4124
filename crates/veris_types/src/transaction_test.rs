use std::sync::Arc;

use pretty_assertions::assert_eq;

use crate::address::AccountAddress;
use crate::transaction::{AdmissionTx, MfaProofAttachment, RawMessage, StdTx, TxMessage, UnsignedTx};

fn addr(n: u8) -> AccountAddress {
    AccountAddress::new(format!("veris1signer{n:02}aaaaaaaaaaaa"))
}

#[test]
fn std_tx_collects_unique_signers_in_order() {
    let tx = StdTx::new(vec![
        Arc::new(RawMessage::new("/veris.bank.v1.MsgSend", vec![addr(1), addr(2)])),
        Arc::new(RawMessage::new("/veris.bank.v1.MsgSend", vec![addr(2), addr(3)])),
    ]);

    assert_eq!(tx.signers(), Some(vec![addr(1), addr(2), addr(3)]));
    assert_eq!(tx.signature_count(), 3);
}

#[test]
fn unsigned_tx_has_no_signable_capability() {
    let tx = UnsignedTx::new(vec![Arc::new(RawMessage::new(
        "/veris.oracle.v1.MsgHeartbeat",
        vec![],
    ))]);
    assert_eq!(tx.signers(), None);
    assert_eq!(tx.signature_count(), 0);
}

#[test]
fn mfa_proof_defaults_to_none_and_is_exposed_when_attached() {
    let plain = RawMessage::new("/veris.veid.v1.MsgRotateKey", vec![addr(1)]);
    assert!(plain.mfa_proof().is_none());

    let proof = MfaProofAttachment {
        device_fingerprint: "fp-1".to_owned(),
        factor_id: "totp-1".to_owned(),
        challenge_id: None,
        payload: b"123456".to_vec(),
    };
    let with_proof =
        RawMessage::new("/veris.veid.v1.MsgRotateKey", vec![addr(1)]).with_mfa_proof(proof.clone());
    assert_eq!(with_proof.mfa_proof(), Some(&proof));
}

#[test]
fn std_tx_builder_fields() {
    let tx = StdTx::new(vec![Arc::new(RawMessage::new("/veris.bank.v1.MsgSend", vec![addr(1)]))])
        .with_memo("invoice 7")
        .with_size_bytes(512)
        .with_timeout_height(99);
    assert_eq!(tx.memo(), "invoice 7");
    assert_eq!(tx.size_bytes(), 512);
    assert_eq!(tx.timeout_height(), 99);
}
