use assert_matches::assert_matches;
use pretty_assertions::assert_eq;

use crate::errors::NoiseError;
use crate::noise::cipher::{CipherState, MAX_RECORD_PAYLOAD, TAG_SIZE};

const KEY: [u8; 32] = [7u8; 32];

#[test]
fn round_trip_and_nonce_monotonicity() {
    let mut sender = CipherState::new(KEY);
    let mut receiver = CipherState::new(KEY);

    for expected_nonce in 0..3u64 {
        assert_eq!(sender.nonce(), expected_nonce);
        let plaintext = format!("record {expected_nonce}").into_bytes();
        let ciphertext = sender.encrypt(&plaintext).unwrap();
        assert_eq!(ciphertext.len(), plaintext.len() + TAG_SIZE);
        assert_eq!(receiver.decrypt(&ciphertext).unwrap(), plaintext);
    }
    assert_eq!(sender.nonce(), 3);
    assert_eq!(receiver.nonce(), 3);
}

#[test]
fn any_single_bit_flip_fails_decryption() {
    let mut sender = CipherState::new(KEY);
    let ciphertext = sender.encrypt(b"payload").unwrap();

    for byte_index in [0, ciphertext.len() / 2, ciphertext.len() - 1] {
        let mut tampered = ciphertext.clone();
        tampered[byte_index] ^= 0x01;
        let mut receiver = CipherState::new(KEY);
        assert_matches!(receiver.decrypt(&tampered), Err(NoiseError::Decrypt));
    }
}

#[test]
fn nonce_reuse_never_happens_across_records() {
    // Identical plaintexts must produce distinct ciphertexts.
    let mut sender = CipherState::new(KEY);
    let first = sender.encrypt(b"same").unwrap();
    let second = sender.encrypt(b"same").unwrap();
    assert_ne!(first, second);
}

#[test]
fn oversized_payload_is_rejected_without_consuming_a_nonce() {
    let mut sender = CipherState::new(KEY);
    let oversized = vec![0u8; MAX_RECORD_PAYLOAD + 1];
    assert_matches!(
        sender.encrypt(&oversized),
        Err(NoiseError::RecordTooLarge { len, max })
            if len == MAX_RECORD_PAYLOAD + 1 && max == MAX_RECORD_PAYLOAD
    );
    assert_eq!(sender.nonce(), 0);
}

#[test]
fn max_payload_round_trips() {
    let mut sender = CipherState::new(KEY);
    let mut receiver = CipherState::new(KEY);
    let payload = vec![0xabu8; MAX_RECORD_PAYLOAD];
    let ciphertext = sender.encrypt(&payload).unwrap();
    assert_eq!(ciphertext.len(), u16::MAX as usize);
    assert_eq!(receiver.decrypt(&ciphertext).unwrap(), payload);
}
