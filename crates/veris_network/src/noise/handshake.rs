use std::io::{Read, Write};

use hkdf::Hkdf;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use x25519_dalek::{PublicKey, ReusableSecret, StaticSecret};

use crate::errors::NoiseError;
use crate::noise::cipher::{CipherState, TAG_SIZE};

#[cfg(test)]
#[path = "handshake_test.rs"]
mod handshake_test;

/// The protocol name, mixed into the initial handshake hash.
pub const PROTOCOL_NAME: &[u8] = b"Noise_NK_25519_ChaChaPoly_SHA256";

const KEY_SIZE: usize = 32;
/// First handshake message: the initiator's ephemeral public key.
const MESSAGE_ONE_SIZE: usize = KEY_SIZE;
/// Second handshake message: responder ephemeral plus the auth tag.
const MESSAGE_TWO_SIZE: usize = KEY_SIZE + TAG_SIZE;

/// The responder's long-term keypair.
#[derive(Clone)]
pub struct StaticKeypair {
    secret: StaticSecret,
    public: [u8; 32],
}

impl StaticKeypair {
    pub fn generate() -> Self {
        let secret = StaticSecret::random_from_rng(OsRng);
        let public = *PublicKey::from(&secret).as_bytes();
        Self { secret, public }
    }

    pub fn from_secret_bytes(secret_bytes: [u8; 32]) -> Self {
        let secret = StaticSecret::from(secret_bytes);
        let public = *PublicKey::from(&secret).as_bytes();
        Self { secret, public }
    }

    pub fn public_key(&self) -> [u8; 32] {
        self.public
    }
}

impl std::fmt::Debug for StaticKeypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticKeypair").field("public", &hex::encode(self.public)).finish_non_exhaustive()
    }
}

/// Both cipher states plus the transcript artifacts of a finished handshake.
#[derive(Debug)]
pub struct HandshakeOutput {
    pub send: CipherState,
    pub recv: CipherState,
    pub remote_public_key: [u8; 32],
    pub handshake_hash: [u8; 32],
}

/// The hash/chaining-key transcript shared by both roles.
struct SymmetricState {
    chaining_key: [u8; 32],
    hash: [u8; 32],
}

impl SymmetricState {
    fn new() -> Self {
        // The protocol name fits a hash block; pad rather than hash it.
        let mut hash = [0u8; 32];
        if PROTOCOL_NAME.len() <= 32 {
            hash[..PROTOCOL_NAME.len()].copy_from_slice(PROTOCOL_NAME);
        } else {
            hash = Sha256::digest(PROTOCOL_NAME).into();
        }
        Self { chaining_key: hash, hash }
    }

    fn mix_hash(&mut self, data: &[u8]) {
        let mut hasher = Sha256::new();
        hasher.update(self.hash);
        hasher.update(data);
        self.hash = hasher.finalize().into();
    }

    fn mix_key(&mut self, input_key_material: &[u8]) {
        let hkdf = Hkdf::<Sha256>::new(Some(&self.chaining_key), input_key_material);
        let mut okm = [0u8; 32];
        hkdf.expand(&[], &mut okm).expect("32 bytes is a valid hkdf output length");
        self.chaining_key = okm;
    }

    /// 16-byte truncation of `H(handshake_hash ∥ chaining_key)`; the
    /// responder proves possession of its static key with it.
    fn auth_tag(&self) -> [u8; TAG_SIZE] {
        let mut hasher = Sha256::new();
        hasher.update(self.hash);
        hasher.update(self.chaining_key);
        let digest = hasher.finalize();
        let mut tag = [0u8; TAG_SIZE];
        tag.copy_from_slice(&digest[..TAG_SIZE]);
        tag
    }

    /// Two 32-byte transport keys from the final chaining key. Each side's
    /// send key is the other side's receive key.
    fn split(&self) -> ([u8; 32], [u8; 32]) {
        let hkdf = Hkdf::<Sha256>::new(Some(&self.chaining_key), &[]);
        let mut okm = [0u8; 64];
        hkdf.expand(b"transport", &mut okm).expect("64 bytes is a valid hkdf output length");
        let mut initiator_key = [0u8; 32];
        let mut responder_key = [0u8; 32];
        initiator_key.copy_from_slice(&okm[..32]);
        responder_key.copy_from_slice(&okm[32..]);
        (initiator_key, responder_key)
    }
}

/// Runs the initiator side over `io`. The responder's static public key must
/// be known a priori; it is mixed into the transcript, so a responder holding
/// a different key cannot produce a valid tag.
pub fn initiate<T: Read + Write>(
    io: &mut T,
    responder_static: &[u8; 32],
) -> Result<HandshakeOutput, NoiseError> {
    let mut state = SymmetricState::new();
    state.mix_hash(responder_static);

    let ephemeral = ReusableSecret::random_from_rng(OsRng);
    let ephemeral_public = *PublicKey::from(&ephemeral).as_bytes();

    io.write_all(&ephemeral_public)?;
    io.flush()?;
    state.mix_hash(&ephemeral_public);
    let dh_es = ephemeral.diffie_hellman(&PublicKey::from(*responder_static));
    state.mix_key(dh_es.as_bytes());

    let mut message_two = [0u8; MESSAGE_TWO_SIZE];
    io.read_exact(&mut message_two)?;
    let mut responder_ephemeral = [0u8; KEY_SIZE];
    responder_ephemeral.copy_from_slice(&message_two[..KEY_SIZE]);
    let received_tag = &message_two[KEY_SIZE..];

    state.mix_hash(&responder_ephemeral);
    let dh_ee = ephemeral.diffie_hellman(&PublicKey::from(responder_ephemeral));
    state.mix_key(dh_ee.as_bytes());

    let expected_tag = state.auth_tag();
    if !bool::from(expected_tag[..].ct_eq(received_tag)) {
        return Err(NoiseError::AuthTagMismatch);
    }

    let (initiator_key, responder_key) = state.split();
    Ok(HandshakeOutput {
        send: CipherState::new(initiator_key),
        recv: CipherState::new(responder_key),
        remote_public_key: *responder_static,
        handshake_hash: state.hash,
    })
}

/// Runs the responder side over `io` with the local static keypair.
pub fn respond<T: Read + Write>(
    io: &mut T,
    local_static: &StaticKeypair,
) -> Result<HandshakeOutput, NoiseError> {
    let mut state = SymmetricState::new();
    state.mix_hash(&local_static.public);

    let mut initiator_ephemeral = [0u8; MESSAGE_ONE_SIZE];
    io.read_exact(&mut initiator_ephemeral)?;
    state.mix_hash(&initiator_ephemeral);
    let dh_es = local_static.secret.diffie_hellman(&PublicKey::from(initiator_ephemeral));
    state.mix_key(dh_es.as_bytes());

    let ephemeral = ReusableSecret::random_from_rng(OsRng);
    let ephemeral_public = *PublicKey::from(&ephemeral).as_bytes();
    state.mix_hash(&ephemeral_public);
    let dh_ee = ephemeral.diffie_hellman(&PublicKey::from(initiator_ephemeral));
    state.mix_key(dh_ee.as_bytes());

    let tag = state.auth_tag();
    let mut message_two = [0u8; MESSAGE_TWO_SIZE];
    message_two[..KEY_SIZE].copy_from_slice(&ephemeral_public);
    message_two[KEY_SIZE..].copy_from_slice(&tag);
    io.write_all(&message_two)?;
    io.flush()?;

    let (initiator_key, responder_key) = state.split();
    Ok(HandshakeOutput {
        send: CipherState::new(responder_key),
        recv: CipherState::new(initiator_key),
        remote_public_key: initiator_ephemeral,
        handshake_hash: state.hash,
    })
}
