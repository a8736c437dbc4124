use chacha20poly1305::aead::Aead;
use chacha20poly1305::{ChaCha20Poly1305, Key, KeyInit, Nonce};
use zeroize::Zeroize;

use crate::errors::NoiseError;

#[cfg(test)]
#[path = "cipher_test.rs"]
mod cipher_test;

/// Poly1305 tag length.
pub const TAG_SIZE: usize = 16;
/// Maximum plaintext per record: a u16 length prefix minus the tag.
pub const MAX_RECORD_PAYLOAD: usize = u16::MAX as usize - TAG_SIZE;

/// One direction of a transport session: an AEAD key plus a monotone nonce.
///
/// The 12-byte nonce is four zero bytes followed by the big-endian counter;
/// a counter is never reused under the same key, so nonce exhaustion closes
/// the session.
pub struct CipherState {
    cipher: ChaCha20Poly1305,
    nonce: u64,
}

impl CipherState {
    pub fn new(mut key: [u8; 32]) -> Self {
        let cipher = ChaCha20Poly1305::new(Key::from_slice(&key));
        key.zeroize();
        Self { cipher, nonce: 0 }
    }

    /// The counter of the next record.
    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    /// Encrypts one record payload, consuming the next nonce.
    pub fn encrypt(&mut self, plaintext: &[u8]) -> Result<Vec<u8>, NoiseError> {
        if plaintext.len() > MAX_RECORD_PAYLOAD {
            return Err(NoiseError::RecordTooLarge {
                len: plaintext.len(),
                max: MAX_RECORD_PAYLOAD,
            });
        }
        let nonce = self.next_nonce()?;
        self.cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext)
            .map_err(|_| NoiseError::Decrypt)
    }

    /// Decrypts one record, consuming the next nonce. Fails on any mutation
    /// of the ciphertext.
    pub fn decrypt(&mut self, ciphertext: &[u8]) -> Result<Vec<u8>, NoiseError> {
        let nonce = self.next_nonce()?;
        self.cipher
            .decrypt(Nonce::from_slice(&nonce), ciphertext)
            .map_err(|_| NoiseError::Decrypt)
    }

    fn next_nonce(&mut self) -> Result<[u8; 12], NoiseError> {
        let counter = self.nonce;
        self.nonce = self.nonce.checked_add(1).ok_or(NoiseError::NonceExhausted)?;
        let mut nonce = [0u8; 12];
        nonce[4..].copy_from_slice(&counter.to_be_bytes());
        Ok(nonce)
    }
}

impl std::fmt::Debug for CipherState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CipherState").field("nonce", &self.nonce).finish_non_exhaustive()
    }
}
