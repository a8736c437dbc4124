use std::io::{Read, Write};
use std::sync::Mutex;

use crate::errors::NoiseError;
use crate::noise::cipher::{CipherState, MAX_RECORD_PAYLOAD};
use crate::noise::handshake::HandshakeOutput;

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

/// An established transport session over `io`.
///
/// Records are framed as a 2-byte big-endian ciphertext length followed by
/// the ciphertext. The cipher states live behind their own locks so nonces
/// advance atomically; the I/O lock is held for the duration of one record
/// read or write, and socket-level deadlines bound how long that can take.
#[derive(Debug)]
pub struct NoiseSession<T> {
    io: Mutex<T>,
    send: Mutex<CipherState>,
    recv: Mutex<CipherState>,
    remote_public_key: [u8; 32],
    handshake_hash: [u8; 32],
}

impl<T: Read + Write> NoiseSession<T> {
    pub fn new(io: T, handshake: HandshakeOutput) -> Self {
        Self {
            io: Mutex::new(io),
            send: Mutex::new(handshake.send),
            recv: Mutex::new(handshake.recv),
            remote_public_key: handshake.remote_public_key,
            handshake_hash: handshake.handshake_hash,
        }
    }

    /// Encrypts and writes one record. Payloads above
    /// [`MAX_RECORD_PAYLOAD`] are rejected before any nonce is consumed.
    pub fn write_message(&self, plaintext: &[u8]) -> Result<(), NoiseError> {
        if plaintext.len() > MAX_RECORD_PAYLOAD {
            return Err(NoiseError::RecordTooLarge {
                len: plaintext.len(),
                max: MAX_RECORD_PAYLOAD,
            });
        }
        let ciphertext = {
            let mut send = self.send.lock().expect("send cipher lock poisoned");
            send.encrypt(plaintext)?
        };
        let len = u16::try_from(ciphertext.len()).expect("record length bounded by payload check");

        let mut io = self.io.lock().expect("session io lock poisoned");
        io.write_all(&len.to_be_bytes())?;
        io.write_all(&ciphertext)?;
        io.flush()?;
        Ok(())
    }

    /// Reads and decrypts one record. A tampered length prefix either
    /// misframes (decrypt failure) or hits the socket deadline.
    pub fn read_message(&self) -> Result<Vec<u8>, NoiseError> {
        let ciphertext = {
            let mut io = self.io.lock().expect("session io lock poisoned");
            let mut header = [0u8; 2];
            io.read_exact(&mut header)?;
            let len = usize::from(u16::from_be_bytes(header));
            let mut ciphertext = vec![0u8; len];
            io.read_exact(&mut ciphertext)?;
            ciphertext
        };

        let mut recv = self.recv.lock().expect("recv cipher lock poisoned");
        recv.decrypt(&ciphertext)
    }

    /// The counter the next outbound record will use.
    pub fn send_nonce(&self) -> u64 {
        self.send.lock().expect("send cipher lock poisoned").nonce()
    }

    /// The counter the next inbound record must use.
    pub fn recv_nonce(&self) -> u64 {
        self.recv.lock().expect("recv cipher lock poisoned").nonce()
    }

    pub fn remote_public_key(&self) -> [u8; 32] {
        self.remote_public_key
    }

    pub fn handshake_hash(&self) -> [u8; 32] {
        self.handshake_hash
    }
}
