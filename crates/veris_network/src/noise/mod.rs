//! Noise-style NK encrypted transport.
//!
//! Two raw handshake messages (32 bytes out, 48 bytes back) derive two AEAD
//! cipher states; transport records are `[u16 length][ciphertext]` with a
//! monotone per-direction nonce. The responder's long-term public key is
//! known to the initiator a priori.

mod cipher;
mod handshake;
mod session;

pub use cipher::{CipherState, MAX_RECORD_PAYLOAD, TAG_SIZE};
pub use handshake::{initiate, respond, HandshakeOutput, StaticKeypair, PROTOCOL_NAME};
pub use session::NoiseSession;
