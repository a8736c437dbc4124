use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::address::AccountAddress;

#[cfg(test)]
#[path = "transaction_test.rs"]
mod transaction_test;

/// An MFA second-factor proof attached to a sensitive message.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MfaProofAttachment {
    /// Fingerprint of the device that produced the proof.
    pub device_fingerprint: String,
    /// Identifier of the factor that produced the proof.
    pub factor_id: String,
    /// Identifier of the challenge being answered, when one was issued.
    pub challenge_id: Option<String>,
    /// The proof payload (TOTP code, WebAuthn assertion, backup code).
    pub payload: Vec<u8>,
}

/// A single message inside a transaction, as seen by the admission chain.
///
/// The chain never interprets message bodies; it only needs the stable type
/// URL, the signer set, and (for the MFA gate) an optional proof attachment.
pub trait TxMessage: Send + Sync {
    /// The stable type URL of the message, e.g. `/veris.veid.v1.MsgRotateKey`.
    fn type_url(&self) -> &str;

    /// Accounts whose signatures authorize this message.
    fn signers(&self) -> Vec<AccountAddress>;

    /// The second-factor proof carried by the message, when the message type
    /// supports one.
    fn mfa_proof(&self) -> Option<&MfaProofAttachment> {
        None
    }
}

/// A candidate transaction traversing the admission chain.
pub trait AdmissionTx: Send + Sync {
    /// The messages of the transaction, in order.
    fn messages(&self) -> Vec<Arc<dyn TxMessage>>;

    /// The transaction-level signer set, or `None` when the transaction does
    /// not implement the signable capability.
    fn signers(&self) -> Option<Vec<AccountAddress>>;

    /// The free-form memo.
    fn memo(&self) -> &str {
        ""
    }

    /// Encoded transaction size in bytes, used for gas accounting.
    fn size_bytes(&self) -> usize;

    /// Height after which the transaction is invalid; 0 means no timeout.
    fn timeout_height(&self) -> u64 {
        0
    }

    /// Number of signatures attached to the transaction.
    fn signature_count(&self) -> usize;

    /// The fee offered by the transaction, in base units.
    fn fee(&self) -> u128 {
        0
    }

    /// Public keys attached alongside the signatures, one per tx-level
    /// signer. Empty when the transaction carries none.
    fn public_keys(&self) -> Vec<Vec<u8>> {
        Vec::new()
    }
}

/// A plain message used by tests and by modules without a generated schema.
#[derive(Clone, Debug)]
pub struct RawMessage {
    pub type_url: String,
    pub signers: Vec<AccountAddress>,
    pub mfa_proof: Option<MfaProofAttachment>,
}

impl RawMessage {
    pub fn new(type_url: impl Into<String>, signers: Vec<AccountAddress>) -> Self {
        Self { type_url: type_url.into(), signers, mfa_proof: None }
    }

    pub fn with_mfa_proof(mut self, proof: MfaProofAttachment) -> Self {
        self.mfa_proof = Some(proof);
        self
    }
}

impl TxMessage for RawMessage {
    fn type_url(&self) -> &str {
        &self.type_url
    }

    fn signers(&self) -> Vec<AccountAddress> {
        self.signers.clone()
    }

    fn mfa_proof(&self) -> Option<&MfaProofAttachment> {
        self.mfa_proof.as_ref()
    }
}

/// The standard signable transaction envelope.
#[derive(Clone)]
pub struct StdTx {
    messages: Vec<Arc<dyn TxMessage>>,
    memo: String,
    size_bytes: usize,
    timeout_height: u64,
    signature_count: usize,
    fee: u128,
    public_keys: Vec<Vec<u8>>,
}

impl StdTx {
    pub fn new(messages: Vec<Arc<dyn TxMessage>>) -> Self {
        let signature_count = Self::collect_signers(&messages).len();
        Self {
            messages,
            memo: String::new(),
            size_bytes: 256,
            timeout_height: 0,
            signature_count,
            fee: 0,
            public_keys: Vec::new(),
        }
    }

    pub fn with_memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = memo.into();
        self
    }

    pub fn with_size_bytes(mut self, size_bytes: usize) -> Self {
        self.size_bytes = size_bytes;
        self
    }

    pub fn with_timeout_height(mut self, timeout_height: u64) -> Self {
        self.timeout_height = timeout_height;
        self
    }

    pub fn with_fee(mut self, fee: u128) -> Self {
        self.fee = fee;
        self
    }

    pub fn with_public_keys(mut self, public_keys: Vec<Vec<u8>>) -> Self {
        self.public_keys = public_keys;
        self
    }

    fn collect_signers(messages: &[Arc<dyn TxMessage>]) -> Vec<AccountAddress> {
        let mut signers: Vec<AccountAddress> = Vec::new();
        for message in messages {
            for signer in message.signers() {
                if !signers.contains(&signer) {
                    signers.push(signer);
                }
            }
        }
        signers
    }
}

impl fmt::Debug for StdTx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StdTx")
            .field("type_urls", &self.messages.iter().map(|m| m.type_url().to_owned()).collect::<Vec<_>>())
            .field("memo", &self.memo)
            .field("size_bytes", &self.size_bytes)
            .finish()
    }
}

impl AdmissionTx for StdTx {
    fn messages(&self) -> Vec<Arc<dyn TxMessage>> {
        self.messages.clone()
    }

    fn signers(&self) -> Option<Vec<AccountAddress>> {
        Some(Self::collect_signers(&self.messages))
    }

    fn memo(&self) -> &str {
        &self.memo
    }

    fn size_bytes(&self) -> usize {
        self.size_bytes
    }

    fn timeout_height(&self) -> u64 {
        self.timeout_height
    }

    fn signature_count(&self) -> usize {
        self.signature_count
    }

    fn fee(&self) -> u128 {
        self.fee
    }

    fn public_keys(&self) -> Vec<Vec<u8>> {
        self.public_keys.clone()
    }
}

/// A transaction without the signable capability; the rate limiter forwards
/// these without counting.
#[derive(Clone)]
pub struct UnsignedTx {
    messages: Vec<Arc<dyn TxMessage>>,
    size_bytes: usize,
}

impl UnsignedTx {
    pub fn new(messages: Vec<Arc<dyn TxMessage>>) -> Self {
        Self { messages, size_bytes: 128 }
    }
}

impl AdmissionTx for UnsignedTx {
    fn messages(&self) -> Vec<Arc<dyn TxMessage>> {
        self.messages.clone()
    }

    fn signers(&self) -> Option<Vec<AccountAddress>> {
        None
    }

    fn size_bytes(&self) -> usize {
        self.size_bytes
    }

    fn signature_count(&self) -> usize {
        0
    }
}
