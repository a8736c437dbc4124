use thiserror::Error;
use veris_mfa::MfaError;
use veris_types::address::AccountAddress;
use veris_types::identity::{VeidStatus, VeidTier};

#[cfg(test)]
#[path = "errors_test.rs"]
mod errors_test;

/// Codespace of the rate-limit module.
pub const RATE_LIMIT_CODESPACE: &str = "ratelimit";
/// Codespace of the identity-gate module.
pub const VEID_CODESPACE: &str = "veid";

/// Rejections produced by the per-block rate limiter.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RateLimitError {
    #[error(
        "account {account} has submitted {count} transactions in block {block_height}; limit is \
         {limit} per account per block"
    )]
    AccountRateLimited { account: AccountAddress, count: u64, limit: u64, block_height: u64 },
    #[error(
        "block {block_height} has admitted {count} identity-verification transactions; limit is \
         {limit} per block"
    )]
    SensitiveRateLimited { count: u64, limit: u64, block_height: u64 },
    #[error("block {block_height} has admitted {count} transactions; limit is {limit} per block")]
    BlockRateLimited { count: u64, limit: u64, block_height: u64 },
    #[error("invalid rate limit parameters: {reason}")]
    InvalidParams { reason: String },
}

impl RateLimitError {
    /// Stable `(codespace, code)` identifier of the error.
    pub fn code(&self) -> (&'static str, u32) {
        match self {
            RateLimitError::AccountRateLimited { .. } => (RATE_LIMIT_CODESPACE, 2),
            RateLimitError::SensitiveRateLimited { .. } => (RATE_LIMIT_CODESPACE, 3),
            RateLimitError::BlockRateLimited { .. } => (RATE_LIMIT_CODESPACE, 4),
            RateLimitError::InvalidParams { .. } => (RATE_LIMIT_CODESPACE, 5),
        }
    }
}

/// Rejections produced by the identity gate.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentityGateError {
    #[error("unauthorized: VEID score {score} below required {required} for {description}")]
    ScoreTooLow { score: u32, required: u32, status: VeidStatus, description: String },
    #[error("unauthorized: VEID tier {tier} below required {required_tier} for {description}")]
    TierTooLow { tier: VeidTier, required_tier: VeidTier, description: String },
    #[error("unauthorized: account {account} lacks the validator governance role")]
    GovernanceRoleMissing { account: AccountAddress },
}

impl IdentityGateError {
    /// Stable `(codespace, code)` identifier of the error. All identity-gate
    /// rejections share the module's `Unauthorized` code.
    pub fn code(&self) -> (&'static str, u32) {
        (VEID_CODESPACE, 2)
    }
}

/// Rejections produced by the MFA gate.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MfaGateError {
    #[error("second factor proof required for {tx_type}")]
    MfaRequired { tx_type: String },
    #[error("unauthorized: {tx_type} message carries no signer")]
    MissingSigner { tx_type: String },
    #[error(transparent)]
    Adapter(#[from] MfaError),
}

impl MfaGateError {
    /// Stable `(codespace, code)` identifier of the error.
    pub fn code(&self) -> (&'static str, u32) {
        match self {
            MfaGateError::MfaRequired { .. } => ("mfa", 2),
            MfaGateError::MissingSigner { .. } => ("mfa", 3),
            MfaGateError::Adapter(err) => err.code(),
        }
    }
}

/// Any rejection the admission chain can produce. Wrapping preserves the
/// originating module error, so callers can match on the sentinel.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AdmissionError {
    #[error(transparent)]
    RateLimit(#[from] RateLimitError),
    #[error(transparent)]
    Identity(#[from] IdentityGateError),
    #[error(transparent)]
    Mfa(#[from] MfaGateError),
    #[error("transaction contains no messages")]
    EmptyTx,
    #[error("memo length {len} exceeds maximum {max}")]
    MemoTooLong { len: usize, max: usize },
    #[error("transaction timed out: timeout height {timeout_height} below current {block_height}")]
    TxExpired { timeout_height: u64, block_height: u64 },
    #[error("out of gas during {operation}: used {used}, limit {limit}")]
    OutOfGas { operation: String, used: u64, limit: u64 },
    #[error("unknown account {address}")]
    UnknownAccount { address: AccountAddress },
    #[error("insufficient fee: account {address} offers {offered}, requires {required}")]
    InsufficientFee { address: AccountAddress, offered: u128, required: u128 },
    #[error("insufficient funds: account {address} holds {balance}, fee is {fee}")]
    InsufficientFunds { address: AccountAddress, balance: u128, fee: u128 },
    #[error("signature count {count} exceeds maximum {max}")]
    TooManySignatures { count: usize, max: usize },
    #[error("expected {expected} signatures, transaction carries {got}")]
    WrongSignatureCount { expected: usize, got: usize },
    #[error("account {address} has no bound public key")]
    MissingPublicKey { address: AccountAddress },
    #[error("signature verification failed for account {address}")]
    SignatureInvalid { address: AccountAddress },
}

pub type AdmissionResult<T> = Result<T, AdmissionError>;
