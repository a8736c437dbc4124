use thiserror::Error;

/// The `mfa` codespace.
pub const MFA_CODESPACE: &str = "mfa";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MfaError {
    #[error("account '{address}' has no active factor enrollment")]
    NoActiveFactor { address: String },
    #[error("challenge '{challenge_id}' not found")]
    ChallengeNotFound { challenge_id: String },
    #[error("challenge '{challenge_id}' expired")]
    ChallengeExpired { challenge_id: String },
    #[error("challenge '{challenge_id}' exhausted its {max_attempts} attempts")]
    TooManyAttempts { challenge_id: String, max_attempts: u32 },
    #[error("factor '{factor_id}' rejected the supplied proof")]
    ProofRejected { factor_id: String },
    #[error("factor '{factor_id}' is not enrolled for account '{address}'")]
    UnknownFactor { address: String, factor_id: String },
}

impl MfaError {
    /// Stable `(codespace, code)` identifier of the error.
    pub fn code(&self) -> (&'static str, u32) {
        match self {
            MfaError::NoActiveFactor { .. } => (MFA_CODESPACE, 2),
            MfaError::ProofRejected { .. } | MfaError::UnknownFactor { .. } => (MFA_CODESPACE, 3),
            MfaError::ChallengeExpired { .. } | MfaError::ChallengeNotFound { .. } => {
                (MFA_CODESPACE, 4)
            }
            MfaError::TooManyAttempts { .. } => (MFA_CODESPACE, 5),
        }
    }
}

pub type MfaResult<T> = Result<T, MfaError>;
