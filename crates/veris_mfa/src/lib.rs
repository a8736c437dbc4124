//! Multi-factor authentication for sensitive Veris transactions.
//!
//! The admission chain talks to [`MfaAdapter`]; [`LocalMfaAdapter`] is the
//! in-process implementation backed by enrollment and challenge tables.

mod adapter;
mod challenge;
mod errors;
mod factors;

pub use adapter::{BypassDecision, LocalMfaAdapter, MfaAdapter, MfaPolicy, RequirementDecision};
pub use challenge::{ChallengeStore, MfaChallenge, DEFAULT_CHALLENGE_TTL, DEFAULT_MAX_ATTEMPTS};
pub use errors::{MfaError, MfaResult};
pub use factors::{secret_digest, totp_code, FactorEnrollment, FactorStatus, FactorType};

#[cfg(any(feature = "testing", test))]
pub use adapter::MockMfaAdapter;
