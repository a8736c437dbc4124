use serde::{Deserialize, Serialize};
use strum::{Display, IntoStaticStr};

use crate::address::AccountAddress;

#[cfg(test)]
#[path = "identity_test.rs"]
mod identity_test;

/// Maximum attainable VEID score.
pub const MAX_VEID_SCORE: u32 = 100;

/// Ordinal identity level, a monotone function of the numeric score.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum VeidTier {
    #[default]
    Unverified,
    Basic,
    Standard,
    Verified,
    Trusted,
    Premium,
}

impl VeidTier {
    /// Tier thresholds. Fixed; the tier table is part of consensus.
    pub fn for_score(score: u32) -> Self {
        match score {
            0..=19 => VeidTier::Unverified,
            20..=39 => VeidTier::Basic,
            40..=59 => VeidTier::Standard,
            60..=79 => VeidTier::Verified,
            80..=94 => VeidTier::Trusted,
            _ => VeidTier::Premium,
        }
    }
}

/// Lifecycle status of a VEID verification.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum VeidStatus {
    #[default]
    Unknown,
    Pending,
    Verified,
    Rejected,
    Expired,
}

/// The score view returned by the identity module for one account.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub score: u32,
    pub status: VeidStatus,
}

/// A verification scope granted to an account (e.g. a KYC provider
/// attestation), keyed by scope type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationScope {
    pub scope_type: String,
    pub provider: String,
    pub granted_at: u64,
}

/// Governance-granted roles checked by the identity gate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[strum(serialize_all = "snake_case")]
pub enum GovernanceRole {
    Validator,
    Auditor,
}

/// Read-only view of the VEID identity module.
#[cfg_attr(any(feature = "testing", test), mockall::automock)]
pub trait IdentityReader: Send + Sync {
    /// The tier of `address`; unknown accounts are `Unverified`.
    fn tier(&self, address: &AccountAddress) -> VeidTier;

    /// The score record of `address`; `None` when no record exists.
    fn score(&self, address: &AccountAddress) -> Option<ScoreRecord>;

    /// Whether the score of `address` is at least `threshold`.
    fn score_above(&self, address: &AccountAddress, threshold: u32) -> bool {
        self.score(address).is_some_and(|record| record.score >= threshold)
    }

    /// Verification scopes of `address` with the given scope type.
    fn scopes_by_type(&self, address: &AccountAddress, scope_type: &str) -> Vec<VerificationScope>;
}

/// Read-only view of governance role grants.
#[cfg_attr(any(feature = "testing", test), mockall::automock)]
pub trait RoleReader: Send + Sync {
    fn has_role(&self, address: &AccountAddress, role: GovernanceRole) -> bool;
}
