use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, IntoStaticStr};

#[cfg(test)]
#[path = "sensitive_test.rs"]
mod sensitive_test;

/// Type-URL prefix of governance messages; governance traffic bypasses
/// identity gating.
pub const GOVERNANCE_TYPE_URL_PREFIX: &str = "/veris.gov.";

/// The closed set of sensitive transaction categories.
///
/// The mapping from type URL to category is frozen; replicas must agree on it,
/// so new categories require a coordinated upgrade.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
    IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum SensitiveTxType {
    AccountRecovery,
    KeyRotation,
    ValidatorRegistration,
    HighValueOrder,
    FirstOfferingCreate,
}

impl SensitiveTxType {
    /// The stable type URL of the category's message.
    pub fn type_url(&self) -> &'static str {
        match self {
            SensitiveTxType::AccountRecovery => "/veris.veid.v1.MsgRecoverAccount",
            SensitiveTxType::KeyRotation => "/veris.veid.v1.MsgRotateKey",
            SensitiveTxType::ValidatorRegistration => "/veris.staking.v1.MsgRegisterValidator",
            SensitiveTxType::HighValueOrder => "/veris.market.v1.MsgCreateHighValueOrder",
            SensitiveTxType::FirstOfferingCreate => "/veris.market.v1.MsgCreateFirstOffering",
        }
    }

    /// Resolves a type URL to its category; `None` means non-sensitive.
    pub fn from_type_url(type_url: &str) -> Option<Self> {
        match type_url {
            "/veris.veid.v1.MsgRecoverAccount" => Some(SensitiveTxType::AccountRecovery),
            "/veris.veid.v1.MsgRotateKey" => Some(SensitiveTxType::KeyRotation),
            "/veris.staking.v1.MsgRegisterValidator" => Some(SensitiveTxType::ValidatorRegistration),
            "/veris.market.v1.MsgCreateHighValueOrder" => Some(SensitiveTxType::HighValueOrder),
            "/veris.market.v1.MsgCreateFirstOffering" => Some(SensitiveTxType::FirstOfferingCreate),
            _ => None,
        }
    }
}

/// Type URLs of identity-verification messages, counted against the global
/// per-block sensitive cap by the rate limiter.
pub const IDENTITY_VERIFICATION_TYPE_URLS: &[&str] = &[
    "/veris.veid.v1.MsgSubmitVerification",
    "/veris.veid.v1.MsgUpdateVerification",
    "/veris.veid.v1.MsgRecoverAccount",
    "/veris.veid.v1.MsgRotateKey",
];

/// Whether the given type URL belongs to the identity-verification set.
pub fn is_identity_verification_type_url(type_url: &str) -> bool {
    IDENTITY_VERIFICATION_TYPE_URLS.contains(&type_url)
}

/// Whether the given type URL is governance traffic.
pub fn is_governance_type_url(type_url: &str) -> bool {
    type_url.starts_with(GOVERNANCE_TYPE_URL_PREFIX)
}
