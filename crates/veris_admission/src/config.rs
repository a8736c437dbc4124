use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};
use veris_config::dumping::{prepend_sub_config_name, ser_param, SerializeConfig};
use veris_config::{ParamPath, SerializedParam};
use veris_types::address::AccountAddress;
use veris_types::identity::VeidTier;
use veris_types::sensitive::SensitiveTxType;

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

/// Parameters of the per-block rate limiter. Updatable at runtime through the
/// authority-gated params path; every update re-validates.
#[derive(Clone, Debug, Serialize, Deserialize, Validate, PartialEq, Eq)]
#[validate(schema(function = "validate_rate_limit_params"))]
pub struct RateLimitParams {
    pub enabled: bool,
    pub max_tx_per_block_per_account: u64,
    pub max_sensitive_tx_per_block_global: u64,
    pub max_total_tx_per_block: u64,
    pub exempt_addresses: HashSet<AccountAddress>,
}

impl Default for RateLimitParams {
    fn default() -> Self {
        Self {
            enabled: true,
            max_tx_per_block_per_account: 10,
            max_sensitive_tx_per_block_global: 100,
            max_total_tx_per_block: 5000,
            exempt_addresses: HashSet::new(),
        }
    }
}

impl RateLimitParams {
    pub fn is_exempt(&self, address: &AccountAddress) -> bool {
        self.exempt_addresses.contains(address)
    }
}

fn validate_rate_limit_params(params: &RateLimitParams) -> Result<(), ValidationError> {
    if !params.enabled {
        return Ok(());
    }
    if params.max_tx_per_block_per_account == 0
        || params.max_sensitive_tx_per_block_global == 0
        || params.max_total_tx_per_block == 0
    {
        return Err(ValidationError::new("rate limit caps must be positive when enabled"));
    }
    for address in &params.exempt_addresses {
        if address.validate().is_err() {
            return Err(ValidationError::new("exempt address is malformed"));
        }
    }
    Ok(())
}

impl SerializeConfig for RateLimitParams {
    fn dump(&self) -> BTreeMap<ParamPath, SerializedParam> {
        BTreeMap::from_iter([
            ser_param("enabled", &self.enabled, "If false, no per-block limits are enforced."),
            ser_param(
                "max_tx_per_block_per_account",
                &self.max_tx_per_block_per_account,
                "Per-signer transaction cap within one block.",
            ),
            ser_param(
                "max_sensitive_tx_per_block_global",
                &self.max_sensitive_tx_per_block_global,
                "Global cap on identity-verification transactions within one block.",
            ),
            ser_param(
                "max_total_tx_per_block",
                &self.max_total_tx_per_block,
                "Global transaction cap within one block.",
            ),
            ser_param(
                "exempt_addresses",
                &self.exempt_addresses,
                "Accounts whose transactions never consume per-account quota.",
            ),
        ])
    }
}

/// The gating policy of one sensitive transaction category.
#[derive(Clone, Debug, Serialize, Deserialize, Validate, PartialEq, Eq)]
pub struct SensitiveTxPolicy {
    pub enabled: bool,
    #[validate(range(max = 100))]
    pub min_identity_score: u32,
    /// Human-readable description, embedded in rejection messages.
    pub description: String,
    pub requires_governance_role: bool,
}

impl SensitiveTxPolicy {
    /// The tier a signer must hold, derived from the score threshold.
    pub fn min_tier(&self) -> VeidTier {
        VeidTier::for_score(self.min_identity_score)
    }

    /// Whether the policy gates nothing.
    pub fn is_trivial(&self) -> bool {
        !self.enabled || (self.min_identity_score == 0 && !self.requires_governance_role)
    }
}

/// The policy table over the closed sensitive-category set.
pub type SensitiveTxPolicies = BTreeMap<SensitiveTxType, SensitiveTxPolicy>;

/// The default policy table shipped in genesis.
pub fn default_sensitive_tx_policies() -> SensitiveTxPolicies {
    BTreeMap::from([
        (
            SensitiveTxType::AccountRecovery,
            SensitiveTxPolicy {
                enabled: true,
                min_identity_score: 60,
                description: "account recovery".to_owned(),
                requires_governance_role: false,
            },
        ),
        (
            SensitiveTxType::KeyRotation,
            SensitiveTxPolicy {
                enabled: true,
                min_identity_score: 60,
                description: "key rotation".to_owned(),
                requires_governance_role: false,
            },
        ),
        (
            SensitiveTxType::ValidatorRegistration,
            SensitiveTxPolicy {
                enabled: true,
                min_identity_score: 80,
                description: "validator registration".to_owned(),
                requires_governance_role: true,
            },
        ),
        (
            SensitiveTxType::HighValueOrder,
            SensitiveTxPolicy {
                enabled: true,
                min_identity_score: 30,
                description: "high-value order".to_owned(),
                requires_governance_role: false,
            },
        ),
        (
            SensitiveTxType::FirstOfferingCreate,
            SensitiveTxPolicy {
                enabled: true,
                min_identity_score: 40,
                description: "first offering creation".to_owned(),
                requires_governance_role: false,
            },
        ),
    ])
}

/// Configuration of the whole admission chain.
#[derive(Clone, Debug, Serialize, Deserialize, Validate, PartialEq, Eq)]
pub struct AdmissionConfig {
    #[validate(nested)]
    pub rate_limit: RateLimitParams,
    pub sensitive_tx_policies: SensitiveTxPolicies,
    /// Governance authority address, exempt from identity gating. Empty
    /// disables the exemption.
    pub governance_authority: String,
    pub max_memo_chars: usize,
    pub gas_per_byte: u64,
    pub gas_per_signature: u64,
    pub max_signatures: usize,
    pub min_fee: u128,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            rate_limit: RateLimitParams::default(),
            sensitive_tx_policies: default_sensitive_tx_policies(),
            governance_authority: String::new(),
            max_memo_chars: 256,
            gas_per_byte: 10,
            gas_per_signature: 1000,
            max_signatures: 7,
            min_fee: 0,
        }
    }
}

impl AdmissionConfig {
    /// The governance authority, unless the exemption is disabled.
    pub fn governance_authority_address(&self) -> Option<AccountAddress> {
        if self.governance_authority.is_empty() {
            None
        } else {
            Some(AccountAddress::new(self.governance_authority.clone()))
        }
    }
}

impl SerializeConfig for AdmissionConfig {
    fn dump(&self) -> BTreeMap<ParamPath, SerializedParam> {
        let mut dump = BTreeMap::from_iter([
            ser_param(
                "governance_authority",
                &self.governance_authority,
                "Governance authority address; empty disables the identity-gate exemption.",
            ),
            ser_param("max_memo_chars", &self.max_memo_chars, "Maximum memo length."),
            ser_param("gas_per_byte", &self.gas_per_byte, "Gas charged per encoded tx byte."),
            ser_param(
                "gas_per_signature",
                &self.gas_per_signature,
                "Gas charged per signature verification.",
            ),
            ser_param("max_signatures", &self.max_signatures, "Maximum signatures per tx."),
            ser_param("min_fee", &self.min_fee, "Minimum fee per transaction, in base units."),
        ]);
        dump.extend(prepend_sub_config_name(self.rate_limit.dump(), "rate_limit"));
        for (tx_type, policy) in &self.sensitive_tx_policies {
            dump.extend(prepend_sub_config_name(
                BTreeMap::from_iter([
                    ser_param("enabled", &policy.enabled, "Whether the category is gated."),
                    ser_param(
                        "min_identity_score",
                        &policy.min_identity_score,
                        "Minimum VEID score of every signer.",
                    ),
                    ser_param(
                        "requires_governance_role",
                        &policy.requires_governance_role,
                        "Whether signers need the validator governance role.",
                    ),
                ]),
                &format!("sensitive_tx_policies.{tx_type}"),
            ));
        }
        dump
    }
}
