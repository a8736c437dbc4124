use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use tracing::debug;
use veris_time::Clock;
use veris_types::address::AccountAddress;
use veris_types::sensitive::SensitiveTxType;
use veris_types::transaction::MfaProofAttachment;

use crate::challenge::{ChallengeStore, MfaChallenge, DEFAULT_CHALLENGE_TTL, DEFAULT_MAX_ATTEMPTS};
use crate::errors::{MfaError, MfaResult};
use crate::factors::{FactorEnrollment, FactorType};

#[cfg(test)]
#[path = "adapter_test.rs"]
mod adapter_test;

/// Whether MFA applies to a `(signer, tx_type)` pair.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequirementDecision {
    pub required: bool,
    /// Factors still demanded under a step-down policy; empty means the full
    /// enrolled factor applies.
    pub reduced_factors: Vec<FactorType>,
}

/// Whether a trusted device lets a signer skip proof validation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BypassDecision {
    pub bypass: bool,
    pub reduced_factors: Vec<FactorType>,
}

/// The MFA surface consumed by the admission chain.
#[cfg_attr(any(feature = "testing", test), mockall::automock)]
pub trait MfaAdapter: Send + Sync {
    /// Whether MFA is required for `address` on `tx_type`.
    fn requires_mfa(&self, address: &AccountAddress, tx_type: SensitiveTxType)
        -> RequirementDecision;

    /// Whether `device_fingerprint` is trusted enough to bypass the proof.
    fn can_bypass(
        &self,
        address: &AccountAddress,
        tx_type: SensitiveTxType,
        device_fingerprint: &str,
    ) -> BypassDecision;

    /// Validates a proof attachment against the account's enrollments.
    fn validate_proof(
        &self,
        address: &AccountAddress,
        tx_type: SensitiveTxType,
        proof: &MfaProofAttachment,
    ) -> MfaResult<()>;

    /// Issues a challenge against the account's best active enrollment.
    fn create_challenge(
        &self,
        address: &AccountAddress,
        tx_type: SensitiveTxType,
    ) -> MfaResult<MfaChallenge>;

    /// Answers an outstanding challenge.
    fn verify_challenge(&self, challenge_id: &str, response: &[u8]) -> MfaResult<MfaChallenge>;
}

/// Policy knobs of the local adapter.
#[derive(Clone, Debug)]
pub struct MfaPolicy {
    /// Transaction categories that demand a second factor.
    pub required_tx_types: HashSet<SensitiveTxType>,
    /// Whether a trusted device may skip proof validation entirely.
    pub allow_trusted_device_bypass: bool,
    pub challenge_ttl: Duration,
    pub challenge_max_attempts: u32,
}

impl Default for MfaPolicy {
    fn default() -> Self {
        Self {
            required_tx_types: HashSet::from([
                SensitiveTxType::AccountRecovery,
                SensitiveTxType::KeyRotation,
            ]),
            allow_trusted_device_bypass: true,
            challenge_ttl: DEFAULT_CHALLENGE_TTL,
            challenge_max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

/// In-process MFA adapter backed by enrollment, trusted-device and challenge
/// tables.
pub struct LocalMfaAdapter {
    clock: Arc<dyn Clock>,
    policy: MfaPolicy,
    enrollments: RwLock<HashMap<AccountAddress, Vec<FactorEnrollment>>>,
    trusted_devices: RwLock<HashMap<AccountAddress, HashSet<String>>>,
    challenges: ChallengeStore,
}

impl LocalMfaAdapter {
    pub fn new(policy: MfaPolicy, clock: Arc<dyn Clock>) -> Self {
        let challenges =
            ChallengeStore::new(clock.clone(), policy.challenge_ttl, policy.challenge_max_attempts);
        Self {
            clock,
            policy,
            enrollments: RwLock::new(HashMap::new()),
            trusted_devices: RwLock::new(HashMap::new()),
            challenges,
        }
    }

    /// Records an enrollment for an account.
    pub fn enroll(&self, address: AccountAddress, enrollment: FactorEnrollment) {
        let mut enrollments = self.enrollments.write().expect("enrollment table lock poisoned");
        enrollments.entry(address).or_default().push(enrollment);
    }

    /// Marks a device fingerprint trusted for an account.
    pub fn trust_device(&self, address: AccountAddress, device_fingerprint: impl Into<String>) {
        let mut devices = self.trusted_devices.write().expect("trusted device lock poisoned");
        devices.entry(address).or_default().insert(device_fingerprint.into());
    }

    /// Drops expired challenges; called by background maintenance.
    pub fn prune_expired_challenges(&self) -> usize {
        self.challenges.prune_expired()
    }

    fn find_enrollment(
        &self,
        address: &AccountAddress,
        factor_id: &str,
    ) -> MfaResult<FactorEnrollment> {
        let enrollments = self.enrollments.read().expect("enrollment table lock poisoned");
        enrollments
            .get(address)
            .and_then(|factors| factors.iter().find(|f| f.factor_id == factor_id))
            .filter(|f| f.is_active())
            .cloned()
            .ok_or_else(|| MfaError::UnknownFactor {
                address: address.to_string(),
                factor_id: factor_id.to_owned(),
            })
    }

    /// The enrollment a new challenge should target: highest security level,
    /// then most recently verified, then most recently enrolled.
    fn best_active_enrollment(&self, address: &AccountAddress) -> Option<FactorEnrollment> {
        let enrollments = self.enrollments.read().expect("enrollment table lock poisoned");
        enrollments
            .get(address)?
            .iter()
            .filter(|f| f.is_active())
            .max_by_key(|f| (f.security_level, f.verified_at, f.enrolled_at))
            .cloned()
    }

    fn mark_verified(&self, address: &AccountAddress, factor_id: &str) {
        let unix_now = self.clock.unix_now();
        let mut enrollments = self.enrollments.write().expect("enrollment table lock poisoned");
        if let Some(factor) = enrollments
            .get_mut(address)
            .and_then(|factors| factors.iter_mut().find(|f| f.factor_id == factor_id))
        {
            factor.verified_at = Some(unix_now);
        }
    }
}

impl MfaAdapter for LocalMfaAdapter {
    fn requires_mfa(
        &self,
        address: &AccountAddress,
        tx_type: SensitiveTxType,
    ) -> RequirementDecision {
        if !self.policy.required_tx_types.contains(&tx_type) {
            return RequirementDecision::default();
        }
        // Accounts with no usable factor cannot be asked for one; enrollment
        // itself is gated elsewhere.
        let required = self.best_active_enrollment(address).is_some();
        RequirementDecision { required, reduced_factors: Vec::new() }
    }

    fn can_bypass(
        &self,
        address: &AccountAddress,
        tx_type: SensitiveTxType,
        device_fingerprint: &str,
    ) -> BypassDecision {
        if !self.policy.allow_trusted_device_bypass {
            return BypassDecision::default();
        }
        let devices = self.trusted_devices.read().expect("trusted device lock poisoned");
        let trusted = devices
            .get(address)
            .is_some_and(|fingerprints| fingerprints.contains(device_fingerprint));
        if trusted {
            debug!(%address, %tx_type, "trusted device bypasses MFA proof");
        }
        BypassDecision { bypass: trusted, reduced_factors: Vec::new() }
    }

    fn validate_proof(
        &self,
        address: &AccountAddress,
        _tx_type: SensitiveTxType,
        proof: &MfaProofAttachment,
    ) -> MfaResult<()> {
        let enrollment = self.find_enrollment(address, &proof.factor_id)?;

        match &proof.challenge_id {
            Some(challenge_id) => {
                self.challenges.attempt(challenge_id, |challenge| {
                    challenge.factor_id == proof.factor_id
                        && enrollment.verify_response(&proof.payload, self.clock.unix_now())
                })?;
            }
            None => {
                if !enrollment.verify_response(&proof.payload, self.clock.unix_now()) {
                    return Err(MfaError::ProofRejected { factor_id: proof.factor_id.clone() });
                }
            }
        }
        self.mark_verified(address, &proof.factor_id);
        Ok(())
    }

    fn create_challenge(
        &self,
        address: &AccountAddress,
        tx_type: SensitiveTxType,
    ) -> MfaResult<MfaChallenge> {
        let enrollment = self
            .best_active_enrollment(address)
            .ok_or_else(|| MfaError::NoActiveFactor { address: address.to_string() })?;
        Ok(self.challenges.create(
            address.clone(),
            enrollment.factor_type,
            enrollment.factor_id,
            tx_type.to_string(),
        ))
    }

    fn verify_challenge(&self, challenge_id: &str, response: &[u8]) -> MfaResult<MfaChallenge> {
        let unix_now = self.clock.unix_now();
        let consumed = self.challenges.attempt(challenge_id, |challenge| {
            self.find_enrollment(&challenge.address, &challenge.factor_id)
                .map(|enrollment| enrollment.verify_response(response, unix_now))
                .unwrap_or(false)
        })?;
        self.mark_verified(&consumed.address, &consumed.factor_id);
        Ok(consumed)
    }
}
