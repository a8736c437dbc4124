use std::sync::Arc;

use tracing::debug;
use veris_types::address::AccountAddress;
use veris_types::events::{Event, EVENT_VALIDATOR_IDENTITY_VERIFIED};
use veris_types::identity::{GovernanceRole, IdentityReader, RoleReader, ScoreRecord, VeidTier};
use veris_types::sensitive::{is_governance_type_url, SensitiveTxType};
use veris_types::transaction::{AdmissionTx, TxMessage};

use crate::chain::AdmissionDecorator;
use crate::config::{SensitiveTxPolicies, SensitiveTxPolicy};
use crate::context::AdmissionContext;
use crate::errors::{AdmissionResult, IdentityGateError};
use crate::metrics::ADMISSION_TXS_IDENTITY_REJECTED;

#[cfg(test)]
#[path = "identity_decorator_test.rs"]
mod identity_decorator_test;

/// Gates sensitive message types on the signer's VEID tier and score.
///
/// Governance proposals and the governance authority itself bypass the gate.
/// Validator-registration traffic additionally emits an audit event on
/// admission.
pub struct IdentityGateDecorator {
    identity: Arc<dyn IdentityReader>,
    roles: Arc<dyn RoleReader>,
    policies: SensitiveTxPolicies,
    governance_authority: Option<AccountAddress>,
}

impl IdentityGateDecorator {
    pub fn new(
        identity: Arc<dyn IdentityReader>,
        roles: Arc<dyn RoleReader>,
        policies: SensitiveTxPolicies,
        governance_authority: Option<AccountAddress>,
    ) -> Self {
        Self { identity, roles, policies, governance_authority }
    }

    fn check_message(
        &self,
        ctx: &mut AdmissionContext,
        message: &dyn TxMessage,
    ) -> Result<(), IdentityGateError> {
        let type_url = message.type_url();
        // Governance proposals carry their own authorization path.
        if is_governance_type_url(type_url) {
            return Ok(());
        }

        let Some(tx_type) = SensitiveTxType::from_type_url(type_url) else {
            return Ok(());
        };
        let Some(policy) = self.policies.get(&tx_type) else {
            return Ok(());
        };
        if policy.is_trivial() {
            return Ok(());
        }

        for signer in message.signers() {
            if self.governance_authority.as_ref() == Some(&signer) {
                debug!(%signer, "governance authority bypasses identity gating");
                continue;
            }
            self.check_signer(ctx, &signer, tx_type, policy)?;
        }
        Ok(())
    }

    fn check_signer(
        &self,
        ctx: &mut AdmissionContext,
        signer: &AccountAddress,
        tx_type: SensitiveTxType,
        policy: &SensitiveTxPolicy,
    ) -> Result<(), IdentityGateError> {
        // Missing identity records read as unverified with score zero.
        let tier = self.identity.tier(signer);
        let record = self.identity.score(signer).unwrap_or_else(ScoreRecord::default);

        if record.score < policy.min_identity_score {
            return Err(IdentityGateError::ScoreTooLow {
                score: record.score,
                required: policy.min_identity_score,
                status: record.status,
                description: policy.description.clone(),
            });
        }
        let min_tier = policy.min_tier();
        if tier < min_tier {
            return Err(IdentityGateError::TierTooLow {
                tier,
                required_tier: min_tier,
                description: policy.description.clone(),
            });
        }

        if policy.requires_governance_role
            && !self.roles.has_role(signer, GovernanceRole::Validator)
        {
            return Err(IdentityGateError::GovernanceRoleMissing { account: signer.clone() });
        }

        if tx_type == SensitiveTxType::ValidatorRegistration {
            ctx.emit(
                Event::new(EVENT_VALIDATOR_IDENTITY_VERIFIED)
                    .attribute("address", signer.to_string())
                    .attribute("score", record.score.to_string())
                    .attribute("status", record.status.to_string())
                    .attribute("required_score", policy.min_identity_score.to_string())
                    .attribute(
                        "governance_approved",
                        policy.requires_governance_role.to_string(),
                    ),
            );
        }
        Ok(())
    }
}

impl AdmissionDecorator for IdentityGateDecorator {
    fn name(&self) -> &'static str {
        "identity_gate"
    }

    fn check(&self, ctx: &mut AdmissionContext, tx: &dyn AdmissionTx) -> AdmissionResult<()> {
        for message in tx.messages() {
            self.check_message(ctx, message.as_ref()).inspect_err(|_| {
                ADMISSION_TXS_IDENTITY_REJECTED.increment(1);
            })?;
        }
        Ok(())
    }
}
