use std::sync::Arc;

use tracing::debug;
use veris_mfa::MfaAdapter;
use veris_types::sensitive::SensitiveTxType;
use veris_types::transaction::{AdmissionTx, TxMessage};

use crate::chain::AdmissionDecorator;
use crate::context::AdmissionContext;
use crate::errors::{AdmissionResult, MfaGateError};
use crate::metrics::ADMISSION_TXS_MFA_REJECTED;

#[cfg(test)]
#[path = "mfa_decorator_test.rs"]
mod mfa_decorator_test;

/// Message categories that demand a second factor.
const MFA_GATED_TX_TYPES: &[SensitiveTxType] =
    &[SensitiveTxType::AccountRecovery, SensitiveTxType::KeyRotation];

/// Demands a second-factor proof (or trusted-device bypass) on account
/// recovery and key rotation.
pub struct MfaGateDecorator {
    adapter: Arc<dyn MfaAdapter>,
}

impl MfaGateDecorator {
    pub fn new(adapter: Arc<dyn MfaAdapter>) -> Self {
        Self { adapter }
    }

    fn check_message(&self, message: &dyn TxMessage) -> Result<(), MfaGateError> {
        let Some(tx_type) = SensitiveTxType::from_type_url(message.type_url()) else {
            return Ok(());
        };
        if !MFA_GATED_TX_TYPES.contains(&tx_type) {
            return Ok(());
        }

        let signers = message.signers();
        let Some(signer) = signers.first() else {
            return Err(MfaGateError::MissingSigner { tx_type: tx_type.to_string() });
        };

        let requirement = self.adapter.requires_mfa(signer, tx_type);
        if !requirement.required {
            return Ok(());
        }

        let Some(proof) = message.mfa_proof() else {
            return Err(MfaGateError::MfaRequired { tx_type: tx_type.to_string() });
        };

        let bypass = self.adapter.can_bypass(signer, tx_type, &proof.device_fingerprint);
        if bypass.bypass && bypass.reduced_factors.is_empty() {
            debug!(%signer, %tx_type, "trusted device bypass; skipping proof validation");
            return Ok(());
        }

        self.adapter.validate_proof(signer, tx_type, proof)?;
        Ok(())
    }
}

impl AdmissionDecorator for MfaGateDecorator {
    fn name(&self) -> &'static str {
        "mfa_gate"
    }

    fn check(&self, _ctx: &mut AdmissionContext, tx: &dyn AdmissionTx) -> AdmissionResult<()> {
        for message in tx.messages() {
            self.check_message(message.as_ref()).inspect_err(|_| {
                ADMISSION_TXS_MFA_REJECTED.increment(1);
            })?;
        }
        Ok(())
    }
}
