//! The structural decorators around the three gates: basic validation,
//! timeout, memo, gas, fee, key binding, signature handling and sequence
//! bookkeeping.

use std::sync::Arc;

use veris_types::transaction::AdmissionTx;

use crate::chain::AdmissionDecorator;
use crate::context::AdmissionContext;
use crate::errors::{AdmissionError, AdmissionResult};
use crate::keepers::{AccountKeeper, SignatureVerifier};

#[cfg(test)]
#[path = "standard_decorators_test.rs"]
mod standard_decorators_test;

/// Rejects transactions with no messages.
pub struct BasicValidationDecorator;

impl AdmissionDecorator for BasicValidationDecorator {
    fn name(&self) -> &'static str {
        "basic_validation"
    }

    fn check(&self, _ctx: &mut AdmissionContext, tx: &dyn AdmissionTx) -> AdmissionResult<()> {
        if tx.messages().is_empty() {
            return Err(AdmissionError::EmptyTx);
        }
        Ok(())
    }
}

/// Rejects transactions whose timeout height already passed.
pub struct TimeoutHeightDecorator;

impl AdmissionDecorator for TimeoutHeightDecorator {
    fn name(&self) -> &'static str {
        "timeout_height"
    }

    fn check(&self, ctx: &mut AdmissionContext, tx: &dyn AdmissionTx) -> AdmissionResult<()> {
        let timeout_height = tx.timeout_height();
        if timeout_height != 0 && timeout_height < ctx.block_height {
            return Err(AdmissionError::TxExpired {
                timeout_height,
                block_height: ctx.block_height,
            });
        }
        Ok(())
    }
}

/// Caps memo length.
pub struct MemoDecorator {
    pub max_memo_chars: usize,
}

impl AdmissionDecorator for MemoDecorator {
    fn name(&self) -> &'static str {
        "memo_validation"
    }

    fn check(&self, _ctx: &mut AdmissionContext, tx: &dyn AdmissionTx) -> AdmissionResult<()> {
        let len = tx.memo().chars().count();
        if len > self.max_memo_chars {
            return Err(AdmissionError::MemoTooLong { len, max: self.max_memo_chars });
        }
        Ok(())
    }
}

/// Charges gas proportional to the encoded transaction size.
pub struct TxSizeGasDecorator {
    pub gas_per_byte: u64,
}

impl AdmissionDecorator for TxSizeGasDecorator {
    fn name(&self) -> &'static str {
        "tx_size_gas"
    }

    fn check(&self, ctx: &mut AdmissionContext, tx: &dyn AdmissionTx) -> AdmissionResult<()> {
        let size = u64::try_from(tx.size_bytes()).unwrap_or(u64::MAX);
        ctx.consume_gas(size.saturating_mul(self.gas_per_byte), "tx size")
    }
}

/// Checks the minimum fee and moves it out of the payer's balance.
pub struct FeeDeductionDecorator {
    pub keeper: Arc<dyn AccountKeeper>,
    pub min_fee: u128,
}

impl AdmissionDecorator for FeeDeductionDecorator {
    fn name(&self) -> &'static str {
        "fee_deduction"
    }

    fn check(&self, ctx: &mut AdmissionContext, tx: &dyn AdmissionTx) -> AdmissionResult<()> {
        let Some(signers) = tx.signers() else {
            return Ok(());
        };
        let Some(payer) = signers.first() else {
            return Ok(());
        };
        let fee = tx.fee();
        if fee < self.min_fee {
            return Err(AdmissionError::InsufficientFee {
                address: payer.clone(),
                offered: fee,
                required: self.min_fee,
            });
        }
        // Simulation estimates gas; it must not move funds.
        if fee > 0 && !ctx.simulate {
            self.keeper.deduct_fee(payer, fee)?;
        }
        Ok(())
    }
}

/// Binds supplied public keys to accounts that have none yet.
pub struct PublicKeyBindingDecorator {
    pub keeper: Arc<dyn AccountKeeper>,
}

impl AdmissionDecorator for PublicKeyBindingDecorator {
    fn name(&self) -> &'static str {
        "public_key_binding"
    }

    fn check(&self, ctx: &mut AdmissionContext, tx: &dyn AdmissionTx) -> AdmissionResult<()> {
        let Some(signers) = tx.signers() else {
            return Ok(());
        };
        if ctx.simulate {
            return Ok(());
        }
        let public_keys = tx.public_keys();
        for (signer, public_key) in signers.iter().zip(public_keys) {
            let record = self
                .keeper
                .account(signer)
                .ok_or_else(|| AdmissionError::UnknownAccount { address: signer.clone() })?;
            if record.public_key.is_none() {
                self.keeper.bind_public_key(signer, public_key)?;
            }
        }
        Ok(())
    }
}

/// Enforces the signature-count bounds.
pub struct SignatureCountDecorator {
    pub max_signatures: usize,
}

impl AdmissionDecorator for SignatureCountDecorator {
    fn name(&self) -> &'static str {
        "signature_count"
    }

    fn check(&self, _ctx: &mut AdmissionContext, tx: &dyn AdmissionTx) -> AdmissionResult<()> {
        let count = tx.signature_count();
        if count > self.max_signatures {
            return Err(AdmissionError::TooManySignatures { count, max: self.max_signatures });
        }
        if let Some(signers) = tx.signers() {
            if count != signers.len() {
                return Err(AdmissionError::WrongSignatureCount {
                    expected: signers.len(),
                    got: count,
                });
            }
        }
        Ok(())
    }
}

/// Charges gas per signature verification.
pub struct SignatureGasDecorator {
    pub gas_per_signature: u64,
}

impl AdmissionDecorator for SignatureGasDecorator {
    fn name(&self) -> &'static str {
        "signature_gas"
    }

    fn check(&self, ctx: &mut AdmissionContext, tx: &dyn AdmissionTx) -> AdmissionResult<()> {
        let count = u64::try_from(tx.signature_count()).unwrap_or(u64::MAX);
        ctx.consume_gas(count.saturating_mul(self.gas_per_signature), "signature verification")
    }
}

/// Verifies every signature against the signer's bound public key.
pub struct SignatureVerificationDecorator {
    pub keeper: Arc<dyn AccountKeeper>,
    pub verifier: Arc<dyn SignatureVerifier>,
}

impl AdmissionDecorator for SignatureVerificationDecorator {
    fn name(&self) -> &'static str {
        "signature_verification"
    }

    fn check(&self, ctx: &mut AdmissionContext, tx: &dyn AdmissionTx) -> AdmissionResult<()> {
        let Some(signers) = tx.signers() else {
            return Ok(());
        };
        if ctx.simulate {
            return Ok(());
        }
        for signer in signers {
            let record = self
                .keeper
                .account(&signer)
                .ok_or_else(|| AdmissionError::UnknownAccount { address: signer.clone() })?;
            let Some(public_key) = record.public_key else {
                return Err(AdmissionError::MissingPublicKey { address: signer });
            };
            if !self.verifier.verify(tx, &signer, &public_key) {
                return Err(AdmissionError::SignatureInvalid { address: signer });
            }
        }
        Ok(())
    }
}

/// Advances each signer's replay-protection sequence.
pub struct SequenceIncrementDecorator {
    pub keeper: Arc<dyn AccountKeeper>,
}

impl AdmissionDecorator for SequenceIncrementDecorator {
    fn name(&self) -> &'static str {
        "sequence_increment"
    }

    fn check(&self, ctx: &mut AdmissionContext, tx: &dyn AdmissionTx) -> AdmissionResult<()> {
        let Some(signers) = tx.signers() else {
            return Ok(());
        };
        if ctx.simulate {
            return Ok(());
        }
        for signer in signers {
            self.keeper.increment_sequence(&signer)?;
        }
        Ok(())
    }
}
