use std::sync::Arc;

use tracing::{debug, instrument};
use veris_mfa::MfaAdapter;
use veris_types::identity::{IdentityReader, RoleReader};
use veris_types::transaction::AdmissionTx;

use crate::config::AdmissionConfig;
use crate::context::AdmissionContext;
use crate::counter_store::TransientCounterStore;
use crate::errors::AdmissionResult;
use crate::identity_decorator::IdentityGateDecorator;
use crate::keepers::{AccountKeeper, SignatureVerifier};
use crate::metrics::{register_metrics, ADMISSION_TXS_ADMITTED, ADMISSION_TXS_RECEIVED};
use crate::mfa_decorator::MfaGateDecorator;
use crate::rate_limit_decorator::RateLimitDecorator;
use crate::standard_decorators::{
    BasicValidationDecorator,
    FeeDeductionDecorator,
    MemoDecorator,
    PublicKeyBindingDecorator,
    SequenceIncrementDecorator,
    SignatureCountDecorator,
    SignatureGasDecorator,
    SignatureVerificationDecorator,
    TimeoutHeightDecorator,
    TxSizeGasDecorator,
};

#[cfg(test)]
#[path = "chain_test.rs"]
mod chain_test;

/// One stage of the admission chain.
///
/// A decorator either returns `Ok(())`, letting the transaction continue, or
/// the typed error that rejects it. Decorators must not mutate anything
/// beyond the context and their own transient accounting.
pub trait AdmissionDecorator: Send + Sync {
    fn name(&self) -> &'static str;

    fn check(&self, ctx: &mut AdmissionContext, tx: &dyn AdmissionTx) -> AdmissionResult<()>;
}

/// Applies the configured per-transaction gas ceiling before anything runs.
pub struct ContextSetupDecorator {
    pub gas_limit: Option<u64>,
}

impl AdmissionDecorator for ContextSetupDecorator {
    fn name(&self) -> &'static str {
        "context_setup"
    }

    fn check(&self, ctx: &mut AdmissionContext, _tx: &dyn AdmissionTx) -> AdmissionResult<()> {
        if let Some(gas_limit) = self.gas_limit {
            ctx.set_gas_limit(gas_limit);
        }
        Ok(())
    }
}

/// The fixed, ordered decorator sequence every transaction traverses.
pub struct AdmissionChain {
    decorators: Vec<Box<dyn AdmissionDecorator>>,
}

impl AdmissionChain {
    pub fn new(decorators: Vec<Box<dyn AdmissionDecorator>>) -> Self {
        register_metrics();
        Self { decorators }
    }

    /// Runs the transaction through every stage in order, stopping at the
    /// first rejection.
    #[instrument(skip_all, fields(height = ctx.block_height, simulate = ctx.simulate))]
    pub fn admit(&self, ctx: &mut AdmissionContext, tx: &dyn AdmissionTx) -> AdmissionResult<()> {
        ADMISSION_TXS_RECEIVED.increment(1);
        for decorator in &self.decorators {
            decorator.check(ctx, tx).inspect_err(|err| {
                debug!(stage = decorator.name(), %err, "admission rejected");
            })?;
        }
        ADMISSION_TXS_ADMITTED.increment(1);
        Ok(())
    }

    /// The stage names, in execution order.
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.decorators.iter().map(|decorator| decorator.name()).collect()
    }
}

/// External collaborators of the standard chain.
pub struct AdmissionDeps {
    pub counter_store: Arc<TransientCounterStore>,
    pub identity: Arc<dyn IdentityReader>,
    pub roles: Arc<dyn RoleReader>,
    pub mfa: Arc<dyn MfaAdapter>,
    pub accounts: Arc<dyn AccountKeeper>,
    pub signatures: Arc<dyn SignatureVerifier>,
}

/// Builds the production decorator sequence. The order is part of the
/// protocol; changing it changes which rejection a transaction receives.
pub fn standard_chain(config: &AdmissionConfig, deps: AdmissionDeps) -> AdmissionChain {
    AdmissionChain::new(vec![
        Box::new(ContextSetupDecorator { gas_limit: None }),
        Box::new(RateLimitDecorator::new(deps.counter_store)),
        Box::new(BasicValidationDecorator),
        Box::new(TimeoutHeightDecorator),
        Box::new(MemoDecorator { max_memo_chars: config.max_memo_chars }),
        Box::new(TxSizeGasDecorator { gas_per_byte: config.gas_per_byte }),
        Box::new(FeeDeductionDecorator { keeper: deps.accounts.clone(), min_fee: config.min_fee }),
        Box::new(PublicKeyBindingDecorator { keeper: deps.accounts.clone() }),
        Box::new(SignatureCountDecorator { max_signatures: config.max_signatures }),
        Box::new(SignatureGasDecorator { gas_per_signature: config.gas_per_signature }),
        Box::new(SignatureVerificationDecorator {
            keeper: deps.accounts.clone(),
            verifier: deps.signatures,
        }),
        Box::new(IdentityGateDecorator::new(
            deps.identity,
            deps.roles,
            config.sensitive_tx_policies.clone(),
            config.governance_authority_address(),
        )),
        Box::new(MfaGateDecorator::new(deps.mfa)),
        Box::new(SequenceIncrementDecorator { keeper: deps.accounts }),
    ])
}
