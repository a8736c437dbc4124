use std::sync::Arc;

use tracing::debug;
use veris_types::address::AccountAddress;
use veris_types::events::{Event, EVENT_RATE_LIMIT_EXCEEDED};
use veris_types::sensitive::is_identity_verification_type_url;
use veris_types::transaction::AdmissionTx;

use crate::chain::AdmissionDecorator;
use crate::context::AdmissionContext;
use crate::counter_store::TransientCounterStore;
use crate::errors::{AdmissionResult, RateLimitError};
use crate::metrics::{RateLimitReason, ADMISSION_TXS_RATE_LIMITED};

#[cfg(test)]
#[path = "rate_limit_decorator_test.rs"]
mod rate_limit_decorator_test;

/// Enforces the per-block caps: total, per-signer and the global
/// identity-verification budget.
///
/// The whole decision runs under the counter store's single lock, so checks
/// and increments are atomic per transaction. A blocked transaction consumes
/// no quota; increments happen only after every check passed.
pub struct RateLimitDecorator {
    store: Arc<TransientCounterStore>,
}

impl RateLimitDecorator {
    pub fn new(store: Arc<TransientCounterStore>) -> Self {
        Self { store }
    }

    fn emit_rejection(
        ctx: &mut AdmissionContext,
        reason: RateLimitReason,
        account: Option<&AccountAddress>,
        current_count: u64,
        limit: u64,
    ) {
        let event = Event::new(EVENT_RATE_LIMIT_EXCEEDED)
            .attribute("account", account.map(AccountAddress::to_string).unwrap_or_default())
            .attribute("reason", <&'static str>::from(reason))
            .attribute("current_count", current_count.to_string())
            .attribute("limit", limit.to_string())
            .attribute("block_height", ctx.block_height.to_string());
        ctx.emit(event);
        ADMISSION_TXS_RATE_LIMITED.increment(1, &reason.as_label());
    }
}

impl AdmissionDecorator for RateLimitDecorator {
    fn name(&self) -> &'static str {
        "rate_limit"
    }

    fn check(&self, ctx: &mut AdmissionContext, tx: &dyn AdmissionTx) -> AdmissionResult<()> {
        // Simulations must not consume quota.
        if ctx.simulate {
            return Ok(());
        }

        let mut state = self.store.lock();
        state.reset_for_block(ctx.block_height);
        if !state.params().enabled {
            return Ok(());
        }
        let params = state.params().clone();

        let total = state.total_count();
        if total >= params.max_total_tx_per_block {
            Self::emit_rejection(
                ctx,
                RateLimitReason::BlockLimit,
                None,
                total,
                params.max_total_tx_per_block,
            );
            return Err(RateLimitError::BlockRateLimited {
                count: total,
                limit: params.max_total_tx_per_block,
                block_height: ctx.block_height,
            }
            .into());
        }

        // Without the signable capability there is nothing to count against.
        let Some(signers) = tx.signers() else {
            debug!("transaction lacks the signable capability; forwarding uncounted");
            return Ok(());
        };

        let counted_signers: Vec<AccountAddress> =
            signers.into_iter().filter(|signer| !params.is_exempt(signer)).collect();

        for signer in &counted_signers {
            let count = state.account_count(signer);
            if count >= params.max_tx_per_block_per_account {
                Self::emit_rejection(
                    ctx,
                    RateLimitReason::AccountLimit,
                    Some(signer),
                    count,
                    params.max_tx_per_block_per_account,
                );
                return Err(RateLimitError::AccountRateLimited {
                    account: signer.clone(),
                    count,
                    limit: params.max_tx_per_block_per_account,
                    block_height: ctx.block_height,
                }
                .into());
            }
        }

        let is_sensitive = tx
            .messages()
            .iter()
            .any(|message| is_identity_verification_type_url(message.type_url()));
        if is_sensitive {
            let sensitive = state.sensitive_count();
            if sensitive >= params.max_sensitive_tx_per_block_global {
                Self::emit_rejection(
                    ctx,
                    RateLimitReason::SensitiveLimit,
                    counted_signers.first(),
                    sensitive,
                    params.max_sensitive_tx_per_block_global,
                );
                return Err(RateLimitError::SensitiveRateLimited {
                    count: sensitive,
                    limit: params.max_sensitive_tx_per_block_global,
                    block_height: ctx.block_height,
                }
                .into());
            }
        }

        // Every check passed; only now does the transaction consume quota.
        for signer in &counted_signers {
            state.increment_account(signer);
        }
        if is_sensitive {
            state.increment_sensitive();
        }
        state.increment_total();
        Ok(())
    }
}
