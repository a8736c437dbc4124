use std::sync::Arc;

use assert_matches::assert_matches;
use pretty_assertions::assert_eq;
use veris_mfa::{MockMfaAdapter, RequirementDecision};
use veris_types::identity::VeidStatus;

use crate::chain::{standard_chain, AdmissionChain, AdmissionDeps};
use crate::config::{AdmissionConfig, RateLimitParams};
use crate::context::AdmissionContext;
use crate::counter_store::TransientCounterStore;
use crate::errors::{AdmissionError, RateLimitError};
use crate::keepers::{AccountKeeper, AccountRecord, InMemoryAccountKeeper, StaticVerifier};
use crate::test_utils::{test_address, transfer_tx, StubIdentityRegistry, StubRoleRegistry};

struct Harness {
    chain: AdmissionChain,
    store: Arc<TransientCounterStore>,
    keeper: Arc<InMemoryAccountKeeper>,
}

fn harness(config: AdmissionConfig) -> Harness {
    let store = Arc::new(TransientCounterStore::new(config.rate_limit.clone()));
    let keeper = Arc::new(InMemoryAccountKeeper::default());
    for n in 1..=5 {
        keeper.insert(AccountRecord {
            address: test_address(n),
            public_key: Some(vec![n; 32]),
            sequence: 0,
            balance: 1_000_000,
        });
    }

    let mut mfa = MockMfaAdapter::new();
    mfa.expect_requires_mfa().return_const(RequirementDecision::default());

    let identity = (1..=5).fold(StubIdentityRegistry::default(), |registry, n| {
        registry.with_score(test_address(n), 90, VeidStatus::Verified)
    });

    let chain = standard_chain(
        &config,
        AdmissionDeps {
            counter_store: store.clone(),
            identity: Arc::new(identity),
            roles: Arc::new(StubRoleRegistry::default()),
            mfa: Arc::new(mfa),
            accounts: keeper.clone(),
            signatures: Arc::new(StaticVerifier(true)),
        },
    );
    Harness { chain, store, keeper }
}

#[test]
fn stage_order_is_fixed() {
    let harness = harness(AdmissionConfig::default());
    assert_eq!(
        harness.chain.stage_names(),
        vec![
            "context_setup",
            "rate_limit",
            "basic_validation",
            "timeout_height",
            "memo_validation",
            "tx_size_gas",
            "fee_deduction",
            "public_key_binding",
            "signature_count",
            "signature_gas",
            "signature_verification",
            "identity_gate",
            "mfa_gate",
            "sequence_increment",
        ]
    );
}

#[test]
fn a_well_formed_tx_traverses_the_whole_chain() {
    let harness = harness(AdmissionConfig::default());
    let signer = test_address(1);
    let tx = transfer_tx(&signer).with_fee(100);

    let mut ctx = AdmissionContext::new(1, 1_700_000_000);
    harness.chain.admit(&mut ctx, &tx).unwrap();

    assert_eq!(harness.store.total_count(), 1);
    assert_eq!(harness.keeper.account(&signer).unwrap().sequence, 1);
    assert_eq!(harness.keeper.account(&signer).unwrap().balance, 1_000_000 - 100);
    assert!(ctx.gas_used() > 0);
}

#[test]
fn rejection_short_circuits_later_stages() {
    let config = AdmissionConfig {
        rate_limit: RateLimitParams { max_tx_per_block_per_account: 1, ..Default::default() },
        ..Default::default()
    };
    let harness = harness(config);
    let signer = test_address(1);
    let tx = transfer_tx(&signer);

    let mut ctx = AdmissionContext::new(1, 1_700_000_000);
    harness.chain.admit(&mut ctx, &tx).unwrap();
    let err = harness.chain.admit(&mut ctx, &tx).unwrap_err();
    assert_matches!(
        err,
        AdmissionError::RateLimit(RateLimitError::AccountRateLimited { .. })
    );

    // The sequence decorator never ran for the rejected tx.
    assert_eq!(harness.keeper.account(&signer).unwrap().sequence, 1);
}

#[test]
fn block_reset_through_the_chain() {
    let config = AdmissionConfig {
        rate_limit: RateLimitParams { max_tx_per_block_per_account: 3, ..Default::default() },
        ..Default::default()
    };
    let harness = harness(config);
    let signer = test_address(1);
    let tx = transfer_tx(&signer);

    let mut ctx = AdmissionContext::new(1, 1_700_000_000);
    for _ in 0..3 {
        harness.chain.admit(&mut ctx, &tx).unwrap();
    }
    harness.chain.admit(&mut ctx, &tx).unwrap_err();

    let mut ctx = AdmissionContext::new(2, 1_700_000_005);
    assert_eq!(harness.store.total_count(), 3);
    harness.chain.admit(&mut ctx, &tx).unwrap();
    assert_eq!(harness.store.total_count(), 1);
}

#[test]
fn simulation_leaves_all_state_untouched() {
    let harness = harness(AdmissionConfig::default());
    let signer = test_address(1);
    let tx = transfer_tx(&signer).with_fee(100);

    let mut ctx = AdmissionContext::new(1, 1_700_000_000).simulated();
    harness.chain.admit(&mut ctx, &tx).unwrap();

    assert_eq!(harness.store.total_count(), 0);
    assert_eq!(harness.keeper.account(&signer).unwrap().sequence, 0);
    assert_eq!(harness.keeper.account(&signer).unwrap().balance, 1_000_000);
}
