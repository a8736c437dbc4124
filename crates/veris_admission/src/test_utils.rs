//! Builders shared by the admission tests.

use std::collections::HashMap;
use std::sync::Arc;

use veris_types::address::AccountAddress;
use veris_types::identity::{
    GovernanceRole,
    IdentityReader,
    RoleReader,
    ScoreRecord,
    VeidStatus,
    VeidTier,
    VerificationScope,
};
use veris_types::sensitive::SensitiveTxType;
use veris_types::transaction::{MfaProofAttachment, RawMessage, StdTx};

/// A deterministic, well-formed test address.
pub fn test_address(n: u8) -> AccountAddress {
    AccountAddress::new(format!("veris1testaccqqqqqqqqqq{n:02}"))
}

/// A transfer-style tx signed by `signer`.
pub fn transfer_tx(signer: &AccountAddress) -> StdTx {
    StdTx::new(vec![Arc::new(RawMessage::new(
        "/veris.bank.v1.MsgSend",
        vec![signer.clone()],
    ))])
}

/// A tx carrying one identity-verification message signed by `signer`.
pub fn identity_verification_tx(signer: &AccountAddress) -> StdTx {
    StdTx::new(vec![Arc::new(RawMessage::new(
        "/veris.veid.v1.MsgSubmitVerification",
        vec![signer.clone()],
    ))])
}

/// A tx carrying one message of the given sensitive category.
pub fn sensitive_tx(tx_type: SensitiveTxType, signer: &AccountAddress) -> StdTx {
    StdTx::new(vec![Arc::new(RawMessage::new(tx_type.type_url(), vec![signer.clone()]))])
}

/// A tx of the given sensitive category carrying an MFA proof attachment.
pub fn sensitive_tx_with_proof(
    tx_type: SensitiveTxType,
    signer: &AccountAddress,
    proof: MfaProofAttachment,
) -> StdTx {
    StdTx::new(vec![Arc::new(
        RawMessage::new(tx_type.type_url(), vec![signer.clone()]).with_mfa_proof(proof),
    )])
}

/// Identity reader over a fixed score table; unknown accounts read as
/// unverified with score zero.
#[derive(Debug, Default)]
pub struct StubIdentityRegistry {
    records: HashMap<AccountAddress, ScoreRecord>,
}

impl StubIdentityRegistry {
    pub fn with_score(mut self, address: AccountAddress, score: u32, status: VeidStatus) -> Self {
        self.records.insert(address, ScoreRecord { score, status });
        self
    }
}

impl IdentityReader for StubIdentityRegistry {
    fn tier(&self, address: &AccountAddress) -> VeidTier {
        self.records
            .get(address)
            .map_or(VeidTier::Unverified, |record| VeidTier::for_score(record.score))
    }

    fn score(&self, address: &AccountAddress) -> Option<ScoreRecord> {
        self.records.get(address).cloned()
    }

    fn scopes_by_type(
        &self,
        _address: &AccountAddress,
        _scope_type: &str,
    ) -> Vec<VerificationScope> {
        Vec::new()
    }
}

/// Role reader over a fixed grant set.
#[derive(Debug, Default)]
pub struct StubRoleRegistry {
    grants: Vec<(AccountAddress, GovernanceRole)>,
}

impl StubRoleRegistry {
    pub fn with_role(mut self, address: AccountAddress, role: GovernanceRole) -> Self {
        self.grants.push((address, role));
        self
    }
}

impl RoleReader for StubRoleRegistry {
    fn has_role(&self, address: &AccountAddress, role: GovernanceRole) -> bool {
        self.grants.iter().any(|(a, r)| a == address && *r == role)
    }
}
