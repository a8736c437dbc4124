use veris_types::address::AccountAddress;
use veris_types::transaction::AdmissionTx;

use crate::errors::AdmissionResult;

/// A stored account, as the admission chain sees it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccountRecord {
    pub address: AccountAddress,
    pub public_key: Option<Vec<u8>>,
    pub sequence: u64,
    pub balance: u128,
}

/// Account state surface consumed by the fee, public-key and sequence
/// decorators. Implemented by the state store; an in-memory keeper backs the
/// tests.
#[cfg_attr(any(feature = "testing", test), mockall::automock)]
pub trait AccountKeeper: Send + Sync {
    fn account(&self, address: &AccountAddress) -> Option<AccountRecord>;

    /// Binds a public key to an account that has none yet.
    fn bind_public_key(&self, address: &AccountAddress, public_key: Vec<u8>)
        -> AdmissionResult<()>;

    /// Moves the fee out of the payer's balance.
    fn deduct_fee(&self, address: &AccountAddress, fee: u128) -> AdmissionResult<()>;

    fn increment_sequence(&self, address: &AccountAddress) -> AdmissionResult<()>;
}

/// Signature verification seam; the production implementation checks the
/// cryptographic signature bytes against the bound key.
pub trait SignatureVerifier: Send + Sync {
    fn verify(&self, tx: &dyn AdmissionTx, signer: &AccountAddress, public_key: &[u8]) -> bool;
}

/// A verifier with a fixed verdict; test-only.
#[cfg(any(feature = "testing", test))]
#[derive(Debug, Clone, Copy)]
pub struct StaticVerifier(pub bool);

#[cfg(any(feature = "testing", test))]
impl SignatureVerifier for StaticVerifier {
    fn verify(&self, _tx: &dyn AdmissionTx, _signer: &AccountAddress, _public_key: &[u8]) -> bool {
        self.0
    }
}

/// In-memory account keeper for tests and local tooling.
#[cfg(any(feature = "testing", test))]
pub use in_memory::InMemoryAccountKeeper;

#[cfg(any(feature = "testing", test))]
mod in_memory {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use veris_types::address::AccountAddress;

    use super::{AccountKeeper, AccountRecord};
    use crate::errors::{AdmissionError, AdmissionResult};

    #[derive(Debug, Default)]
    pub struct InMemoryAccountKeeper {
        accounts: Mutex<HashMap<AccountAddress, AccountRecord>>,
    }

    impl InMemoryAccountKeeper {
        pub fn with_account(self, record: AccountRecord) -> Self {
            self.insert(record);
            self
        }

        pub fn insert(&self, record: AccountRecord) {
            let mut accounts = self.accounts.lock().expect("account keeper lock poisoned");
            accounts.insert(record.address.clone(), record);
        }
    }

    impl AccountKeeper for InMemoryAccountKeeper {
        fn account(&self, address: &AccountAddress) -> Option<AccountRecord> {
            self.accounts.lock().expect("account keeper lock poisoned").get(address).cloned()
        }

        fn bind_public_key(
            &self,
            address: &AccountAddress,
            public_key: Vec<u8>,
        ) -> AdmissionResult<()> {
            let mut accounts = self.accounts.lock().expect("account keeper lock poisoned");
            let record = accounts
                .get_mut(address)
                .ok_or_else(|| AdmissionError::UnknownAccount { address: address.clone() })?;
            record.public_key.get_or_insert(public_key);
            Ok(())
        }

        fn deduct_fee(&self, address: &AccountAddress, fee: u128) -> AdmissionResult<()> {
            let mut accounts = self.accounts.lock().expect("account keeper lock poisoned");
            let record = accounts
                .get_mut(address)
                .ok_or_else(|| AdmissionError::UnknownAccount { address: address.clone() })?;
            if record.balance < fee {
                return Err(AdmissionError::InsufficientFunds {
                    address: address.clone(),
                    balance: record.balance,
                    fee,
                });
            }
            record.balance -= fee;
            Ok(())
        }

        fn increment_sequence(&self, address: &AccountAddress) -> AdmissionResult<()> {
            let mut accounts = self.accounts.lock().expect("account keeper lock poisoned");
            let record = accounts
                .get_mut(address)
                .ok_or_else(|| AdmissionError::UnknownAccount { address: address.clone() })?;
            record.sequence += 1;
            Ok(())
        }
    }
}
