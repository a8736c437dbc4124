use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use tracing::debug;
use validator::Validate;
use veris_types::address::AccountAddress;

use crate::config::RateLimitParams;
use crate::errors::RateLimitError;

#[cfg(test)]
#[path = "counter_store_test.rs"]
mod counter_store_test;

/// Transient per-block counters.
///
/// Lives only in process memory; never persisted. All counters reset whenever
/// the observed block height changes. One exclusive lock guards the whole
/// store so a single admission decision reads and writes a consistent view.
#[derive(Debug)]
pub struct TransientCounterStore {
    state: Mutex<CounterState>,
}

/// The counters and parameters behind the store's lock.
#[derive(Debug)]
pub struct CounterState {
    current_height: u64,
    account_counts: HashMap<AccountAddress, u64>,
    sensitive_count: u64,
    total_count: u64,
    params: RateLimitParams,
}

impl TransientCounterStore {
    pub fn new(params: RateLimitParams) -> Self {
        Self {
            state: Mutex::new(CounterState {
                current_height: 0,
                account_counts: HashMap::new(),
                sensitive_count: 0,
                total_count: 0,
                params,
            }),
        }
    }

    /// Takes the store's exclusive lock. The rate-limit decorator holds the
    /// guard across its whole decision.
    pub fn lock(&self) -> MutexGuard<'_, CounterState> {
        self.state.lock().expect("counter store lock poisoned")
    }

    /// Replaces the parameters after re-validating them. The same lock that
    /// guards reads guards this update path.
    pub fn set_params(&self, params: RateLimitParams) -> Result<(), RateLimitError> {
        params
            .validate()
            .map_err(|err| RateLimitError::InvalidParams { reason: err.to_string() })?;
        self.lock().params = params;
        Ok(())
    }

    /// A snapshot of the current parameters.
    pub fn params(&self) -> RateLimitParams {
        self.lock().params.clone()
    }

    /// Per-account count at the current height.
    pub fn account_count(&self, address: &AccountAddress) -> u64 {
        self.lock().account_count(address)
    }

    /// Global count at the current height.
    pub fn total_count(&self) -> u64 {
        self.lock().total_count()
    }

    /// Identity-verification count at the current height.
    pub fn sensitive_count(&self) -> u64 {
        self.lock().sensitive_count()
    }
}

impl CounterState {
    /// Clears every counter when the observed height changes.
    pub fn reset_for_block(&mut self, height: u64) {
        if height == self.current_height {
            return;
        }
        debug!(
            previous_height = self.current_height,
            height, "resetting per-block admission counters"
        );
        self.account_counts.clear();
        self.sensitive_count = 0;
        self.total_count = 0;
        self.current_height = height;
    }

    pub fn current_height(&self) -> u64 {
        self.current_height
    }

    pub fn params(&self) -> &RateLimitParams {
        &self.params
    }

    pub fn account_count(&self, address: &AccountAddress) -> u64 {
        self.account_counts.get(address).copied().unwrap_or(0)
    }

    pub fn increment_account(&mut self, address: &AccountAddress) {
        *self.account_counts.entry(address.clone()).or_insert(0) += 1;
    }

    pub fn sensitive_count(&self) -> u64 {
        self.sensitive_count
    }

    pub fn increment_sensitive(&mut self) {
        self.sensitive_count += 1;
    }

    pub fn total_count(&self) -> u64 {
        self.total_count
    }

    pub fn increment_total(&mut self) {
        self.total_count += 1;
    }
}
