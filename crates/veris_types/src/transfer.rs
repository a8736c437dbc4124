use std::collections::HashMap;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use strum::Display;
use thiserror::Error;

use crate::address::AccountAddress;

#[cfg(test)]
#[path = "transfer_test.rs"]
mod transfer_test;

/// Maximum automatic retries before a retrying transfer falls back to refund.
pub const MAX_TRANSFER_RETRIES: u32 = 3;

/// What to do with an outbound bridge transfer that times out.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, Display)]
#[strum(serialize_all = "snake_case")]
pub enum TimeoutAction {
    #[default]
    Refund,
    Retry,
    EscrowHold,
}

/// Lifecycle status of a pending transfer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, Display)]
#[strum(serialize_all = "snake_case")]
pub enum TransferStatus {
    #[default]
    Pending,
    Complete,
    TimedOut,
    Refunded,
    Retrying,
}

/// An outbound bridge transfer awaiting settlement on the counterparty chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingTransfer {
    pub transfer_id: String,
    pub source_channel: String,
    pub sender: AccountAddress,
    pub receiver: String,
    pub amount: u128,
    pub settlement_id: Option<String>,
    pub created_at: u64,
    pub timeout_action: TimeoutAction,
    pub retry_count: u32,
    pub status: TransferStatus,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransferError {
    #[error("transfer '{transfer_id}' is already tracked")]
    DuplicateTransfer { transfer_id: String },
    #[error("transfer '{transfer_id}' is not tracked")]
    UnknownTransfer { transfer_id: String },
}

/// Tracks pending transfers and applies timeout actions.
///
/// Completed and refunded transfers leave the pending table; retrying
/// transfers stay, with their creation time reset so the timeout restarts.
#[derive(Debug, Default)]
pub struct TransferTimeoutTracker {
    timeout_secs: u64,
    pending: Mutex<HashMap<String, PendingTransfer>>,
}

impl TransferTimeoutTracker {
    pub fn new(timeout_secs: u64) -> Self {
        Self { timeout_secs, pending: Mutex::new(HashMap::new()) }
    }

    /// Starts tracking a transfer.
    pub fn track(&self, transfer: PendingTransfer) -> Result<(), TransferError> {
        let mut pending = self.pending.lock().expect("transfer tracker lock poisoned");
        if pending.contains_key(&transfer.transfer_id) {
            return Err(TransferError::DuplicateTransfer { transfer_id: transfer.transfer_id });
        }
        pending.insert(transfer.transfer_id.clone(), transfer);
        Ok(())
    }

    /// Marks a transfer settled and removes it from the pending table.
    pub fn complete(
        &self,
        transfer_id: &str,
        settlement_id: impl Into<String>,
    ) -> Result<PendingTransfer, TransferError> {
        let mut pending = self.pending.lock().expect("transfer tracker lock poisoned");
        let mut transfer = pending
            .remove(transfer_id)
            .ok_or_else(|| TransferError::UnknownTransfer { transfer_id: transfer_id.to_owned() })?;
        transfer.settlement_id = Some(settlement_id.into());
        transfer.status = TransferStatus::Complete;
        Ok(transfer)
    }

    /// Applies timeout actions to every transfer older than the timeout,
    /// returning the transfers whose status changed.
    pub fn sweep(&self, unix_now: u64) -> Vec<PendingTransfer> {
        let mut pending = self.pending.lock().expect("transfer tracker lock poisoned");
        let mut transitioned = Vec::new();

        let timed_out: Vec<String> = pending
            .values()
            .filter(|transfer| {
                transfer.status == TransferStatus::Pending
                    || transfer.status == TransferStatus::Retrying
            })
            .filter(|transfer| unix_now.saturating_sub(transfer.created_at) >= self.timeout_secs)
            .map(|transfer| transfer.transfer_id.clone())
            .collect();

        for transfer_id in timed_out {
            let Some(mut transfer) = pending.remove(&transfer_id) else {
                continue;
            };
            match transfer.timeout_action {
                TimeoutAction::Refund => {
                    transfer.status = TransferStatus::Refunded;
                    transitioned.push(transfer);
                }
                TimeoutAction::Retry if transfer.retry_count < MAX_TRANSFER_RETRIES => {
                    transfer.retry_count += 1;
                    transfer.status = TransferStatus::Retrying;
                    transfer.created_at = unix_now;
                    transitioned.push(transfer.clone());
                    pending.insert(transfer_id, transfer);
                }
                // Retries exhausted: fall back to refund.
                TimeoutAction::Retry => {
                    transfer.status = TransferStatus::Refunded;
                    transitioned.push(transfer);
                }
                TimeoutAction::EscrowHold => {
                    transfer.status = TransferStatus::TimedOut;
                    transitioned.push(transfer.clone());
                    pending.insert(transfer_id, transfer);
                }
            }
        }
        transitioned
    }

    /// The number of transfers still tracked.
    pub fn pending_count(&self) -> usize {
        self.pending.lock().expect("transfer tracker lock poisoned").len()
    }

    /// A snapshot of one tracked transfer.
    pub fn get(&self, transfer_id: &str) -> Option<PendingTransfer> {
        self.pending.lock().expect("transfer tracker lock poisoned").get(transfer_id).cloned()
    }
}
