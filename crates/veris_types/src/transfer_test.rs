use assert_matches::assert_matches;
use pretty_assertions::assert_eq;

use crate::address::AccountAddress;
use crate::transfer::{
    PendingTransfer,
    TimeoutAction,
    TransferError,
    TransferStatus,
    TransferTimeoutTracker,
    MAX_TRANSFER_RETRIES,
};

const TIMEOUT_SECS: u64 = 600;

fn transfer(id: &str, action: TimeoutAction, created_at: u64) -> PendingTransfer {
    PendingTransfer {
        transfer_id: id.to_owned(),
        source_channel: "channel-0".to_owned(),
        sender: AccountAddress::from("veris1qy352euf40x77qfrg4ncn27"),
        receiver: "cosmos1receiver".to_owned(),
        amount: 1_000,
        settlement_id: None,
        created_at,
        timeout_action: action,
        retry_count: 0,
        status: TransferStatus::Pending,
    }
}

#[test]
fn duplicate_ids_are_rejected() {
    let tracker = TransferTimeoutTracker::new(TIMEOUT_SECS);
    tracker.track(transfer("t-1", TimeoutAction::Refund, 0)).unwrap();
    assert_matches!(
        tracker.track(transfer("t-1", TimeoutAction::Refund, 0)),
        Err(TransferError::DuplicateTransfer { .. })
    );
}

#[test]
fn completion_removes_the_pending_entry() {
    let tracker = TransferTimeoutTracker::new(TIMEOUT_SECS);
    tracker.track(transfer("t-1", TimeoutAction::Refund, 0)).unwrap();

    let settled = tracker.complete("t-1", "settle-9").unwrap();
    assert_eq!(settled.status, TransferStatus::Complete);
    assert_eq!(settled.settlement_id.as_deref(), Some("settle-9"));
    assert_eq!(tracker.pending_count(), 0);
    assert_matches!(tracker.complete("t-1", "x"), Err(TransferError::UnknownTransfer { .. }));
}

#[test]
fn refund_action_removes_on_timeout() {
    let tracker = TransferTimeoutTracker::new(TIMEOUT_SECS);
    tracker.track(transfer("t-1", TimeoutAction::Refund, 0)).unwrap();

    // Not yet due.
    assert!(tracker.sweep(TIMEOUT_SECS - 1).is_empty());

    let transitioned = tracker.sweep(TIMEOUT_SECS);
    assert_eq!(transitioned.len(), 1);
    assert_eq!(transitioned[0].status, TransferStatus::Refunded);
    assert_eq!(tracker.pending_count(), 0);
}

#[test]
fn retry_action_falls_back_to_refund_after_max_retries() {
    let tracker = TransferTimeoutTracker::new(TIMEOUT_SECS);
    tracker.track(transfer("t-1", TimeoutAction::Retry, 0)).unwrap();

    let mut now = 0;
    for expected_retry in 1..=MAX_TRANSFER_RETRIES {
        now += TIMEOUT_SECS;
        let transitioned = tracker.sweep(now);
        assert_eq!(transitioned.len(), 1);
        assert_eq!(transitioned[0].status, TransferStatus::Retrying);
        assert_eq!(transitioned[0].retry_count, expected_retry);
    }

    now += TIMEOUT_SECS;
    let transitioned = tracker.sweep(now);
    assert_eq!(transitioned[0].status, TransferStatus::Refunded);
    assert_eq!(tracker.pending_count(), 0);
}

#[test]
fn escrow_hold_keeps_the_entry_timed_out() {
    let tracker = TransferTimeoutTracker::new(TIMEOUT_SECS);
    tracker.track(transfer("t-1", TimeoutAction::EscrowHold, 0)).unwrap();

    let transitioned = tracker.sweep(TIMEOUT_SECS);
    assert_eq!(transitioned[0].status, TransferStatus::TimedOut);
    assert_eq!(tracker.get("t-1").unwrap().status, TransferStatus::TimedOut);

    // A later sweep does not re-process it.
    assert!(tracker.sweep(TIMEOUT_SECS * 10).is_empty());
}
