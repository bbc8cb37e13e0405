use chrono::{Duration, TimeZone, Utc};
use shard_core::{AccountKey, CoordinatorKey, PendingBalanceChange};

use crate::test_support::temp_engine;

fn ts(secs: i64) -> chrono::DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

fn coordinator(id: i64, request_id: i64) -> CoordinatorKey {
    CoordinatorKey { coordinator_type: "test".into(), coordinator_id: id, coordinator_request_id: request_id }
}

fn configure_and_fund(engine: &crate::ShardEngine, debtor_id: i64, creditor_id: i64, principal: i64, now: chrono::DateTime<Utc>) {
    engine
        .configure_account(debtor_id, creditor_id, now, 1, 0.0, 0, String::new(), now)
        .unwrap();
    let mut acc = engine.store.get_account(AccountKey::new(debtor_id, creditor_id)).unwrap().unwrap();
    acc.principal = principal;
    engine.store.put_account(&acc).unwrap();
}

#[test]
fn successful_transfer_moves_principal_after_applier_runs() {
    let engine = temp_engine("successful_transfer");
    let now = ts(1_000_000);

    configure_and_fund(&engine, -1, 1, 100, now);
    configure_and_fund(&engine, -1, 1234, 0, now);

    engine
        .prepare_transfer(coordinator(1, 2), 1, -1, 1, 1234, 1, 200, now, 86_400, now)
        .unwrap();
    engine.process_transfer_requests(AccountKey::new(-1, 1), now).unwrap();

    let sender = engine.store.get_account(AccountKey::new(-1, 1)).unwrap().unwrap();
    assert_eq!(sender.total_locked_amount, 100);
    assert_eq!(sender.pending_transfers_count, 1);
    let transfer_id = sender.last_transfer_id;

    engine
        .finalize_transfer(coordinator(1, 2), -1, 1, transfer_id, 40, String::new(), String::new(), false)
        .unwrap();
    engine.process_finalization_requests(AccountKey::new(-1, 1), now).unwrap();

    let sender = engine.store.get_account(AccountKey::new(-1, 1)).unwrap().unwrap();
    assert_eq!(sender.principal, 60);

    engine
        .insert_pending_balance_change(PendingBalanceChange {
            debtor_id: -1,
            creditor_id: 1234,
            change_id: transfer_id,
            coordinator_type: "test".into(),
            transfer_note_format: String::new(),
            transfer_note: String::new(),
            committed_at: now,
            principal_delta: 40,
            other_creditor_id: 1,
        })
        .unwrap();
    engine.apply_pending_balance_changes(now, 10).unwrap();

    let recipient = engine.store.get_account(AccountKey::new(-1, 1234)).unwrap().unwrap();
    assert_eq!(recipient.principal, 40);
}

#[test]
fn dismiss_via_committed_zero_leaves_principal_unchanged() {
    let engine = temp_engine("dismiss_committed_zero");
    let now = ts(2_000_000);

    configure_and_fund(&engine, -1, 1, 100, now);
    configure_and_fund(&engine, -1, 1234, 0, now);

    engine.prepare_transfer(coordinator(1, 2), 1, -1, 1, 1234, 1, 200, now, 86_400, now).unwrap();
    engine.process_transfer_requests(AccountKey::new(-1, 1), now).unwrap();
    let sender = engine.store.get_account(AccountKey::new(-1, 1)).unwrap().unwrap();
    let transfer_id = sender.last_transfer_id;

    engine.finalize_transfer(coordinator(1, 2), -1, 1, transfer_id, 0, String::new(), String::new(), false).unwrap();
    engine.process_finalization_requests(AccountKey::new(-1, 1), now).unwrap();

    let sender = engine.store.get_account(AccountKey::new(-1, 1)).unwrap().unwrap();
    assert_eq!(sender.principal, 100);
    assert_eq!(sender.total_locked_amount, 0);
    assert_eq!(sender.pending_transfers_count, 0);
}

#[test]
fn finalize_after_deadline_times_out() {
    let engine = temp_engine("finalize_timeout");
    let now = ts(3_000_000);

    configure_and_fund(&engine, -1, 1, 100, now);
    configure_and_fund(&engine, -1, 1234, 0, now);

    engine.prepare_transfer(coordinator(1, 2), 1, -1, 1, 1234, 1, 200, now, 60, now).unwrap();
    engine.process_transfer_requests(AccountKey::new(-1, 1), now).unwrap();
    let sender = engine.store.get_account(AccountKey::new(-1, 1)).unwrap().unwrap();
    let transfer_id = sender.last_transfer_id;

    let later = now + Duration::seconds(120);
    engine.finalize_transfer(coordinator(1, 2), -1, 1, transfer_id, 40, String::new(), String::new(), false).unwrap();
    engine.process_finalization_requests(AccountKey::new(-1, 1), later).unwrap();

    let sender = engine.store.get_account(AccountKey::new(-1, 1)).unwrap().unwrap();
    assert_eq!(sender.principal, 100);
}

#[test]
fn insufficient_funds_rejects_prepare() {
    let engine = temp_engine("insufficient_funds");
    let now = ts(4_000_000);
    configure_and_fund(&engine, -1, 1, 0, now);

    engine.prepare_transfer(coordinator(1, 2), 1, -1, 1, 1234, 1, 200, now, 86_400, now).unwrap();
    engine.process_transfer_requests(AccountKey::new(-1, 1), now).unwrap();

    let sender = engine.store.get_account(AccountKey::new(-1, 1)).unwrap().unwrap();
    assert_eq!(sender.total_locked_amount, 0);
    assert_eq!(sender.pending_transfers_count, 0);
}

#[test]
fn duplicate_balance_change_applies_once() {
    let engine = temp_engine("duplicate_balance_change");
    let now = ts(5_000_000);
    configure_and_fund(&engine, -1, 1, 0, now);

    let change = PendingBalanceChange {
        debtor_id: -1,
        creditor_id: 1,
        change_id: 7,
        coordinator_type: "direct".into(),
        transfer_note_format: String::new(),
        transfer_note: String::new(),
        committed_at: now,
        principal_delta: 100,
        other_creditor_id: 2,
    };

    let first = engine.insert_pending_balance_change(change.clone()).unwrap();
    let second = engine.insert_pending_balance_change(change).unwrap();
    assert!(first);
    assert!(!second);

    engine.apply_pending_balance_changes(now, 10).unwrap();
    engine.apply_pending_balance_changes(now, 10).unwrap();

    let account = engine.store.get_account(AccountKey::new(-1, 1)).unwrap().unwrap();
    assert_eq!(account.principal, 100);
}

#[test]
fn configure_account_wrap_aware_seqnum_ordering() {
    let engine = temp_engine("configure_wrap");
    let now = ts(6_000_000);

    let out1 = engine.configure_account(-1, 1, now, 1, 0.0, 0, "a".into(), now).unwrap();
    assert!(out1.applied);

    let too_old = now - Duration::seconds(5);
    let out2 = engine.configure_account(-1, 1, too_old, 2, 0.0, 0, "b".into(), now).unwrap();
    assert!(!out2.applied);

    let out3 = engine.configure_account(-1, 1, now, 2, 0.0, 0, "c".into(), now).unwrap();
    assert!(out3.applied);

    let account = engine.store.get_account(AccountKey::new(-1, 1)).unwrap().unwrap();
    assert_eq!(account.config_data, "c");
}
