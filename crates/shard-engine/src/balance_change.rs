//! Pending balance change applier (C7): idempotently applies inbound
//! `PendingBalanceChange` signals to the recipient account.

use chrono::{DateTime, Utc};
use shard_core::{
    AccountKey, AccountTransfer, ChangeKey, PendingBalanceChange, RegisteredBalanceChange,
    ShardResult, Signal,
};

use crate::ShardEngine;

impl ShardEngine {
    /// §4.7 step 1: register the inbound change. A PK collision on
    /// `(debtor_id, other_creditor_id, change_id)` means this is a
    /// duplicate delivery and is silently ignored — the idempotence
    /// mechanism for at-least-once signal delivery.
    pub fn insert_pending_balance_change(&self, change: PendingBalanceChange) -> ShardResult<bool> {
        let key = ChangeKey {
            debtor_id: change.debtor_id,
            other_creditor_id: change.other_creditor_id,
            change_id: change.change_id,
        };
        let row = RegisteredBalanceChange {
            key,
            creditor_id: change.creditor_id,
            principal_delta: change.principal_delta,
            committed_at: change.committed_at,
            is_applied: false,
        };
        self.store.register_balance_change_if_absent(&row)
    }

    /// §4.7 step 2: apply every unapplied registered row, up to
    /// `max_count`, locking each recipient account once.
    pub fn apply_pending_balance_changes(&self, now: DateTime<Utc>, max_count: usize) -> ShardResult<usize> {
        let rows = self.store.scan_unapplied_balance_changes(max_count)?;
        let mut applied = 0;
        for row in rows {
            let key = AccountKey::new(row.key.debtor_id, row.creditor_id);
            self.locks.with_account_lock(key, || -> ShardResult<()> {
                let Some(mut account) = self.store.get_account(key)? else {
                    return Ok(());
                };
                self.apply_account_change(&mut account, row.principal_delta, 0.0, now);
                self.store.put_account(&account)?;
                self.emit_account_update(&account)?;

                let negligible = row.principal_delta > 0
                    && (row.principal_delta as f64) <= account.negligible_amount as f64;
                if !negligible {
                    self.store.enqueue_signal(&Signal::AccountTransfer(AccountTransfer {
                        debtor_id: account.debtor_id,
                        creditor_id: account.creditor_id,
                        other_creditor_id: row.key.other_creditor_id,
                        committed_amount: row.principal_delta,
                        transfer_note_format: String::new(),
                        transfer_note: String::new(),
                        committed_at: row.committed_at,
                        principal_after: account.principal,
                    }))?;
                }

                self.store.mark_balance_change_applied(row.key)?;
                Ok(())
            })?;
            applied += 1;
        }
        Ok(applied)
    }

    /// Garbage-collects applied registered rows older than `retention`,
    /// per §4.7's "retention window".
    pub fn gc_stale_balance_changes(&self, now: DateTime<Utc>, retention: chrono::Duration) -> ShardResult<u64> {
        self.store.gc_applied_balance_changes(now - retention)
    }
}
