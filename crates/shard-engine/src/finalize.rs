//! Finalization processor (C6): drains queued `FinalizationRequest` rows
//! for one sender account, joining against its `PreparedTransfer`.

use chrono::{DateTime, Utc};
use shard_core::{
    AccountKey, AccountTransfer, FinalizedTransfer, PendingBalanceChangeSignal, PreparedTransfer,
    ShardResult, Signal, TransferKey,
};
use tracing::info;

use crate::ShardEngine;

impl ShardEngine {
    pub fn process_finalization_requests(&self, account: AccountKey, now: DateTime<Utc>) -> ShardResult<usize> {
        self.locks.with_account_lock(account, || self.process_finalization_requests_locked(account, now))
    }

    fn process_finalization_requests_locked(&self, account: AccountKey, now: DateTime<Utc>) -> ShardResult<usize> {
        let requests = self.store.scan_finalization_requests(account, self.config.max_batch_count)?;
        if requests.is_empty() {
            return Ok(0);
        }

        let Some(mut sender) = self.store.get_account(account)? else {
            for fr in &requests {
                self.store.delete_finalization_request(TransferKey::new(fr.debtor_id, fr.sender_creditor_id, fr.transfer_id))?;
            }
            return Ok(requests.len());
        };

        let mut running_principal_delta: i64 = 0;
        let mut any_committed = false;
        let mut counters_changed = false;

        // §4.6: `starting_balance` is the sender's balance projected forward
        // to `now` once, at the moment the account is locked for this batch
        // — not the raw, un-projected `principal` — so accrued interest is
        // part of `expendable` for every request in the batch.
        let starting_balance = shard_core::project_balance(
            sender.principal,
            sender.interest,
            sender.interest_rate,
            sender.last_change_ts,
            now,
            sender.creditor_id,
        )
        .floor();
        let min_account_balance =
            shard_core::min_account_balance(sender.creditor_id, sender.negligible_amount, &sender.config_data);

        for fr in &requests {
            let key = TransferKey::new(fr.debtor_id, fr.sender_creditor_id, fr.transfer_id);
            self.store.delete_finalization_request(key)?;

            if fr.ignore_all && self.config.delete_parent_shard_records {
                continue;
            }

            let Some(pt) = self.store.get_prepared_transfer(key)? else {
                continue;
            };

            let expendable = starting_balance + running_principal_delta as f64
                - sender.total_locked_amount as f64
                - min_account_balance;

            let status_code = calc_status_code(&pt, fr.committed_amount, expendable, sender.last_interest_rate_change_ts, sender.is_root(), now);

            let committed = if status_code == shard_core::status_code::OK { fr.committed_amount } else { 0 };
            running_principal_delta -= committed;

            self.store.delete_prepared_transfer(key)?;
            sender.total_locked_amount = (sender.total_locked_amount - pt.locked_amount).max(0);
            sender.pending_transfers_count = (sender.pending_transfers_count - 1).max(0);
            counters_changed = true;

            self.store.enqueue_signal(&Signal::FinalizedTransfer(FinalizedTransfer {
                coordinator: pt.coordinator.clone(),
                debtor_id: pt.debtor_id,
                sender_creditor_id: pt.sender_creditor_id,
                recipient_creditor_id: pt.recipient_creditor_id,
                transfer_id: pt.transfer_id,
                committed_amount: committed,
                status_code: status_code.to_string(),
                ts: now,
            }))?;

            if committed > 0 {
                any_committed = true;
                sender.last_outgoing_transfer_date = Some(shard_core::days_since_epoch(now.date_naive()));

                let negligible = !pt.coordinator.coordinator_type.eq(shard_core::coordinator_type::AGENT)
                    && committed.unsigned_abs() as f64 <= sender.negligible_amount as f64;
                if !negligible {
                    self.store.enqueue_signal(&Signal::AccountTransfer(AccountTransfer {
                        debtor_id: pt.debtor_id,
                        creditor_id: pt.sender_creditor_id,
                        other_creditor_id: pt.recipient_creditor_id,
                        committed_amount: committed,
                        transfer_note_format: fr.transfer_note_format.clone(),
                        transfer_note: fr.transfer_note.clone(),
                        committed_at: now,
                        principal_after: sender.principal + running_principal_delta,
                    }))?;
                }

                self.store.enqueue_signal(&Signal::PendingBalanceChange(PendingBalanceChangeSignal {
                    debtor_id: pt.debtor_id,
                    creditor_id: pt.recipient_creditor_id,
                    change_id: pt.transfer_id,
                    coordinator_type: pt.coordinator.coordinator_type.clone(),
                    transfer_note_format: fr.transfer_note_format.clone(),
                    transfer_note: fr.transfer_note.clone(),
                    committed_at: now,
                    principal_delta: committed,
                    other_creditor_id: pt.sender_creditor_id,
                }))?;
            }

            info!(
                debtor_id = pt.debtor_id,
                sender_creditor_id = pt.sender_creditor_id,
                transfer_id = pt.transfer_id,
                status_code,
                committed,
                "transfer finalized"
            );
        }

        if any_committed {
            self.apply_account_change(&mut sender, running_principal_delta, 0.0, now);
            self.store.put_account(&sender)?;
            self.emit_account_update(&sender)?;
        } else if counters_changed {
            self.store.put_account(&sender)?;
        }

        Ok(requests.len())
    }
}

/// §4.6: returns the first matching status code, in order.
fn calc_status_code(
    pt: &PreparedTransfer,
    committed_amount: i64,
    expendable: f64,
    sender_rate_change_ts: DateTime<Utc>,
    sender_is_root: bool,
    now: DateTime<Utc>,
) -> &'static str {
    if committed_amount == 0 {
        return shard_core::status_code::OK;
    }
    if now > pt.deadline {
        return shard_core::status_code::TIMEOUT;
    }
    if sender_rate_change_ts > pt.final_interest_rate_ts {
        return shard_core::status_code::NEWER_INTEREST_RATE;
    }

    let within_expendable = committed_amount as f64 <= expendable + pt.locked_amount as f64;
    let within_locked = committed_amount <= pt.locked_amount;
    let within_demurrage = sender_is_root || {
        let gratis = chrono::Duration::seconds(pt.gratis_period_secs);
        let elapsed = ((now - pt.prepared_at) - gratis).num_seconds().max(0) as f64;
        let k = shard_core::calc_k(pt.demurrage_rate);
        committed_amount as f64 <= pt.locked_amount as f64 * (k * elapsed).exp()
    };

    if within_expendable || (within_locked && within_demurrage) {
        shard_core::status_code::OK
    } else {
        shard_core::status_code::INSUFFICIENT_AVAILABLE_AMOUNT
    }
}
