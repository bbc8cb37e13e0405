//! Transfer request processor (C5): drains queued `TransferRequest` rows
//! for one account, preparing or rejecting each.

use shard_core::{
    AccountKey, PreparedTransfer, PreparedTransferSignal, RejectedTransfer, ShardResult, Signal,
    AGENT_SUBNET_MASK, DEFAULT_DEMURRAGE_RATE,
};
use tracing::info;

use crate::ShardEngine;

impl ShardEngine {
    /// Processes every pending `TransferRequest` for `account`, locking it
    /// once for the whole batch per §4.5.
    pub fn process_transfer_requests(&self, account: AccountKey, now: chrono::DateTime<chrono::Utc>) -> ShardResult<usize> {
        self.locks.with_account_lock(account, || self.process_transfer_requests_locked(account, now))
    }

    fn process_transfer_requests_locked(&self, account: AccountKey, now: chrono::DateTime<chrono::Utc>) -> ShardResult<usize> {
        let requests = self.store.scan_transfer_requests(account, self.config.max_batch_count)?;
        if requests.is_empty() {
            return Ok(0);
        }

        let Some(mut sender) = self.store.get_account(account)? else {
            for tr in &requests {
                self.store.delete_transfer_request(tr.debtor_id, tr.sender_creditor_id, tr.transfer_request_id)?;
                self.reject(&tr.coordinator, 0, tr.debtor_id, tr.sender_creditor_id, now, shard_core::status_code::SENDER_IS_UNREACHABLE)?;
            }
            return Ok(requests.len());
        };

        let mut prepared_any = false;

        for tr in &requests {
            self.store.delete_transfer_request(tr.debtor_id, tr.sender_creditor_id, tr.transfer_request_id)?;

            let reject_code = self.classify_rejection(&sender, tr);
            if let Some(code) = reject_code {
                self.reject(&tr.coordinator, sender.total_locked_amount, tr.debtor_id, tr.sender_creditor_id, now, code)?;
                continue;
            }

            let min_account_balance = shard_core::min_account_balance(
                sender.creditor_id,
                sender.negligible_amount,
                &sender.config_data,
            );
            let projected = shard_core::project_balance(
                sender.principal,
                sender.interest,
                sender.interest_rate,
                sender.last_change_ts,
                now,
                sender.creditor_id,
            );
            let available = (projected.floor() - sender.total_locked_amount as f64 - min_account_balance).max(0.0);
            let amount_to_lock = available.min(tr.max_locked_amount as f64).max(0.0) as i64;

            if amount_to_lock < tr.min_locked_amount {
                self.reject(
                    &tr.coordinator,
                    sender.total_locked_amount,
                    tr.debtor_id,
                    tr.sender_creditor_id,
                    now,
                    shard_core::status_code::INSUFFICIENT_AVAILABLE_AMOUNT,
                )?;
                continue;
            }

            sender.total_locked_amount = shard_core::contain_principal(
                sender.total_locked_amount as f64 + amount_to_lock as f64,
            )
            .max(0);
            sender.pending_transfers_count += 1;
            sender.last_transfer_id += 1;
            let transfer_id = sender.last_transfer_id;

            let deadline = (now + self.config.commit_period).min(tr.deadline);

            let pt = PreparedTransfer {
                debtor_id: tr.debtor_id,
                sender_creditor_id: tr.sender_creditor_id,
                transfer_id,
                coordinator: tr.coordinator.clone(),
                recipient_creditor_id: tr.recipient_creditor_id,
                locked_amount: amount_to_lock,
                prepared_at: now,
                deadline,
                final_interest_rate_ts: tr.final_interest_rate_ts,
                demurrage_rate: DEFAULT_DEMURRAGE_RATE,
                gratis_period_secs: self.config.gratis_period.num_seconds(),
                last_reminder_ts: None,
            };
            self.store.put_prepared_transfer(&pt)?;
            self.store.enqueue_signal(&Signal::PreparedTransfer(PreparedTransferSignal {
                coordinator: pt.coordinator.clone(),
                debtor_id: pt.debtor_id,
                sender_creditor_id: pt.sender_creditor_id,
                recipient_creditor_id: pt.recipient_creditor_id,
                transfer_id: pt.transfer_id,
                locked_amount: pt.locked_amount,
                demurrage_rate: pt.demurrage_rate,
                deadline: pt.deadline,
                prepared_at: pt.prepared_at,
            }))?;
            prepared_any = true;
            info!(debtor_id = pt.debtor_id, sender_creditor_id = pt.sender_creditor_id, transfer_id, amount_to_lock, "transfer prepared");
        }

        if prepared_any {
            self.store.put_account(&sender)?;
        }

        Ok(requests.len())
    }

    /// §4.5 step 2: the ordered list of reject checks, stopping at the
    /// first hit.
    fn classify_rejection(&self, sender: &shard_core::Account, tr: &shard_core::TransferRequest) -> Option<&'static str> {
        if tr.coordinator.coordinator_type == shard_core::coordinator_type::AGENT
            && (sender.creditor_id as u64) & AGENT_SUBNET_MASK != (tr.recipient_creditor_id as u64) & AGENT_SUBNET_MASK
        {
            return Some(shard_core::status_code::RECIPIENT_IS_UNREACHABLE);
        }
        if sender.pending_transfers_count >= i32::MAX {
            return Some(shard_core::status_code::TOO_MANY_TRANSFERS);
        }
        if sender.creditor_id == tr.recipient_creditor_id {
            return Some(shard_core::status_code::RECIPIENT_SAME_AS_SENDER);
        }
        if sender.last_interest_rate_change_ts > tr.final_interest_rate_ts {
            return Some(shard_core::status_code::NEWER_INTEREST_RATE);
        }
        None
    }

    fn reject(
        &self,
        coordinator: &shard_core::CoordinatorKey,
        total_locked_amount: i64,
        debtor_id: i64,
        creditor_id: i64,
        now: chrono::DateTime<chrono::Utc>,
        status_code: &str,
    ) -> ShardResult<()> {
        self.store.enqueue_signal(&Signal::RejectedTransfer(RejectedTransfer {
            coordinator: coordinator.clone(),
            status_code: status_code.to_string(),
            total_locked_amount,
            debtor_id,
            creditor_id,
            ts: now,
        }))?;
        Ok(())
    }
}
