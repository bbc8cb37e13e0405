//! Coordination surface (C8): the enqueue-side API the message layer and
//! the table scanner call. §4.8.

use chrono::{DateTime, Utc};
use shard_core::{CoordinatorKey, FinalizationRequest, ShardError, ShardResult, TransferRequest};

use crate::ShardEngine;

impl ShardEngine {
    /// §7 "fatal errors (shard-ownership mismatch)": every entry point
    /// that takes an account key from the outside checks the sender's
    /// `creditor_id` against `SHARDING_REALM` first. A mismatch means the
    /// message router sent this shard work it doesn't own — not
    /// retryable, not a business rejection, just wrong.
    pub(crate) fn check_ownership(&self, creditor_id: i64) -> ShardResult<()> {
        match &self.config.sharding_realm {
            Some(realm) if !realm.owns(creditor_id) => {
                Err(ShardError::fatal(format!("creditor_id {creditor_id} is outside this shard's realm")))
            }
            _ => Ok(()),
        }
    }

    /// Appends a `TransferRequest` row; C5 picks it up on its next pass
    /// over `(debtor_id, sender_creditor_id)`.
    #[allow(clippy::too_many_arguments)]
    pub fn prepare_transfer(
        &self,
        coordinator: CoordinatorKey,
        transfer_request_id: i64,
        debtor_id: i64,
        sender_creditor_id: i64,
        recipient_creditor_id: i64,
        min_locked_amount: i64,
        max_locked_amount: i64,
        final_interest_rate_ts: DateTime<Utc>,
        max_commit_delay_secs: i64,
        ts: DateTime<Utc>,
    ) -> ShardResult<()> {
        self.check_ownership(sender_creditor_id)?;
        let request = TransferRequest {
            debtor_id,
            sender_creditor_id,
            transfer_request_id,
            coordinator,
            recipient_creditor_id,
            min_locked_amount,
            max_locked_amount,
            final_interest_rate_ts,
            max_commit_delay_secs,
            deadline: ts + chrono::Duration::seconds(max_commit_delay_secs),
        };
        self.store.enqueue_transfer_request(&request)
    }

    /// Appends a `FinalizationRequest` row. A PK collision on
    /// `(debtor_id, sender_creditor_id, transfer_id)` is a silent no-op
    /// (idempotent re-delivery), matching §4.8's table.
    #[allow(clippy::too_many_arguments)]
    pub fn finalize_transfer(
        &self,
        coordinator: CoordinatorKey,
        debtor_id: i64,
        sender_creditor_id: i64,
        transfer_id: i64,
        committed_amount: i64,
        transfer_note_format: String,
        transfer_note: String,
        ignore_all: bool,
    ) -> ShardResult<()> {
        let request = FinalizationRequest {
            debtor_id,
            sender_creditor_id,
            transfer_id,
            coordinator,
            committed_amount,
            transfer_note_format,
            transfer_note,
            ignore_all,
        };
        self.store.enqueue_finalization_request(&request)
    }
}
