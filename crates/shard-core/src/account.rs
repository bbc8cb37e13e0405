//! On-disk row types for the shard's entities (§3): [`Account`],
//! [`PreparedTransfer`], the request buffers, and the balance-change rows.

use serde::{Deserialize, Serialize};

use crate::constants::{
    CONFIG_SCHEDULED_FOR_DELETION_FLAG, STATUS_DELETED_FLAG,
    STATUS_ESTABLISHED_INTEREST_RATE_FLAG, STATUS_OVERFLOWN_FLAG, STATUS_UNREACHABLE_FLAG,
};
use crate::types::{ChangeKey, CoordinatorKey, CreditorId, DebtorId, Timestamp, TransferId};

// ── Account ───────────────────────────────────────────────────────────────────

/// Full state of one account, keyed by `(debtor_id, creditor_id)`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Account {
    pub debtor_id: DebtorId,
    pub creditor_id: CreditorId,

    pub creation_date: i64,
    /// 32-bit, wrapping: overflow wraps from `2^31-1` to `-2^31`.
    pub last_change_seqnum: i32,
    pub last_change_ts: Timestamp,

    pub principal: i64,
    pub interest: f64,
    pub interest_rate: f32,
    pub previous_interest_rate: f32,
    pub last_interest_rate_change_ts: Timestamp,

    pub last_config_ts: Timestamp,
    pub last_config_seqnum: i32,
    pub negligible_amount: f32,
    pub config_flags: i32,
    pub config_data: String,

    pub total_locked_amount: i64,
    pub pending_transfers_count: i32,
    pub last_transfer_id: i64,
    pub last_transfer_number: i64,
    pub last_transfer_committed_at: Timestamp,

    /// `last_outgoing_transfer_date`, carried from the original service
    /// so lifecycle diagnostics can report it without a second scan.
    pub last_outgoing_transfer_date: Option<i64>,

    pub status_flags: i32,

    pub last_heartbeat_ts: Timestamp,
    pub last_interest_capitalization_ts: Timestamp,
    pub last_deletion_attempt_ts: Timestamp,
    pub pending_account_update: bool,
}

impl Account {
    /// A brand-new account as `lock_or_create_account` (§4.4 step 2)
    /// inserts it: all-zero balances, `last_transfer_id` seeded from the
    /// creation date so ids never collide across a purge/recreate cycle.
    pub fn new(debtor_id: DebtorId, creditor_id: CreditorId, creation_date: i64, now: Timestamp) -> Self {
        let epoch = crate::types::epoch_ts();
        Self {
            debtor_id,
            creditor_id,
            creation_date,
            last_change_seqnum: 0,
            last_change_ts: now,
            principal: 0,
            interest: 0.0,
            interest_rate: 0.0,
            previous_interest_rate: 0.0,
            last_interest_rate_change_ts: epoch,
            last_config_ts: epoch,
            last_config_seqnum: 0,
            negligible_amount: 0.0,
            config_flags: 0,
            config_data: String::new(),
            total_locked_amount: 0,
            pending_transfers_count: 0,
            last_transfer_id: creation_date << 40,
            last_transfer_number: 0,
            last_transfer_committed_at: epoch,
            last_outgoing_transfer_date: None,
            status_flags: 0,
            last_heartbeat_ts: now,
            last_interest_capitalization_ts: epoch,
            last_deletion_attempt_ts: epoch,
            pending_account_update: false,
        }
    }

    pub fn is_root(&self) -> bool {
        self.creditor_id == crate::types::ROOT_CREDITOR_ID
    }

    pub fn is_deleted(&self) -> bool {
        self.status_flags & STATUS_DELETED_FLAG != 0
    }

    pub fn is_overflown(&self) -> bool {
        self.status_flags & STATUS_OVERFLOWN_FLAG != 0
    }

    pub fn has_established_interest_rate(&self) -> bool {
        self.status_flags & STATUS_ESTABLISHED_INTEREST_RATE_FLAG != 0
    }

    pub fn is_unreachable(&self) -> bool {
        self.status_flags & STATUS_UNREACHABLE_FLAG != 0
    }

    pub fn is_scheduled_for_deletion(&self) -> bool {
        self.config_flags & CONFIG_SCHEDULED_FOR_DELETION_FLAG != 0
    }

    pub fn set_flag(&mut self, flag: i32, on: bool) {
        if on {
            self.status_flags |= flag;
        } else {
            self.status_flags &= !flag;
        }
    }

    /// Bump `last_change_seqnum`, wrapping `2^31-1 -> -2^31` per §3.
    pub fn bump_seqnum(&mut self) {
        self.last_change_seqnum = self.last_change_seqnum.wrapping_add(1);
    }
}

// ── PreparedTransfer ────────────────────────────────────────────────────────

/// A reservation of sender funds awaiting finalization. Keyed by
/// `(debtor_id, sender_creditor_id, transfer_id)`; cascades with its
/// owning [`Account`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PreparedTransfer {
    pub debtor_id: DebtorId,
    pub sender_creditor_id: CreditorId,
    pub transfer_id: TransferId,

    pub coordinator: CoordinatorKey,
    pub recipient_creditor_id: CreditorId,
    pub locked_amount: i64,
    pub prepared_at: Timestamp,
    pub deadline: Timestamp,
    pub final_interest_rate_ts: Timestamp,
    /// Annual rate in `(-100, 0]` applied to the locked amount while
    /// prepared, absent explicit negotiation (`DEFAULT_DEMURRAGE_RATE`).
    pub demurrage_rate: f32,
    /// Grace window after `prepared_at` before demurrage erodes the
    /// locked amount in the finalization insufficient-funds check.
    pub gratis_period_secs: i64,
    pub last_reminder_ts: Option<Timestamp>,
}

impl PreparedTransfer {
    pub fn key(&self) -> crate::types::TransferKey {
        crate::types::TransferKey::new(self.debtor_id, self.sender_creditor_id, self.transfer_id)
    }
}

// ── TransferRequest buffer ────────────────────────────────────────────────────

/// A queued request awaiting the transfer request processor (C5). Keyed
/// by `(debtor_id, sender_creditor_id, transfer_request_id)`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransferRequest {
    pub debtor_id: DebtorId,
    pub sender_creditor_id: CreditorId,
    pub transfer_request_id: i64,

    pub coordinator: CoordinatorKey,
    pub recipient_creditor_id: CreditorId,
    pub min_locked_amount: i64,
    pub max_locked_amount: i64,
    pub final_interest_rate_ts: Timestamp,
    pub max_commit_delay_secs: i64,
    pub deadline: Timestamp,
}

// ── FinalizationRequest buffer ────────────────────────────────────────────────

/// A queued finalize directive awaiting the finalization processor (C6).
/// Keyed by `(debtor_id, sender_creditor_id, transfer_id)`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FinalizationRequest {
    pub debtor_id: DebtorId,
    pub sender_creditor_id: CreditorId,
    pub transfer_id: TransferId,

    pub coordinator: CoordinatorKey,
    pub committed_amount: i64,
    pub transfer_note_format: String,
    pub transfer_note: String,
    /// Shard-split case (§6 `DELETE_PARENT_SHARD_RECORDS`): the request
    /// is for an account this (child) shard does not own; skip silently.
    pub ignore_all: bool,
}

// ── Balance changes ───────────────────────────────────────────────────────────

/// An inbound delta awaiting application by C7.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PendingBalanceChange {
    pub debtor_id: DebtorId,
    pub creditor_id: CreditorId,
    pub change_id: i64,
    pub coordinator_type: String,
    pub transfer_note_format: String,
    pub transfer_note: String,
    pub committed_at: Timestamp,
    pub principal_delta: i64,
    pub other_creditor_id: CreditorId,
}

/// Dedup record for a [`PendingBalanceChange`], keyed by
/// `(debtor_id, other_creditor_id, change_id)`. A PK collision on insert
/// is the idempotence mechanism: the second attempt is a silent no-op.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RegisteredBalanceChange {
    pub key: ChangeKey,
    pub creditor_id: CreditorId,
    pub principal_delta: i64,
    pub committed_at: Timestamp,
    pub is_applied: bool,
}
