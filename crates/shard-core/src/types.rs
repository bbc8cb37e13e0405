use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies the debtor a shard of accounts belongs to.
pub type DebtorId = i64;

/// Identifies a single account under a debtor. Creditor `0` is the
/// debtor's own account (the issuer).
pub type CreditorId = i64;

/// Per-account sequence number assigned to a prepared transfer.
pub type TransferId = i64;

/// Monotonically assigned id of a row in a request buffer table.
pub type RequestId = i64;

/// Wall-clock instant, always UTC.
pub type Timestamp = DateTime<Utc>;

/// The special creditor id denoting the debtor's own (issuing) account.
pub const ROOT_CREDITOR_ID: CreditorId = 0;

// ── AccountKey ──────────────────────────────────────────────────────────────

/// The sharding key: `(debtor_id, creditor_id)`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountKey {
    pub debtor_id: DebtorId,
    pub creditor_id: CreditorId,
}

impl AccountKey {
    pub fn new(debtor_id: DebtorId, creditor_id: CreditorId) -> Self {
        Self { debtor_id, creditor_id }
    }

    pub fn is_root(&self) -> bool {
        self.creditor_id == ROOT_CREDITOR_ID
    }

    /// Byte encoding used as the sled key: big-endian so lexicographic
    /// order on the tree matches numeric order on `(debtor_id, creditor_id)`.
    pub fn to_sled_key(&self) -> [u8; 16] {
        let mut buf = [0u8; 16];
        buf[..8].copy_from_slice(&self.debtor_id.to_be_bytes());
        buf[8..].copy_from_slice(&self.creditor_id.to_be_bytes());
        buf
    }

    pub fn from_sled_key(bytes: &[u8]) -> Self {
        let mut d = [0u8; 8];
        let mut c = [0u8; 8];
        d.copy_from_slice(&bytes[..8]);
        c.copy_from_slice(&bytes[8..16]);
        Self { debtor_id: i64::from_be_bytes(d), creditor_id: i64::from_be_bytes(c) }
    }
}

impl fmt::Debug for AccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.debtor_id, self.creditor_id)
    }
}

impl fmt::Display for AccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.debtor_id, self.creditor_id)
    }
}

// ── TransferKey ───────────────────────────────────────────────────────────────

/// Identifies a `PreparedTransfer`: `(debtor_id, sender_creditor_id, transfer_id)`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Debug)]
pub struct TransferKey {
    pub account: AccountKey,
    pub transfer_id: TransferId,
}

impl TransferKey {
    pub fn new(debtor_id: DebtorId, sender_creditor_id: CreditorId, transfer_id: TransferId) -> Self {
        Self { account: AccountKey::new(debtor_id, sender_creditor_id), transfer_id }
    }

    pub fn to_sled_key(&self) -> [u8; 24] {
        let mut buf = [0u8; 24];
        buf[..16].copy_from_slice(&self.account.to_sled_key());
        buf[16..].copy_from_slice(&self.transfer_id.to_be_bytes());
        buf
    }
}

impl fmt::Display for TransferKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.account, self.transfer_id)
    }
}

// ── CoordinatorKey ──────────────────────────────────────────────────────────

/// Identifies the external subsystem that requested a transfer and is
/// responsible for finalizing it.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Debug)]
pub struct CoordinatorKey {
    pub coordinator_type: String,
    pub coordinator_id: i64,
    pub coordinator_request_id: i64,
}

// ── ChangeKey ─────────────────────────────────────────────────────────────────

/// Deduplication key for an incoming `PendingBalanceChange`:
/// `(debtor_id, other_creditor_id, change_id)`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Debug)]
pub struct ChangeKey {
    pub debtor_id: DebtorId,
    pub other_creditor_id: CreditorId,
    pub change_id: i64,
}

impl ChangeKey {
    pub fn to_sled_key(&self) -> [u8; 24] {
        let mut buf = [0u8; 24];
        buf[..8].copy_from_slice(&self.debtor_id.to_be_bytes());
        buf[8..16].copy_from_slice(&self.other_creditor_id.to_be_bytes());
        buf[16..].copy_from_slice(&self.change_id.to_be_bytes());
        buf
    }
}

/// A calendar day, used for `creation_date` and the purge day-gap rule.
pub fn days_since_epoch(date: NaiveDate) -> i64 {
    date.signed_duration_since(NaiveDate::from_ymd_opt(1970, 1, 1).unwrap())
        .num_days()
}

pub fn epoch_ts() -> Timestamp {
    DateTime::<Utc>::from_timestamp(0, 0).unwrap()
}
