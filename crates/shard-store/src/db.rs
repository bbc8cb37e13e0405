use std::path::Path;

use shard_core::{
    Account, AccountKey, ChangeKey, FinalizationRequest, PreparedTransfer, RegisteredBalanceChange,
    SerializationError, ShardError, ShardResult, Signal, TransferKey, TransferRequest,
};

/// Which outbox tree a [`Signal`] lands in. §3 calls for one table per
/// outbound message kind; the flusher drains each independently.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutboxKind {
    RejectedTransfer,
    PreparedTransfer,
    FinalizedTransfer,
    AccountTransfer,
    AccountUpdate,
    AccountPurge,
    RejectedConfig,
    PendingBalanceChange,
}

impl OutboxKind {
    pub fn of(signal: &Signal) -> Self {
        match signal {
            Signal::RejectedTransfer(_) => OutboxKind::RejectedTransfer,
            Signal::PreparedTransfer(_) => OutboxKind::PreparedTransfer,
            Signal::FinalizedTransfer(_) => OutboxKind::FinalizedTransfer,
            Signal::AccountTransfer(_) => OutboxKind::AccountTransfer,
            Signal::AccountUpdate(_) => OutboxKind::AccountUpdate,
            Signal::AccountPurge(_) => OutboxKind::AccountPurge,
            Signal::RejectedConfig(_) => OutboxKind::RejectedConfig,
            Signal::PendingBalanceChange(_) => OutboxKind::PendingBalanceChange,
        }
    }

    fn tree_name(self) -> &'static str {
        match self {
            OutboxKind::RejectedTransfer => "outbox_rejected_transfer",
            OutboxKind::PreparedTransfer => "outbox_prepared_transfer",
            OutboxKind::FinalizedTransfer => "outbox_finalized_transfer",
            OutboxKind::AccountTransfer => "outbox_account_transfer",
            OutboxKind::AccountUpdate => "outbox_account_update",
            OutboxKind::AccountPurge => "outbox_account_purge",
            OutboxKind::RejectedConfig => "outbox_rejected_config",
            OutboxKind::PendingBalanceChange => "outbox_pending_balance_change",
        }
    }

    pub const ALL: [OutboxKind; 8] = [
        OutboxKind::RejectedTransfer,
        OutboxKind::PreparedTransfer,
        OutboxKind::FinalizedTransfer,
        OutboxKind::AccountTransfer,
        OutboxKind::AccountUpdate,
        OutboxKind::AccountPurge,
        OutboxKind::RejectedConfig,
        OutboxKind::PendingBalanceChange,
    ];
}

/// A durably staged outbound signal, as read back by the flusher.
pub struct OutboxRow {
    pub id: u64,
    pub signal: Signal,
}

/// For I/O and CAS-mechanics failures, which are storage errors proper —
/// not the encode/decode failures `encode`/`decode` below report.
fn storage_err<E: std::fmt::Display>(e: E) -> ShardError {
    ShardError::storage(e.to_string())
}

fn encode<T: serde::Serialize>(value: &T) -> ShardResult<Vec<u8>> {
    bincode::serialize(value)
        .map_err(|e| ShardError::Serialization(SerializationError::Bincode(format!("encode: {e}"))))
}

fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> ShardResult<T> {
    bincode::deserialize(bytes)
        .map_err(|e| ShardError::Serialization(SerializationError::Bincode(format!("decode: {e}"))))
}

/// Persistent store (§4.2): a sled-backed table per entity in §3.
///
/// Named trees:
///   accounts                 — AccountKey bytes  → bincode(Account)
///   prepared_transfers       — TransferKey bytes  → bincode(PreparedTransfer)
///   transfer_requests        — (account, request_id) bytes → bincode(TransferRequest)
///   finalization_requests    — TransferKey bytes  → bincode(FinalizationRequest)
///   registered_balance_changes — ChangeKey bytes → bincode(RegisteredBalanceChange)
///   outbox_*                 — one per `OutboxKind`, auto-id → bincode(Signal)
///   meta                     — utf8 key bytes     → raw bytes
pub struct ShardDb {
    db: sled::Db,
    accounts: sled::Tree,
    prepared_transfers: sled::Tree,
    transfer_requests: sled::Tree,
    finalization_requests: sled::Tree,
    registered_balance_changes: sled::Tree,
    outboxes: Vec<sled::Tree>,
    meta: sled::Tree,
}

impl ShardDb {
    pub fn open<P: AsRef<Path>>(path: P) -> ShardResult<Self> {
        let db = sled::open(path).map_err(storage_err)?;
        let accounts = db.open_tree("accounts").map_err(storage_err)?;
        let prepared_transfers = db.open_tree("prepared_transfers").map_err(storage_err)?;
        let transfer_requests = db.open_tree("transfer_requests").map_err(storage_err)?;
        let finalization_requests = db.open_tree("finalization_requests").map_err(storage_err)?;
        let registered_balance_changes =
            db.open_tree("registered_balance_changes").map_err(storage_err)?;
        let meta = db.open_tree("meta").map_err(storage_err)?;

        let mut outboxes = Vec::with_capacity(OutboxKind::ALL.len());
        for kind in OutboxKind::ALL {
            outboxes.push(db.open_tree(kind.tree_name()).map_err(storage_err)?);
        }

        Ok(Self {
            db,
            accounts,
            prepared_transfers,
            transfer_requests,
            finalization_requests,
            registered_balance_changes,
            outboxes,
            meta,
        })
    }

    fn outbox_tree(&self, kind: OutboxKind) -> &sled::Tree {
        &self.outboxes[OutboxKind::ALL.iter().position(|k| *k == kind).unwrap()]
    }

    // ── Accounts ─────────────────────────────────────────────────────────────

    pub fn get_account(&self, key: AccountKey) -> ShardResult<Option<Account>> {
        match self.accounts.get(key.to_sled_key()).map_err(storage_err)? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn put_account(&self, account: &Account) -> ShardResult<()> {
        let key = AccountKey::new(account.debtor_id, account.creditor_id);
        self.accounts
            .insert(key.to_sled_key(), encode(account)?)
            .map_err(storage_err)?;
        Ok(())
    }

    pub fn account_exists(&self, key: AccountKey) -> bool {
        self.accounts.contains_key(key.to_sled_key()).unwrap_or(false)
    }

    /// Removes the account row outright. Only the purge scanner calls
    /// this — every other lifecycle transition keeps the row and flips
    /// `STATUS_DELETED_FLAG` instead.
    pub fn delete_account(&self, key: AccountKey) -> ShardResult<()> {
        self.accounts.remove(key.to_sled_key()).map_err(storage_err)?;
        Ok(())
    }

    // ── Prepared transfers ────────────────────────────────────────────────────

    pub fn get_prepared_transfer(&self, key: TransferKey) -> ShardResult<Option<PreparedTransfer>> {
        match self.prepared_transfers.get(key.to_sled_key()).map_err(storage_err)? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn put_prepared_transfer(&self, pt: &PreparedTransfer) -> ShardResult<()> {
        self.prepared_transfers
            .insert(pt.key().to_sled_key(), encode(pt)?)
            .map_err(storage_err)?;
        Ok(())
    }

    pub fn delete_prepared_transfer(&self, key: TransferKey) -> ShardResult<()> {
        self.prepared_transfers.remove(key.to_sled_key()).map_err(storage_err)?;
        Ok(())
    }

    /// All prepared transfers for a sender account, in primary-key order.
    pub fn iter_prepared_transfers(&self, account: AccountKey) -> ShardResult<Vec<PreparedTransfer>> {
        let prefix = account.to_sled_key();
        let mut out = Vec::new();
        for item in self.prepared_transfers.scan_prefix(prefix) {
            let (_, bytes) = item.map_err(storage_err)?;
            out.push(decode(&bytes)?);
        }
        Ok(out)
    }

    // ── Transfer request buffer ───────────────────────────────────────────────

    pub fn enqueue_transfer_request(&self, tr: &TransferRequest) -> ShardResult<()> {
        let key = TransferKey::new(tr.debtor_id, tr.sender_creditor_id, tr.transfer_request_id);
        self.transfer_requests
            .insert(key.to_sled_key(), encode(tr)?)
            .map_err(storage_err)?;
        Ok(())
    }

    pub fn delete_transfer_request(&self, debtor_id: i64, sender_creditor_id: i64, request_id: i64) -> ShardResult<()> {
        let key = TransferKey::new(debtor_id, sender_creditor_id, request_id);
        self.transfer_requests.remove(key.to_sled_key()).map_err(storage_err)?;
        Ok(())
    }

    /// Pending transfer requests for an account, in primary-key order
    /// (`FOR UPDATE SKIP LOCKED` batch drain per §4.2/§5 — the caller
    /// already holds the account's row lock by this point).
    pub fn scan_transfer_requests(&self, account: AccountKey, max_count: usize) -> ShardResult<Vec<TransferRequest>> {
        let prefix = account.to_sled_key();
        let mut out = Vec::new();
        for item in self.transfer_requests.scan_prefix(prefix) {
            if out.len() >= max_count {
                break;
            }
            let (_, bytes) = item.map_err(storage_err)?;
            out.push(decode(&bytes)?);
        }
        Ok(out)
    }

    /// Every account with at least one pending transfer request, for the
    /// worker pool's round-robin scanner (§5).
    pub fn accounts_with_pending_transfer_requests(&self) -> ShardResult<Vec<AccountKey>> {
        self.distinct_accounts(&self.transfer_requests)
    }

    // ── Finalization request buffer ───────────────────────────────────────────

    /// Inserts `fr` unless its key already has a row. A PK collision on
    /// `(debtor_id, sender_creditor_id, transfer_id)` leaves the existing
    /// row untouched rather than overwriting it, matching §4.8's
    /// idempotent-re-delivery rule for `finalize_transfer`.
    pub fn enqueue_finalization_request(&self, fr: &FinalizationRequest) -> ShardResult<()> {
        let key = TransferKey::new(fr.debtor_id, fr.sender_creditor_id, fr.transfer_id);
        let bytes = encode(fr)?;
        let _ = self
            .finalization_requests
            .compare_and_swap(key.to_sled_key(), None as Option<&[u8]>, Some(bytes))
            .map_err(storage_err)?;
        Ok(())
    }

    pub fn delete_finalization_request(&self, key: TransferKey) -> ShardResult<()> {
        self.finalization_requests.remove(key.to_sled_key()).map_err(storage_err)?;
        Ok(())
    }

    pub fn scan_finalization_requests(&self, account: AccountKey, max_count: usize) -> ShardResult<Vec<FinalizationRequest>> {
        let prefix = account.to_sled_key();
        let mut out = Vec::new();
        for item in self.finalization_requests.scan_prefix(prefix) {
            if out.len() >= max_count {
                break;
            }
            let (_, bytes) = item.map_err(storage_err)?;
            out.push(decode(&bytes)?);
        }
        Ok(out)
    }

    pub fn accounts_with_pending_finalization_requests(&self) -> ShardResult<Vec<AccountKey>> {
        self.distinct_accounts(&self.finalization_requests)
    }

    fn distinct_accounts(&self, tree: &sled::Tree) -> ShardResult<Vec<AccountKey>> {
        let mut seen = std::collections::BTreeSet::new();
        for item in tree.iter() {
            let (key_bytes, _) = item.map_err(storage_err)?;
            seen.insert(AccountKey::from_sled_key(&key_bytes));
        }
        Ok(seen.into_iter().collect())
    }

    // ── Registered balance changes ────────────────────────────────────────────

    /// Inserts the dedup record unless `key` already has one. Returns
    /// `true` if this call actually inserted (i.e. it is not a
    /// duplicate), matching the PK-collision idempotence rule of §4.7.
    pub fn register_balance_change_if_absent(&self, row: &RegisteredBalanceChange) -> ShardResult<bool> {
        let key = row.key.to_sled_key();
        let bytes = encode(row)?;
        let prev = self
            .registered_balance_changes
            .compare_and_swap(key, None as Option<&[u8]>, Some(bytes))
            .map_err(storage_err)?;
        Ok(prev.is_ok())
    }

    pub fn get_registered_balance_change(&self, key: ChangeKey) -> ShardResult<Option<RegisteredBalanceChange>> {
        match self
            .registered_balance_changes
            .get(key.to_sled_key())
            .map_err(storage_err)?
        {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn mark_balance_change_applied(&self, key: ChangeKey) -> ShardResult<()> {
        if let Some(mut row) = self.get_registered_balance_change(key)? {
            row.is_applied = true;
            self.registered_balance_changes
                .insert(key.to_sled_key(), encode(&row)?)
                .map_err(storage_err)?;
        }
        Ok(())
    }

    pub fn scan_unapplied_balance_changes(&self, max_count: usize) -> ShardResult<Vec<RegisteredBalanceChange>> {
        let mut out = Vec::new();
        for item in self.registered_balance_changes.iter() {
            if out.len() >= max_count {
                break;
            }
            let (_, bytes) = item.map_err(storage_err)?;
            let row: RegisteredBalanceChange = decode(&bytes)?;
            if !row.is_applied {
                out.push(row);
            }
        }
        Ok(out)
    }

    /// Deletes applied registered rows older than the retention window;
    /// the caller passes the cutoff already resolved from its clock.
    pub fn gc_applied_balance_changes(&self, cutoff: shard_core::Timestamp) -> ShardResult<u64> {
        let mut removed = 0;
        for item in self.registered_balance_changes.iter() {
            let (key_bytes, bytes) = item.map_err(storage_err)?;
            let row: RegisteredBalanceChange = decode(&bytes)?;
            if row.is_applied && row.committed_at < cutoff {
                self.registered_balance_changes.remove(key_bytes).map_err(storage_err)?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    // ── Outbox ────────────────────────────────────────────────────────────────

    /// Stages `signal` for delivery. Callers insert this in the same
    /// sled batch as the state change that produced it, per §4.3.
    pub fn enqueue_signal(&self, signal: &Signal) -> ShardResult<u64> {
        let tree = self.outbox_tree(OutboxKind::of(signal));
        let id = self.db.generate_id().map_err(storage_err)?;
        tree.insert(id.to_be_bytes(), encode(signal)?).map_err(storage_err)?;
        Ok(id)
    }

    /// Drains up to `burst_count` rows from one outbox kind, in
    /// insertion order, per §4.3's `signalbus_burst_count`.
    pub fn scan_outbox(&self, kind: OutboxKind, burst_count: usize) -> ShardResult<Vec<OutboxRow>> {
        let tree = self.outbox_tree(kind);
        let mut out = Vec::new();
        for item in tree.iter() {
            if out.len() >= burst_count {
                break;
            }
            let (key_bytes, bytes) = item.map_err(storage_err)?;
            let mut id_buf = [0u8; 8];
            id_buf.copy_from_slice(&key_bytes);
            out.push(OutboxRow { id: u64::from_be_bytes(id_buf), signal: decode(&bytes)? });
        }
        Ok(out)
    }

    /// Deletes a row after the broker has acked it.
    pub fn ack_signal(&self, kind: OutboxKind, id: u64) -> ShardResult<()> {
        self.outbox_tree(kind).remove(id.to_be_bytes()).map_err(storage_err)?;
        Ok(())
    }

    // ── Meta ──────────────────────────────────────────────────────────────────

    pub fn get_meta(&self, key: &str) -> ShardResult<Option<Vec<u8>>> {
        Ok(self.meta.get(key.as_bytes()).map_err(storage_err)?.map(|v| v.to_vec()))
    }

    pub fn put_meta(&self, key: &str, value: &[u8]) -> ShardResult<()> {
        self.meta.insert(key.as_bytes(), value).map_err(storage_err)?;
        Ok(())
    }

    /// Every account row, for the heartbeat/deletion/capitalization/purge
    /// scanners (§5, §4.4).
    pub fn iter_accounts(&self) -> ShardResult<Vec<Account>> {
        let mut out = Vec::new();
        for item in self.accounts.iter() {
            let (_, bytes) = item.map_err(storage_err)?;
            out.push(decode(&bytes)?);
        }
        Ok(out)
    }

    pub fn flush(&self) -> ShardResult<()> {
        self.db.flush().map_err(storage_err)?;
        Ok(())
    }
}
