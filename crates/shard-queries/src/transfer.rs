use shard_core::{AccountKey, ShardResult, Timestamp, TransferKey};
use shard_store::{OutboxKind, ShardDb};

/// Read-only diagnostics over prepared transfers and the outbox backlog.
pub struct TransferQuery<'a> {
    db: &'a ShardDb,
}

impl<'a> TransferQuery<'a> {
    pub fn new(db: &'a ShardDb) -> Self {
        Self { db }
    }

    pub fn is_prepared(&self, key: TransferKey) -> ShardResult<bool> {
        Ok(self.db.get_prepared_transfer(key)?.is_some())
    }

    /// Seconds remaining before the prepared transfer's deadline passes,
    /// negative once it has timed out.
    pub fn seconds_until_deadline(&self, key: TransferKey, now: Timestamp) -> ShardResult<Option<i64>> {
        Ok(self
            .db
            .get_prepared_transfer(key)?
            .map(|pt| (pt.deadline - now).num_seconds()))
    }

    pub fn describe(&self, key: TransferKey, now: Timestamp) -> ShardResult<String> {
        match self.db.get_prepared_transfer(key)? {
            None => Ok(format!("Transfer {key} | not prepared")),
            Some(pt) => {
                let remaining = (pt.deadline - now).num_seconds();
                let status = if remaining < 0 { "expired" } else { "pending finalization" };
                Ok(format!(
                    "Transfer {key} | {status} | locked {} to creditor {} | {remaining}s until deadline",
                    pt.locked_amount, pt.recipient_creditor_id,
                ))
            }
        }
    }

    /// How many prepared transfers an account is carrying, for operator
    /// visibility into `try_to_delete_account`'s eligibility check.
    pub fn prepared_count(&self, account: AccountKey) -> ShardResult<usize> {
        Ok(self.db.iter_prepared_transfers(account)?.len())
    }

    /// Rows currently staged in one outbox table, awaiting the flusher.
    pub fn outbox_backlog(&self, kind: OutboxKind) -> ShardResult<usize> {
        Ok(self.db.scan_outbox(kind, usize::MAX)?.len())
    }

    /// Backlog across every outbox table, in declaration order.
    pub fn outbox_backlog_summary(&self) -> ShardResult<Vec<(OutboxKind, usize)>> {
        OutboxKind::ALL.iter().map(|kind| Ok((*kind, self.outbox_backlog(*kind)?))).collect()
    }
}
