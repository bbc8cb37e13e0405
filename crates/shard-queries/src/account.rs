use shard_core::{project_balance, AccountKey, ShardError, ShardResult, Timestamp};
use shard_store::ShardDb;

/// Read-only diagnostics over an account, built on the already-projected
/// balance rather than a second copy of the interest formula.
pub struct AccountQuery<'a> {
    db: &'a ShardDb,
}

impl<'a> AccountQuery<'a> {
    pub fn new(db: &'a ShardDb) -> Self {
        Self { db }
    }

    /// The current balance, projected forward to `now`, floored to the
    /// same integer the transfer request processor would see.
    pub fn projected_balance(&self, key: AccountKey, now: Timestamp) -> ShardResult<i64> {
        let account = self
            .db
            .get_account(key)?
            .ok_or_else(|| ShardError::validation(format!("unknown account {key}")))?;
        let projected = project_balance(
            account.principal,
            account.interest,
            account.interest_rate,
            account.last_change_ts,
            now,
            account.creditor_id,
        );
        Ok(projected.floor() as i64)
    }

    pub fn available_amount(&self, key: AccountKey, now: Timestamp) -> ShardResult<i64> {
        let account = self
            .db
            .get_account(key)?
            .ok_or_else(|| ShardError::validation(format!("unknown account {key}")))?;
        let balance = self.projected_balance(key, now)?;
        Ok((balance - account.total_locked_amount).max(0))
    }

    /// Human-readable one-line summary.
    pub fn describe(&self, key: AccountKey, now: Timestamp) -> ShardResult<String> {
        let account = self
            .db
            .get_account(key)?
            .ok_or_else(|| ShardError::validation(format!("unknown account {key}")))?;

        let status = if account.is_deleted() {
            "deleted".to_string()
        } else if account.is_scheduled_for_deletion() {
            "scheduled for deletion".to_string()
        } else {
            "active".to_string()
        };

        let last_outgoing = account
            .last_outgoing_transfer_date
            .map(|d| format!(", last outgoing transfer on day {d}"))
            .unwrap_or_default();

        let balance = self.projected_balance(key, now)?;

        Ok(format!(
            "Account {key} | {status} | principal {} | projected balance {balance} | rate {}% | {} pending transfer(s), {} locked{last_outgoing}",
            account.principal, account.interest_rate, account.pending_transfers_count, account.total_locked_amount,
        ))
    }
}
