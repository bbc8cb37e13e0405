use std::sync::Arc;

use chrono::{DateTime, Utc};
use shard_core::ShardResult;
use shard_engine::ShardEngine;
use tracing::debug;

/// Round-robin enumeration of `(debtor_id, creditor_id)` pairs with
/// pending transfer-request or finalization-request rows, driving C5/C6
/// (§5's "fairness comes from the scanner's round-robin enumeration").
pub struct RequestScanner {
    engine: Arc<ShardEngine>,
}

impl RequestScanner {
    pub fn new(engine: Arc<ShardEngine>) -> Self {
        Self { engine }
    }

    /// One round: every account with a pending transfer request is
    /// drained through C5, then every account with a pending
    /// finalization request through C6. Returns the total rows processed.
    pub fn scan_once(&self, now: DateTime<Utc>) -> ShardResult<usize> {
        let mut processed = 0;

        for account in self.engine.store.accounts_with_pending_transfer_requests()? {
            processed += self.engine.process_transfer_requests(account, now)?;
        }
        for account in self.engine.store.accounts_with_pending_finalization_requests()? {
            processed += self.engine.process_finalization_requests(account, now)?;
        }

        debug!(processed, "request scan pass");
        Ok(processed)
    }
}

/// Drains `PendingBalanceChange` rows into their recipient accounts (C7).
pub struct BalanceChangeApplier {
    engine: Arc<ShardEngine>,
}

impl BalanceChangeApplier {
    pub fn new(engine: Arc<ShardEngine>) -> Self {
        Self { engine }
    }

    pub fn apply_once(&self, now: DateTime<Utc>) -> ShardResult<usize> {
        self.engine.apply_pending_balance_changes(now, self.engine.config.max_batch_count)
    }

    pub fn gc_once(&self, now: DateTime<Utc>, retention: chrono::Duration) -> ShardResult<u64> {
        self.engine.gc_stale_balance_changes(now, retention)
    }
}
