use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use shard_core::ShardResult;
use shard_engine::ShardEngine;
use tracing::debug;

/// The periodic account-lifecycle sweep (§4.4's rate-limited operations,
/// outside the prepare/finalize hot path): heartbeat, capitalization,
/// deletion attempts, and the purge of long-deleted accounts.
pub struct LifecycleScanner {
    engine: Arc<ShardEngine>,
    purge_grace_period: Duration,
}

impl LifecycleScanner {
    pub fn new(engine: Arc<ShardEngine>, purge_grace_period: Duration) -> Self {
        Self { engine, purge_grace_period }
    }

    pub fn scan_heartbeat(&self, now: DateTime<Utc>) -> ShardResult<usize> {
        let emitted = self.engine.run_heartbeat_scan(now)?;
        debug!(emitted, "heartbeat scan pass");
        Ok(emitted)
    }

    /// Walks every account and attempts capitalization where its
    /// `min_capitalization_interval` has elapsed; `capitalize_interest`
    /// itself is the rate limiter, this just enumerates candidates.
    pub fn scan_capitalize(&self, now: DateTime<Utc>) -> ShardResult<usize> {
        let mut capitalized = 0;
        for account in self.engine.store.iter_accounts()? {
            if account.is_root() || account.is_deleted() {
                continue;
            }
            if self.engine.capitalize_interest(account.debtor_id, account.creditor_id, now)? {
                capitalized += 1;
            }
        }
        debug!(capitalized, "capitalization scan pass");
        Ok(capitalized)
    }

    pub fn scan_delete(&self, now: DateTime<Utc>) -> ShardResult<usize> {
        let mut deleted = 0;
        for account in self.engine.store.iter_accounts()? {
            if account.is_root() || account.is_deleted() || !account.is_scheduled_for_deletion() {
                continue;
            }
            if self.engine.try_to_delete_account(account.debtor_id, account.creditor_id, now)? {
                deleted += 1;
            }
        }
        debug!(deleted, "deletion scan pass");
        Ok(deleted)
    }

    pub fn scan_purge(&self, now: DateTime<Utc>) -> ShardResult<usize> {
        self.engine.purge_deleted_accounts(now, self.purge_grace_period)
    }
}
