use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use shard_core::{AccountKey, PreparedTransferSignal, ShardResult, Signal};
use shard_engine::ShardEngine;
use tracing::debug;

/// Re-emits `PreparedTransferSignal` for transfers that have sat prepared
/// for a while without being finalized, rate-limited by
/// `prepared_transfer_reminder_interval` (`table_scanners.py`'s reminder
/// loop; §3 carries `last_reminder_ts` but §4 doesn't spell this out).
pub struct ReminderScanner {
    engine: Arc<ShardEngine>,
}

impl ReminderScanner {
    pub fn new(engine: Arc<ShardEngine>) -> Self {
        Self { engine }
    }

    pub fn scan_once(&self, now: DateTime<Utc>) -> ShardResult<usize> {
        let interval = self.engine.config.prepared_transfer_reminder_interval;
        let mut reminded = 0;

        for account in self.engine.store.iter_accounts()? {
            let key = AccountKey::new(account.debtor_id, account.creditor_id);
            let due: Vec<_> = self
                .engine
                .store
                .iter_prepared_transfers(key)?
                .into_iter()
                .filter(|pt| is_due(pt.last_reminder_ts, pt.prepared_at, now, interval))
                .collect();
            if due.is_empty() {
                continue;
            }

            self.engine.locks.with_account_lock(key, || -> ShardResult<()> {
                for mut pt in due {
                    pt.last_reminder_ts = Some(now);
                    self.engine.store.put_prepared_transfer(&pt)?;
                    self.engine.store.enqueue_signal(&Signal::PreparedTransfer(PreparedTransferSignal {
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
                    reminded += 1;
                }
                Ok(())
            })?;
        }

        debug!(reminded, "reminder scan pass");
        Ok(reminded)
    }
}

fn is_due(last_reminder_ts: Option<DateTime<Utc>>, prepared_at: DateTime<Utc>, now: DateTime<Utc>, interval: Duration) -> bool {
    let since = last_reminder_ts.unwrap_or(prepared_at);
    now - since >= interval
}
