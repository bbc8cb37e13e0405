use std::sync::Arc;
use std::time::Duration as StdDuration;

use tracing::warn;

use crate::broker::OutboxBroker;
use crate::flusher::OutboxFlusher;
use crate::lifecycle_scan::LifecycleScanner;
use crate::reminder::ReminderScanner;
use crate::scanner::{BalanceChangeApplier, RequestScanner};
use shard_engine::ShardEngine;

/// A fixed-size pool of cooperative worker tasks (§5): one tokio task per
/// scan kind, each on its own interval, all driven off the same engine
/// and so serialized per-account only through `LockRegistry`.
pub struct WorkerPool {
    engine: Arc<ShardEngine>,
    broker: Arc<dyn OutboxBroker>,
}

impl WorkerPool {
    pub fn new(engine: Arc<ShardEngine>, broker: Arc<dyn OutboxBroker>) -> Self {
        Self { engine, broker }
    }

    /// Spawns the pool's tasks and returns immediately; the caller holds
    /// the returned handles to shut down or await panics.
    pub fn spawn(&self, tick: StdDuration) -> Vec<tokio::task::JoinHandle<()>> {
        let mut handles = Vec::new();

        let request_scanner = RequestScanner::new(Arc::clone(&self.engine));
        handles.push(tokio::spawn(run_periodically(tick, move || {
            request_scanner.scan_once(chrono::Utc::now())
        })));

        let applier = BalanceChangeApplier::new(Arc::clone(&self.engine));
        handles.push(tokio::spawn(run_periodically(tick, move || {
            applier.apply_once(chrono::Utc::now())
        })));

        let lifecycle = LifecycleScanner::new(Arc::clone(&self.engine), chrono::Duration::days(3));
        let lifecycle_tick = tick * 10;
        handles.push(tokio::spawn(run_periodically(lifecycle_tick, move || {
            let now = chrono::Utc::now();
            lifecycle.scan_heartbeat(now)?;
            lifecycle.scan_capitalize(now)?;
            lifecycle.scan_delete(now)?;
            lifecycle.scan_purge(now)
        })));

        let reminder = ReminderScanner::new(Arc::clone(&self.engine));
        handles.push(tokio::spawn(run_periodically(lifecycle_tick, move || {
            reminder.scan_once(chrono::Utc::now())
        })));

        let flusher = OutboxFlusher::new(Arc::clone(&self.engine.store), Arc::clone(&self.broker), 100);
        handles.push(tokio::spawn(run_periodically(tick, move || flusher.flush_once())));

        handles
    }
}

async fn run_periodically<F, T>(period: StdDuration, mut pass: F)
where
    F: FnMut() -> shard_core::ShardResult<T> + Send + 'static,
    T: Send + 'static,
{
    let mut interval = tokio::time::interval(period);
    loop {
        interval.tick().await;
        if let Err(e) = pass() {
            warn!(error = %e, "scan pass failed");
        }
    }
}
