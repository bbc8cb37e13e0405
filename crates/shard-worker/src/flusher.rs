use std::sync::Arc;

use shard_core::ShardResult;
use shard_store::{OutboxKind, ShardDb};
use tracing::{debug, warn};

use crate::broker::OutboxBroker;

/// Drains the outbox tables into the broker (§4.3). Ack-gated: a signal's
/// row is only removed once `publish` returns `Ok`, so a broker outage
/// just pauses delivery rather than losing anything.
pub struct OutboxFlusher {
    store: Arc<ShardDb>,
    broker: Arc<dyn OutboxBroker>,
    burst_count: usize,
}

impl OutboxFlusher {
    pub fn new(store: Arc<ShardDb>, broker: Arc<dyn OutboxBroker>, burst_count: usize) -> Self {
        Self { store, broker, burst_count }
    }

    /// One pass over every outbox kind. Returns the number of signals
    /// successfully published and acked.
    pub fn flush_once(&self) -> ShardResult<usize> {
        let mut flushed = 0;
        for kind in OutboxKind::ALL {
            flushed += self.flush_kind(kind)?;
        }
        Ok(flushed)
    }

    fn flush_kind(&self, kind: OutboxKind) -> ShardResult<usize> {
        let rows = self.store.scan_outbox(kind, self.burst_count)?;
        let mut flushed = 0;
        for row in rows {
            match self.broker.publish(&row.signal) {
                Ok(()) => {
                    self.store.ack_signal(kind, row.id)?;
                    flushed += 1;
                }
                Err(e) => {
                    warn!(?kind, id = row.id, error = %e, "broker publish failed, will retry");
                    break;
                }
            }
        }
        debug!(?kind, flushed, "outbox flush pass");
        Ok(flushed)
    }
}
