use shard_core::{Signal, ShardResult};

/// The AMQP publisher the flusher drains into. An out-of-scope external
/// collaborator (§ "Out of scope"); this is the seam this crate calls
/// through, not an implementation of a broker client.
pub trait OutboxBroker: Send + Sync {
    fn publish(&self, signal: &Signal) -> ShardResult<()>;
}

/// Discards every signal after logging it. Useful for dry runs and tests;
/// never the right choice in a deployed node.
pub struct LoggingBroker;

impl OutboxBroker for LoggingBroker {
    fn publish(&self, signal: &Signal) -> ShardResult<()> {
        let route = signal.route();
        tracing::debug!(exchange = route.exchange, routing_key = %route.routing_key, "publishing signal");
        Ok(())
    }
}
