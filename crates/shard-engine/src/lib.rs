pub mod balance_change;
pub mod config;
pub mod coordination;
pub mod finalize;
pub mod lifecycle;
pub mod transfer;

pub use config::{EngineConfig, ShardingRealm};

use std::sync::Arc;

use shard_store::{LockRegistry, ShardDb};

/// The engine ties the persistent store to the row-lock registry and the
/// tunables of §6. C4 (lifecycle), C5 (transfer requests), C6
/// (finalization), and C7 (balance changes) are all methods on this
/// type; C8 (`coordination`) is the thin public surface other layers
/// call, built on top of the rest.
pub struct ShardEngine {
    pub store: Arc<ShardDb>,
    pub locks: Arc<LockRegistry>,
    pub config: EngineConfig,
}

impl ShardEngine {
    pub fn new(store: Arc<ShardDb>, locks: Arc<LockRegistry>, config: EngineConfig) -> Self {
        Self { store, locks, config }
    }
}

#[cfg(test)]
mod tests;

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub fn temp_engine(name: &str) -> ShardEngine {
        let dir = std::env::temp_dir().join(format!("shard_engine_test_{}", name));
        let _ = std::fs::remove_dir_all(&dir);
        let store = Arc::new(ShardDb::open(&dir).expect("open temp db"));
        let locks = Arc::new(LockRegistry::new());
        ShardEngine::new(store, locks, EngineConfig::default())
    }
}
