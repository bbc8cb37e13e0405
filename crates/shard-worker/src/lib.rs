pub mod broker;
pub mod flusher;
pub mod lifecycle_scan;
pub mod pool;
pub mod reminder;
pub mod scanner;

pub use broker::{LoggingBroker, OutboxBroker};
pub use flusher::OutboxFlusher;
pub use lifecycle_scan::LifecycleScanner;
pub use pool::WorkerPool;
pub use reminder::ReminderScanner;
pub use scanner::{BalanceChangeApplier, RequestScanner};

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::{TimeZone, Utc};
    use shard_core::{CoordinatorKey, Signal};
    use shard_engine::{EngineConfig, ShardEngine};
    use shard_store::{LockRegistry, ShardDb};

    use crate::broker::OutboxBroker;
    use crate::flusher::OutboxFlusher;
    use crate::scanner::RequestScanner;

    fn temp_engine(name: &str) -> ShardEngine {
        let dir = std::env::temp_dir().join(format!("shard_worker_test_{}", name));
        let _ = std::fs::remove_dir_all(&dir);
        let store = Arc::new(ShardDb::open(&dir).expect("open temp db"));
        let locks = Arc::new(LockRegistry::new());
        ShardEngine::new(store, locks, EngineConfig::default())
    }

    struct CountingBroker {
        count: AtomicUsize,
        seen: Mutex<Vec<Signal>>,
    }

    impl OutboxBroker for CountingBroker {
        fn publish(&self, signal: &Signal) -> shard_core::ShardResult<()> {
            self.count.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(signal.clone());
            Ok(())
        }
    }

    #[test]
    fn flusher_drains_and_acks_enqueued_signals() {
        let engine = temp_engine("flusher_drains");
        let now = Utc.timestamp_opt(1_000_000, 0).unwrap();

        engine
            .configure_account(-1, 1, now, 1, 0.0, 0, String::new(), now)
            .unwrap();

        let broker = Arc::new(CountingBroker { count: AtomicUsize::new(0), seen: Mutex::new(Vec::new()) });
        let flusher = OutboxFlusher::new(Arc::clone(&engine.store), broker.clone() as Arc<dyn OutboxBroker>, 100);

        let flushed = flusher.flush_once().unwrap();
        assert!(flushed >= 1);
        assert_eq!(broker.count.load(Ordering::SeqCst), flushed);

        let second_pass = flusher.flush_once().unwrap();
        assert_eq!(second_pass, 0);
    }

    #[test]
    fn request_scanner_prepares_and_rejects_in_one_pass() {
        let engine = Arc::new(temp_engine("request_scanner"));
        let now = Utc.timestamp_opt(2_000_000, 0).unwrap();

        engine.configure_account(-1, 1, now, 1, 0.0, 0, String::new(), now).unwrap();
        {
            let mut account = engine.store.get_account(shard_core::AccountKey::new(-1, 1)).unwrap().unwrap();
            account.principal = 50;
            engine.store.put_account(&account).unwrap();
        }

        let coordinator = CoordinatorKey { coordinator_type: "test".into(), coordinator_id: 1, coordinator_request_id: 1 };
        engine
            .prepare_transfer(coordinator, 1, -1, 1, 1234, 1, 200, now, 86_400, now)
            .unwrap();

        let scanner = RequestScanner::new(Arc::clone(&engine));
        let processed = scanner.scan_once(now).unwrap();
        assert_eq!(processed, 1);

        let account = engine.store.get_account(shard_core::AccountKey::new(-1, 1)).unwrap().unwrap();
        assert_eq!(account.total_locked_amount, 50);
    }
}
