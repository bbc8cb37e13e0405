pub mod db;
pub mod locks;

pub use db::{OutboxKind, OutboxRow, ShardDb};
pub use locks::LockRegistry;

#[cfg(test)]
mod tests {
    use super::*;
    use shard_core::{Account, AccountKey};

    fn temp_db(name: &str) -> ShardDb {
        let dir = std::env::temp_dir().join(format!("shard_store_test_{}", name));
        let _ = std::fs::remove_dir_all(&dir);
        ShardDb::open(&dir).expect("open temp db")
    }

    #[test]
    fn put_then_get_account_round_trips() {
        let db = temp_db("put_then_get_account");
        let acc = Account::new(1, 1, 0, shard_core::epoch_ts());
        db.put_account(&acc).unwrap();

        let loaded = db.get_account(AccountKey::new(1, 1)).unwrap().unwrap();
        assert_eq!(loaded.debtor_id, 1);
        assert_eq!(loaded.creditor_id, 1);
    }

    #[test]
    fn missing_account_is_none() {
        let db = temp_db("missing_account");
        assert!(db.get_account(AccountKey::new(99, 99)).unwrap().is_none());
    }

    #[test]
    fn balance_change_dedup_by_pk() {
        use shard_core::{ChangeKey, RegisteredBalanceChange};

        let db = temp_db("balance_change_dedup");
        let row = RegisteredBalanceChange {
            key: ChangeKey { debtor_id: 1, other_creditor_id: 2, change_id: 7 },
            creditor_id: 1,
            principal_delta: 100,
            committed_at: shard_core::epoch_ts(),
            is_applied: false,
        };

        assert!(db.register_balance_change_if_absent(&row).unwrap());
        assert!(!db.register_balance_change_if_absent(&row).unwrap());
    }

    #[test]
    fn finalization_request_dedup_by_pk() {
        use shard_core::{CoordinatorKey, FinalizationRequest};

        let db = temp_db("finalization_request_dedup");
        let fr = FinalizationRequest {
            debtor_id: 1,
            sender_creditor_id: 2,
            transfer_id: 7,
            coordinator: CoordinatorKey { coordinator_type: "direct".into(), coordinator_id: 1, coordinator_request_id: 1 },
            committed_amount: 100,
            transfer_note_format: String::new(),
            transfer_note: String::new(),
            ignore_all: false,
        };
        let retry = FinalizationRequest { committed_amount: 999, ..fr.clone() };

        db.enqueue_finalization_request(&fr).unwrap();
        db.enqueue_finalization_request(&retry).unwrap();

        let account = AccountKey::new(1, 2);
        let rows = db.scan_finalization_requests(account, 10).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].committed_amount, 100, "PK collision must not overwrite the first row");
    }

    #[test]
    fn lock_registry_serializes_same_key() {
        use std::sync::Arc;
        use std::sync::atomic::{AtomicUsize, Ordering};

        let registry = Arc::new(LockRegistry::new());
        let counter = Arc::new(AtomicUsize::new(0));
        let key = AccountKey::new(1, 1);

        let mut handles = Vec::new();
        for _ in 0..8 {
            let registry = registry.clone();
            let counter = counter.clone();
            handles.push(std::thread::spawn(move || {
                registry.with_account_lock(key, || {
                    let before = counter.fetch_add(1, Ordering::SeqCst);
                    assert_eq!(before, 0, "overlapping access to locked key");
                    std::thread::sleep(std::time::Duration::from_millis(5));
                    counter.fetch_sub(1, Ordering::SeqCst);
                });
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
    }
}
