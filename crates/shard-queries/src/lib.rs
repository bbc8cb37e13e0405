pub mod account;
pub mod transfer;

pub use account::AccountQuery;
pub use transfer::TransferQuery;

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use shard_core::{Account, AccountKey};
    use shard_store::ShardDb;

    use crate::AccountQuery;

    fn temp_db(name: &str) -> ShardDb {
        let dir = std::env::temp_dir().join(format!("shard_queries_test_{}", name));
        let _ = std::fs::remove_dir_all(&dir);
        ShardDb::open(&dir).expect("open temp db")
    }

    #[test]
    fn describe_reports_active_account_with_locked_amount() {
        let db = temp_db("describe_active");
        let now = Utc.timestamp_opt(1_000_000, 0).unwrap();
        let mut account = Account::new(-1, 1, 0, now);
        account.principal = 100;
        account.total_locked_amount = 40;
        account.pending_transfers_count = 1;
        db.put_account(&account).unwrap();

        let query = AccountQuery::new(&db);
        let description = query.describe(AccountKey::new(-1, 1), now).unwrap();
        assert!(description.contains("active"));
        assert!(description.contains("1 pending transfer"));

        let available = query.available_amount(AccountKey::new(-1, 1), now).unwrap();
        assert_eq!(available, 60);
    }

    #[test]
    fn describe_unknown_account_is_an_error() {
        let db = temp_db("describe_unknown");
        let now = Utc.timestamp_opt(1_000_000, 0).unwrap();
        let query = AccountQuery::new(&db);
        assert!(query.describe(AccountKey::new(-1, 1), now).is_err());
    }
}
