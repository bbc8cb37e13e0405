//! In-process row-lock registry emulating `SELECT … FOR UPDATE` (§4.2/§5)
//! over sled, which has no row-granularity locking of its own.
//!
//! One [`AccountKey`] maps to one mutex. All of C5/C6/C7's work on an
//! account happens inside [`LockRegistry::with_account_lock`], so it
//! serializes the same way concurrent `SELECT … FOR UPDATE` transactions
//! would against a row-locking SQL engine.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use shard_core::AccountKey;

#[derive(Default)]
pub struct LockRegistry {
    locks: Mutex<HashMap<AccountKey, Arc<Mutex<()>>>>,
}

impl LockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, key: AccountKey) -> Arc<Mutex<()>> {
        let mut map = self.locks.lock().expect("lock registry poisoned");
        map.entry(key).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
    }

    /// Runs `f` while holding the exclusive lock for `key`. The lock is
    /// released on return, including on panic (mutex poisoning aside),
    /// matching the scoped-acquisition pattern of §9.
    pub fn with_account_lock<F, R>(&self, key: AccountKey, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let mutex = self.entry(key);
        let _guard = mutex.lock().expect("account lock poisoned");
        f()
    }
}
