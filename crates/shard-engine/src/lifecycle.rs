//! Account lifecycle (C4): create / configure / heartbeat /
//! schedule-for-deletion / delete / purge, rate-limited interest-rate
//! change, and interest capitalization.

use chrono::Duration;
use shard_core::{
    contain_principal, days_since_epoch, project_balance, Account, AccountKey, AccountPurge,
    AccountUpdate, RejectedConfig, ShardResult, Signal, INTEREST_RATE_CEIL, INTEREST_RATE_FLOOR,
    STATUS_DELETED_FLAG, STATUS_ESTABLISHED_INTEREST_RATE_FLAG, STATUS_OVERFLOWN_FLAG, Timestamp,
};
use tracing::{info, warn};

use crate::ShardEngine;

/// Outcome of [`ShardEngine::configure_account`]: whether the caller
/// should now fetch the debtor's root config data and call
/// `try_change_interest_rate` (§4.4 step 5).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConfigureOutcome {
    pub applied: bool,
    pub should_set_interest_rate: bool,
}

/// Wrap-aware `(ts, seqnum)` ordering rule of §4.4 step 3: a 1-second
/// slack window, then a wrap-aware seqnum comparison.
fn is_strictly_newer(new_ts: Timestamp, new_seqnum: i32, old_ts: Timestamp, old_seqnum: i32) -> bool {
    let delta = new_ts - old_ts;
    if delta > Duration::seconds(1) {
        return true;
    }
    if delta < Duration::seconds(-1) {
        return false;
    }
    new_seqnum.wrapping_sub(old_seqnum) > 0
}

impl ShardEngine {
    /// §4.4 `configure_account`.
    pub fn configure_account(
        &self,
        debtor_id: i64,
        creditor_id: i64,
        cfg_ts: Timestamp,
        cfg_seqnum: i32,
        negligible_amount: f32,
        config_flags: i32,
        config_data: String,
        now: Timestamp,
    ) -> ShardResult<ConfigureOutcome> {
        self.check_ownership(creditor_id)?;
        if config_data.len() > shard_core::CONFIG_DATA_MAX_BYTES || negligible_amount < 0.0 {
            self.store.enqueue_signal(&Signal::RejectedConfig(RejectedConfig {
                debtor_id,
                creditor_id,
                status_code: shard_core::status_code::INVALID_CONFIGURATION.to_string(),
                config_ts: cfg_ts,
                config_seqnum: cfg_seqnum,
            }))?;
            warn!(debtor_id, creditor_id, "rejected config: invalid configuration");
            return Ok(ConfigureOutcome { applied: false, should_set_interest_rate: false });
        }

        let key = AccountKey::new(debtor_id, creditor_id);
        self.locks.with_account_lock(key, || {
            let (mut account, newly_created) = match self.store.get_account(key)? {
                Some(acc) => (acc, false),
                None => {
                    let creation_date = days_since_epoch(now.date_naive());
                    (Account::new(debtor_id, creditor_id, creation_date, now), true)
                }
            };

            if newly_created {
                self.store.put_account(&account)?;
                self.emit_account_update(&account)?;
                info!(debtor_id, creditor_id, "account created");
            } else if account.is_deleted() {
                account.set_flag(STATUS_DELETED_FLAG, false);
                account.bump_seqnum();
                account.last_change_ts = account.last_change_ts.max(now);
                self.store.put_account(&account)?;
                self.emit_account_update(&account)?;
            }

            let should_apply =
                is_strictly_newer(cfg_ts, cfg_seqnum, account.last_config_ts, account.last_config_seqnum);

            if should_apply {
                account.negligible_amount = negligible_amount;
                account.config_flags = config_flags;
                account.config_data = config_data.clone();
                account.last_config_ts = cfg_ts;
                account.last_config_seqnum = cfg_seqnum;
                account.bump_seqnum();
                self.store.put_account(&account)?;
                self.emit_account_update(&account)?;
                info!(
                    debtor_id,
                    creditor_id,
                    config_data_hash = %blake3::hash(config_data.as_bytes()).to_hex(),
                    "account configured"
                );
            }

            let should_set_interest_rate = newly_created || !account.has_established_interest_rate();
            Ok(ConfigureOutcome { applied: should_apply, should_set_interest_rate })
        })
    }

    /// §4.4 `try_change_interest_rate`.
    pub fn try_change_interest_rate(&self, debtor_id: i64, creditor_id: i64, new_rate: f32, now: Timestamp) -> ShardResult<bool> {
        let new_rate = new_rate.clamp(INTEREST_RATE_FLOOR, INTEREST_RATE_CEIL);
        let key = AccountKey::new(debtor_id, creditor_id);

        self.locks.with_account_lock(key, || {
            let Some(mut account) = self.store.get_account(key)? else {
                return Ok(false);
            };
            if account.is_deleted() {
                return Ok(false);
            }
            if now - account.last_interest_rate_change_ts < self.config.interest_rate_change_min_interval {
                return Ok(false);
            }

            self.apply_account_change(&mut account, 0, 0.0, now);
            account.previous_interest_rate = account.interest_rate;
            account.interest_rate = new_rate;
            account.last_interest_rate_change_ts = now;
            account.set_flag(STATUS_ESTABLISHED_INTEREST_RATE_FLAG, true);
            account.bump_seqnum();

            self.store.put_account(&account)?;
            self.emit_account_update(&account)?;
            info!(debtor_id, creditor_id, new_rate, "interest rate changed");
            Ok(true)
        })
    }

    /// §4.4 `capitalize_interest`.
    pub fn capitalize_interest(&self, debtor_id: i64, creditor_id: i64, now: Timestamp) -> ShardResult<bool> {
        let key = AccountKey::new(debtor_id, creditor_id);
        self.locks.with_account_lock(key, || {
            let Some(mut account) = self.store.get_account(key)? else {
                return Ok(false);
            };
            if account.is_deleted() || account.is_root() {
                return Ok(false);
            }
            if now - account.last_interest_capitalization_ts < self.config.min_capitalization_interval {
                return Ok(false);
            }

            let projected = project_balance(
                account.principal,
                account.interest,
                account.interest_rate,
                account.last_change_ts,
                now,
                account.creditor_id,
            );
            let delta = (projected - account.principal as f64).floor();
            let ratio = delta.abs() / (account.principal.unsigned_abs() as f64).max(1.0);
            if ratio < self.config.max_interest_to_principal_ratio {
                account.last_interest_capitalization_ts = now;
                self.store.put_account(&account)?;
                return Ok(false);
            }

            self.apply_account_change(&mut account, delta as i64, -delta, now);
            account.last_interest_capitalization_ts = now;
            self.store.put_account(&account)?;
            self.emit_account_update(&account)?;
            info!(debtor_id, creditor_id, delta, "interest capitalized");
            Ok(true)
        })
    }

    /// §4.4 `try_to_delete_account`.
    pub fn try_to_delete_account(&self, debtor_id: i64, creditor_id: i64, now: Timestamp) -> ShardResult<bool> {
        let key = AccountKey::new(debtor_id, creditor_id);
        self.locks.with_account_lock(key, || {
            let Some(mut account) = self.store.get_account(key)? else {
                return Ok(false);
            };
            if account.is_root() || account.is_deleted() {
                return Ok(false);
            }
            if now - account.last_deletion_attempt_ts < self.config.min_deletion_attempt_interval {
                return Ok(false);
            }

            account.last_deletion_attempt_ts = now;

            let eligible = account.is_scheduled_for_deletion()
                && account.pending_transfers_count == 0
                && self.store.iter_prepared_transfers(key)?.is_empty()
                && {
                    let projected = project_balance(
                        account.principal,
                        account.interest,
                        account.interest_rate,
                        account.last_change_ts,
                        now,
                        account.creditor_id,
                    );
                    projected <= (2.0_f64).max(account.negligible_amount as f64)
                };

            if !eligible {
                self.store.put_account(&account)?;
                return Ok(false);
            }

            account.set_flag(STATUS_DELETED_FLAG, true);
            account.principal = 0;
            account.interest = 0.0;
            account.bump_seqnum();
            self.store.put_account(&account)?;
            self.emit_account_update(&account)?;
            info!(debtor_id, creditor_id, "account deleted");
            Ok(true)
        })
    }

    /// §4.4 `purge_deleted_account` scanner pass. `grace_period` is the
    /// intranet-max-delay plus max-prepared-transfer-delay plus a few
    /// days' margin, per §4.4; the day-gap invariant on `creation_date`
    /// is what the caller relies on to prevent a collision with an
    /// account re-created at the same key after purge.
    pub fn purge_deleted_accounts(&self, now: Timestamp, grace_period: Duration) -> ShardResult<usize> {
        let mut purged = 0;
        for account in self.store.iter_accounts()? {
            if !account.is_deleted() {
                continue;
            }
            let age = now - account.last_change_ts;
            if age < grace_period {
                continue;
            }
            let key = AccountKey::new(account.debtor_id, account.creditor_id);
            self.locks.with_account_lock(key, || -> ShardResult<()> {
                self.store.delete_account(key)?;
                self.store.enqueue_signal(&Signal::AccountPurge(AccountPurge {
                    debtor_id: account.debtor_id,
                    creditor_id: account.creditor_id,
                    creation_date: account.creation_date,
                }))?;
                Ok(())
            })?;
            purged += 1;
            info!(debtor_id = account.debtor_id, creditor_id = account.creditor_id, "account purged");
        }
        Ok(purged)
    }

    /// §4.4 `apply_account_change`: projects accrued interest forward,
    /// applies `principal_delta`/`interest_delta`, and marks the account
    /// dirty for the next heartbeat sweep. Caller must already hold the
    /// account's row lock.
    pub(crate) fn apply_account_change(&self, account: &mut Account, principal_delta: i64, interest_delta: f64, now: Timestamp) {
        let projected = project_balance(
            account.principal,
            account.interest,
            account.interest_rate,
            account.last_change_ts,
            now,
            account.creditor_id,
        );
        account.interest = projected - account.principal as f64 + interest_delta;

        let new_principal = account.principal as f64 + principal_delta as f64;
        let contained = contain_principal(new_principal);
        if (contained as f64) != new_principal {
            account.set_flag(STATUS_OVERFLOWN_FLAG, true);
        }
        account.principal = contained;

        account.bump_seqnum();
        account.last_change_ts = account.last_change_ts.max(now);
        account.pending_account_update = true;
    }

    /// Heartbeat scan (§5, §6 `ACCOUNT_HEARTBEAT_DAYS`): emits
    /// `AccountUpdate` for every account whose `pending_account_update`
    /// flag is set, or whose last heartbeat has aged past the interval.
    pub fn run_heartbeat_scan(&self, now: Timestamp) -> ShardResult<usize> {
        let mut emitted = 0;
        for mut account in self.store.iter_accounts()? {
            let due = account.pending_account_update || now - account.last_heartbeat_ts >= self.config.heartbeat_interval;
            if !due {
                continue;
            }
            let key = AccountKey::new(account.debtor_id, account.creditor_id);
            self.locks.with_account_lock(key, || -> ShardResult<()> {
                account.pending_account_update = false;
                account.last_heartbeat_ts = now;
                self.store.put_account(&account)?;
                self.emit_account_update(&account)?;
                Ok(())
            })?;
            emitted += 1;
        }
        Ok(emitted)
    }

    pub(crate) fn emit_account_update(&self, account: &Account) -> ShardResult<()> {
        self.store.enqueue_signal(&Signal::AccountUpdate(AccountUpdate {
            debtor_id: account.debtor_id,
            creditor_id: account.creditor_id,
            last_change_seqnum: account.last_change_seqnum,
            last_change_ts: account.last_change_ts,
            principal: account.principal,
            interest: account.interest,
            interest_rate: account.interest_rate,
        }))?;
        Ok(())
    }
}
