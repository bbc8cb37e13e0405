//! Typed configuration (§6 env vars / §9's `MetaEnvReader` replacement):
//! a `clap::Parser` struct, each field overridable on the command line or
//! by the matching environment variable.

use std::path::PathBuf;

use chrono::Duration;
use clap::Parser;
use shard_engine::{EngineConfig, ShardingRealm};

#[derive(Parser, Debug, Clone)]
#[command(name = "shard-node", version, about = "A shard of the accounting engine")]
pub struct ShardConfig {
    /// Directory for the persistent account/transfer/outbox database.
    #[arg(long, env = "SHARD_DATA_DIR", default_value = "./data")]
    pub data_dir: PathBuf,

    /// TTL used in `AccountUpdateSignal`; also bounds the heartbeat interval.
    #[arg(long, env = "SIGNALBUS_MAX_DELAY_DAYS", default_value_t = 7)]
    pub signalbus_max_delay_days: i64,

    /// Default commit window (days) used when preparing a transfer.
    #[arg(long, env = "PREPARED_TRANSFER_MAX_DELAY_DAYS", default_value_t = 14)]
    pub prepared_transfer_max_delay_days: i64,

    /// Minimum interval between `PreparedTransfer` reminder signals.
    #[arg(long, env = "PREPARED_TRANSFER_REMINDER_DAYS", default_value_t = 1)]
    pub prepared_transfer_reminder_days: i64,

    /// Minimum interval between heartbeat `AccountUpdate` emissions.
    #[arg(long, env = "ACCOUNT_HEARTBEAT_DAYS", default_value_t = 1)]
    pub account_heartbeat_days: i64,

    /// Rate-limit on C4 interest capitalization.
    #[arg(long, env = "MIN_INTEREST_CAPITALIZATION_DAYS", default_value_t = 1)]
    pub min_interest_capitalization_days: i64,

    /// Rate-limit on C4 try-delete attempts.
    #[arg(long, env = "DELETION_ATTEMPTS_MIN_DAYS", default_value_t = 1)]
    pub deletion_attempts_min_days: i64,

    /// Fraction of principal that must have accrued before capitalization runs.
    #[arg(long, env = "MAX_INTEREST_TO_PRINCIPAL_RATIO", default_value_t = 0.01)]
    pub max_interest_to_principal_ratio: f64,

    /// Bit-prefix mask defining which `(debtor_id, creditor_id)` this shard owns.
    #[arg(long, env = "SHARDING_REALM_MASK")]
    pub sharding_realm_mask: Option<u64>,

    /// Value the masked creditor id must match for this shard to own it.
    #[arg(long, env = "SHARDING_REALM_MATCH_BITS", default_value_t = 0)]
    pub sharding_realm_match_bits: u64,

    /// Cooperative split with a parent shard: ignore finalization requests
    /// for accounts this (child) shard does not own.
    #[arg(long, env = "DELETE_PARENT_SHARD_RECORDS", default_value_t = false)]
    pub delete_parent_shard_records: bool,

    /// Base URL of the root-config fetch API used to learn a debtor's
    /// target interest rate (§9 "Async fetch caching via LRU decorator").
    #[arg(long, env = "ROOT_CONFIG_FETCH_URL")]
    pub root_config_fetch_url: Option<String>,

    /// How long a cached root-config response is trusted before refetching.
    #[arg(long, env = "ROOT_CONFIG_CACHE_TTL_SECS", default_value_t = 300)]
    pub root_config_cache_ttl_secs: u64,

    /// Interval between worker pool scan passes, in milliseconds.
    #[arg(long, env = "SHARD_TICK_MILLIS", default_value_t = 1_000)]
    pub tick_millis: u64,

    /// Grace period (seconds) before a prepared transfer's unconsumed
    /// locked amount starts decaying under demurrage.
    #[arg(long, env = "PREPARED_TRANSFER_GRATIS_PERIOD_SECS", default_value_t = 0)]
    pub gratis_period_secs: i64,
}

impl ShardConfig {
    pub fn to_engine_config(&self) -> EngineConfig {
        EngineConfig {
            commit_period: Duration::days(self.prepared_transfer_max_delay_days),
            prepared_transfer_reminder_interval: Duration::days(self.prepared_transfer_reminder_days),
            heartbeat_interval: Duration::days(self.account_heartbeat_days),
            signalbus_max_delay: Duration::days(self.signalbus_max_delay_days),
            min_capitalization_interval: Duration::days(self.min_interest_capitalization_days),
            min_deletion_attempt_interval: Duration::days(self.deletion_attempts_min_days),
            interest_rate_change_min_interval: Duration::hours(1),
            max_interest_to_principal_ratio: self.max_interest_to_principal_ratio,
            max_batch_count: 200,
            sharding_realm: self.sharding_realm_mask.map(|mask| ShardingRealm {
                mask,
                match_bits: self.sharding_realm_match_bits,
            }),
            delete_parent_shard_records: self.delete_parent_shard_records,
            gratis_period: Duration::seconds(self.gratis_period_secs),
        }
    }
}
