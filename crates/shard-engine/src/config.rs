//! Tunables named in §6, grouped the way a typed config layer hands them
//! to the engine (the `shard-node` binary parses the actual environment
//! into this shape).

use chrono::Duration;

#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// `PREPARED_TRANSFER_MAX_DELAY_DAYS`: default commit window used
    /// when preparing a transfer (§4.5 step 3: `now + commit_period`).
    pub commit_period: Duration,

    /// `PREPARED_TRANSFER_REMAINDER_DAYS`: minimum interval between
    /// reminder signals for a still-unfinalized prepared transfer.
    pub prepared_transfer_reminder_interval: Duration,

    /// `ACCOUNT_HEARTBEAT_DAYS`: minimum interval between heartbeat
    /// `AccountUpdate` emissions.
    pub heartbeat_interval: Duration,

    /// `SIGNALBUS_MAX_DELAY_DAYS`: TTL used in `AccountUpdate`; also
    /// bounds the heartbeat interval above.
    pub signalbus_max_delay: Duration,

    /// `MIN_INTEREST_CAPITALIZATION_DAYS`: rate-limit on `capitalize_interest`.
    pub min_capitalization_interval: Duration,

    /// `DELETION_ATTEMPTS_MIN_DAYS`: rate-limit on `try_to_delete_account`.
    pub min_deletion_attempt_interval: Duration,

    /// Rate-limit on `try_change_interest_rate` (§4.4): no-op if less
    /// than this has elapsed since the last change.
    pub interest_rate_change_min_interval: Duration,

    /// `MAX_INTEREST_TO_PRINCIPAL_RATIO`: capitalization triggers only
    /// when accrued interest exceeds this fraction of principal.
    pub max_interest_to_principal_ratio: f64,

    /// Maximum buffer rows drained per account per worker invocation
    /// (§5's `MAX_COUNT`).
    pub max_batch_count: usize,

    /// `SHARDING_REALM`: bit-prefix of `(debtor_id, creditor_id)` owned
    /// by this process. `None` means "accept everything" (single-shard
    /// deployment, the common case for this binary).
    pub sharding_realm: Option<ShardingRealm>,

    /// `DELETE_PARENT_SHARD_RECORDS`: when true, finalization requests
    /// for accounts outside `sharding_realm` are dropped (§6).
    pub delete_parent_shard_records: bool,

    /// Grace period granted before a prepared transfer's unconsumed
    /// locked amount starts decaying under demurrage (§4.6's
    /// `gratis_period`). The original grants this per row but never
    /// negotiates it per request; here it is one shard-wide setting
    /// stamped onto every `PreparedTransfer` at prepare time.
    pub gratis_period: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            commit_period: Duration::days(14),
            prepared_transfer_reminder_interval: Duration::days(1),
            heartbeat_interval: Duration::days(1),
            signalbus_max_delay: Duration::days(7),
            min_capitalization_interval: Duration::days(1),
            min_deletion_attempt_interval: Duration::days(1),
            interest_rate_change_min_interval: Duration::hours(1),
            max_interest_to_principal_ratio: 0.01,
            max_batch_count: 200,
            sharding_realm: None,
            delete_parent_shard_records: false,
            gratis_period: Duration::zero(),
        }
    }
}

/// A bit-prefix realm over the 64-bit id space, matching the original's
/// `SHARDING_REALM` mask-and-match test.
#[derive(Clone, Copy, Debug)]
pub struct ShardingRealm {
    pub mask: u64,
    pub match_bits: u64,
}

impl ShardingRealm {
    pub fn owns(&self, id: i64) -> bool {
        (id as u64) & self.mask == self.match_bits
    }
}
