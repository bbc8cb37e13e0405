//! ─── Shard protocol constants ───────────────────────────────────────────────
//!
//! Mirrors the constants scattered across `swpt_accounts/models.py` and
//! `swpt_accounts/__init__.py` in the original service.

/// Largest representable principal. `i64::MAX` is reserved to mean
/// "saturated" (see `MIN_PRINCIPAL` below for the symmetric case).
pub const MAX_PRINCIPAL: i64 = i64::MAX;

/// Smallest representable principal. Strictly greater than `i64::MIN`
/// so that `-MAX_PRINCIPAL` stays representable and the range is symmetric.
pub const MIN_PRINCIPAL: i64 = -i64::MAX;

/// Seconds in a Gregorian year, averaged (365.25 days). Used by the
/// continuous-compounding rate constant `k`.
pub const SECONDS_IN_YEAR: f64 = 365.25 * 86_400.0;

/// Floor of `account.interest_rate` / `previous_interest_rate`, percent.
pub const INTEREST_RATE_FLOOR: f32 = -50.0;

/// Ceiling of `account.interest_rate` / `previous_interest_rate`, percent.
pub const INTEREST_RATE_CEIL: f32 = 100.0;

/// `account.status_flags` bit: the account has been (soft-)deleted.
pub const STATUS_DELETED_FLAG: i32 = 1 << 0;

/// `account.status_flags` bit: a balance update overflowed and was clamped.
pub const STATUS_OVERFLOWN_FLAG: i32 = 1 << 1;

/// `account.status_flags` bit: the account's interest rate has been set
/// at least once (distinguishes "never configured" from "explicitly 0%").
pub const STATUS_ESTABLISHED_INTEREST_RATE_FLAG: i32 = 1 << 2;

/// `account.status_flags` bit: the account is considered unreachable
/// (its owning shard/agent subnet cannot be resolved).
pub const STATUS_UNREACHABLE_FLAG: i32 = 1 << 3;

/// `account.config_flags` bit: the account is scheduled for deletion by
/// its owner; `try_to_delete_account` honors it once other conditions hold.
pub const CONFIG_SCHEDULED_FOR_DELETION_FLAG: i32 = 1 << 0;

/// Maximum byte length of `account.config_data`.
pub const CONFIG_DATA_MAX_BYTES: usize = 2_000;

/// Maximum byte length of a coordinator type string.
pub const COORDINATOR_TYPE_MAX_BYTES: usize = 30;

/// Demurrage rate applied to locked funds during the prepared window,
/// absent an explicit negotiation. See GLOSSARY "Demurrage rate".
pub const DEFAULT_DEMURRAGE_RATE: f32 = -50.0;

/// Mask selecting the 24-bit "agent subnet" prefix of a creditor id, used
/// by the `agent` coordinator's reachability check in C5.
pub const AGENT_SUBNET_MASK: u64 = 0xffff_ff00_0000_0000;

/// Reserved, well-known coordinator type identifiers (from the original
/// service's `models.py`). Exposed so callers that self-coordinate
/// (interest capitalization, nullification, scheduled deletion) can tag
/// their own transfer requests consistently; the transfer pipeline itself
/// treats every coordinator type uniformly except for `"agent"`, which
/// triggers the cross-subnet reachability check in C5.
pub mod coordinator_type {
    pub const INTEREST: &str = "interest";
    pub const NULLIFY: &str = "nullify";
    pub const DELETE: &str = "delete";
    pub const DIRECT: &str = "direct";
    pub const AGENT: &str = "agent";
}

/// Statuses returned by the finalization processor (§4.6) and the transfer
/// request processor (§4.5).
pub mod status_code {
    pub const OK: &str = "OK";
    pub const TIMEOUT: &str = "TIMEOUT";
    pub const NEWER_INTEREST_RATE: &str = "NEWER_INTEREST_RATE";
    pub const INSUFFICIENT_AVAILABLE_AMOUNT: &str = "INSUFFICIENT_AVAILABLE_AMOUNT";
    pub const SENDER_IS_UNREACHABLE: &str = "SENDER_IS_UNREACHABLE";
    pub const RECIPIENT_IS_UNREACHABLE: &str = "RECIPIENT_IS_UNREACHABLE";
    pub const RECIPIENT_SAME_AS_SENDER: &str = "RECIPIENT_SAME_AS_SENDER";
    pub const TOO_MANY_TRANSFERS: &str = "TOO_MANY_TRANSFERS";
    pub const INVALID_CONFIGURATION: &str = "INVALID_CONFIGURATION";
}
