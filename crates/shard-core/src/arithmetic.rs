//! Interest arithmetic (C1): pure, deterministic functions used by every
//! layer that touches a balance. No I/O, no locking — everything here is
//! safe to unit-test directly.

use crate::constants::{MAX_PRINCIPAL, MIN_PRINCIPAL, SECONDS_IN_YEAR};
use crate::types::{CreditorId, Timestamp, ROOT_CREDITOR_ID};

/// The widest magnitude `project_balance` will return before saturating,
/// mirroring the `decimal32.8` domain named in §4.1.
const SATURATION_BOUND: f64 = 9.999e23;

/// `k(rate) = ln(1 + rate/100) / seconds_per_year`.
pub fn calc_k(rate: f32) -> f64 {
    ((1.0 + rate as f64 / 100.0).ln()) / SECONDS_IN_YEAR
}

fn saturate(x: f64) -> f64 {
    x.clamp(-SATURATION_BOUND, SATURATION_BOUND)
}

/// Projects `principal + interest` forward to `now` at continuous
/// compounding rate `rate`, per §4.1.
///
/// The debtor's own account (`creditor_id = 0`) never accrues interest:
/// its principal is returned unchanged. A non-positive running balance
/// does not compound (negative balances don't earn demurrage here; that
/// is a property of prepared-transfer locks, not the account itself).
pub fn project_balance(
    principal: i64,
    interest: f64,
    rate: f32,
    last_change_ts: Timestamp,
    now: Timestamp,
    creditor_id: CreditorId,
) -> f64 {
    if creditor_id == ROOT_CREDITOR_ID {
        return principal as f64;
    }

    let b = saturate(principal as f64 + interest);
    if b <= 0.0 {
        return b;
    }

    let elapsed = (now - last_change_ts).num_seconds().max(0) as f64;
    saturate(b * (calc_k(rate) * elapsed).exp())
}

/// Clamps `x` to `[MIN_PRINCIPAL, MAX_PRINCIPAL]`, returning the sentinel
/// bound when `x` lies outside the representable range.
pub fn contain_principal(x: f64) -> i64 {
    if x.is_nan() {
        return 0;
    }
    if x <= MIN_PRINCIPAL as f64 {
        MIN_PRINCIPAL
    } else if x >= MAX_PRINCIPAL as f64 {
        MAX_PRINCIPAL
    } else {
        x as i64
    }
}

/// Interest that would accrue on `amount` between `from_ts` and `to_ts`,
/// splitting the interval at `rate_change_ts` so the rate in effect
/// before and after an interest-rate change is applied to its own
/// sub-interval: `amount * (exp(k_prev*t1 + k_now*t2) - 1)`.
pub fn due_interest(
    amount: f64,
    from_ts: Timestamp,
    to_ts: Timestamp,
    rate_now: f32,
    rate_prev: f32,
    rate_change_ts: Timestamp,
) -> f64 {
    if to_ts <= from_ts {
        return 0.0;
    }

    let split = rate_change_ts.clamp(from_ts, to_ts);
    let t1 = (split - from_ts).num_seconds().max(0) as f64;
    let t2 = (to_ts - split).num_seconds().max(0) as f64;

    let exponent = calc_k(rate_prev) * t1 + calc_k(rate_now) * t2;
    amount * (exponent.exp() - 1.0)
}

/// Extracts the debtor's issuing limit from the `"limit"` key of
/// `config_data`, parsed as JSON. A malformed payload or a missing/
/// non-numeric key yields `None`, matching `get_min_account_balance`'s
/// `EXCEPTION ... NULL` fallback.
fn parse_issuing_limit(config_data: &str) -> Option<f64> {
    let value: serde_json::Value = serde_json::from_str(config_data).ok()?;
    value.get("limit")?.as_f64()
}

/// `min_account_balance` of §4.5/§4.6: `0` for an ordinary account, or,
/// for the debtor's own account, `-min(issuing_limit_from_config_data,
/// negligible_amount_clamped)`. The issuing limit defaults to the
/// saturation bound when `config_data` carries none (an unconfigured
/// debtor's account has no ceiling on what it may issue).
pub fn min_account_balance(creditor_id: CreditorId, negligible_amount: f32, config_data: &str) -> f64 {
    if creditor_id != ROOT_CREDITOR_ID {
        return 0.0;
    }
    let issuing_limit = parse_issuing_limit(config_data)
        .map(|limit| limit.clamp(0.0, SATURATION_BOUND))
        .unwrap_or(SATURATION_BOUND);
    let negligible_clamped = (negligible_amount as f64).clamp(0.0, SATURATION_BOUND);
    -issuing_limit.min(negligible_clamped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn ts(secs: i64) -> Timestamp {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn zero_rate_is_identity() {
        assert_eq!(calc_k(0.0), 0.0);
        let t = ts(1_000_000);
        let b = project_balance(100, 0.0, 0.0, t, t, 7);
        assert_eq!(b, 100.0);
    }

    #[test]
    fn zero_elapsed_is_identity() {
        let t = ts(500);
        let b = project_balance(250, 10.0, 5.0, t, t, 7);
        assert!((b - 260.0).abs() < 1e-9);
    }

    #[test]
    fn debtor_account_never_compounds() {
        let b = project_balance(1_000, 500.0, 10.0, ts(0), ts(10_000_000), ROOT_CREDITOR_ID);
        assert_eq!(b, 1_000.0);
    }

    #[test]
    fn negative_balance_does_not_compound() {
        let b = project_balance(-100, 0.0, 25.0, ts(0), ts(1_000_000), 7);
        assert_eq!(b, -100.0);
    }

    #[test]
    fn contain_principal_clamps() {
        assert_eq!(contain_principal(1e30), MAX_PRINCIPAL);
        assert_eq!(contain_principal(-1e30), MIN_PRINCIPAL);
        assert_eq!(contain_principal(42.0), 42);
    }

    #[test]
    fn due_interest_zero_over_zero_interval() {
        let t = ts(1_000);
        assert_eq!(due_interest(500.0, t, t, 10.0, 10.0, t), 0.0);
    }

    #[test]
    fn min_account_balance_is_zero_for_non_root() {
        assert_eq!(min_account_balance(7, 5.0, r#"{"limit":100}"#), 0.0);
    }

    #[test]
    fn min_account_balance_takes_the_tighter_of_limit_and_negligible() {
        assert_eq!(min_account_balance(ROOT_CREDITOR_ID, 5.0, r#"{"limit":100}"#), -5.0);
        assert_eq!(min_account_balance(ROOT_CREDITOR_ID, 500.0, r#"{"limit":100}"#), -100.0);
    }

    #[test]
    fn min_account_balance_defaults_to_saturation_bound_without_a_limit() {
        assert_eq!(min_account_balance(ROOT_CREDITOR_ID, 10.0, ""), -10.0);
        assert_eq!(min_account_balance(ROOT_CREDITOR_ID, 10.0, r#"{"other":1}"#), -10.0);
    }
}
