//! Next-order time calculation.
//!
//! Spreads the remaining fiat balance evenly across the time left in the
//! current deposit period: with funds for `k` more orders and `span`
//! remaining, the next order fires `span / k` from now.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Compute when the next order should fire.
///
/// Returns `None` when the balance does not cover even one order at the
/// current price — scheduling pauses until a deposit arrives and funds
/// are re-evaluated.
///
/// If `period_end` is already in the past (clock skew, missed deposit)
/// the interval is zero or negative and the result collapses to a
/// timestamp at or before `now`, causing catch-up ordering rather than
/// an error.
///
/// Pure: identical inputs always yield identical output. Money math is
/// `Decimal`; the time division is integer milliseconds truncated toward
/// zero.
pub fn next_order_time(
    now: DateTime<Utc>,
    fiat_balance: Decimal,
    period_end: DateTime<Utc>,
    price: Decimal,
    order_volume: Decimal,
) -> Option<DateTime<Utc>> {
    let order_notional = price * order_volume;
    if order_notional <= Decimal::ZERO {
        return None;
    }

    let max_remaining_orders = match (fiat_balance / order_notional).floor().to_i64() {
        Some(n) if n > 0 => n,
        _ => return None,
    };

    let remaining_ms = (period_end - now).num_milliseconds();
    let step_ms = remaining_ms / max_remaining_orders;

    Some(now + Duration::milliseconds(step_ms))
}
