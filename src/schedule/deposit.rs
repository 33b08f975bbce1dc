//! Deposit detection.
//!
//! A deposit is a strict increase between two successive fiat balance
//! readings. Balance decreases are the agent's own purchases and must
//! never register as deposits; the strictly-greater comparison gives
//! that for free.

use rust_decimal::Decimal;

/// Returns `true` iff `previous` is present and `current` exceeds it.
///
/// The first cycle has no previous reading and always yields `false`,
/// so startup can never produce a false-positive deposit event.
pub fn deposit_arrived(previous: Option<Decimal>, current: Decimal) -> bool {
    matches!(previous, Some(prev) if current > prev)
}
