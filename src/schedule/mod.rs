//! Scheduling state.
//!
//! `Schedule` is the one mutable structure in the system: when the next
//! order fires, when the current deposit period ends, and the previous
//! cycle's balance reading. It is owned and mutated exclusively by the
//! poll driver; everything here is in-memory and lost on restart.

pub mod deposit;
pub mod planner;

use chrono::{DateTime, Months, Utc};
use rust_decimal::Decimal;
use tracing::debug;

/// Mutable scheduling state for one trading pair.
#[derive(Debug, Clone)]
pub struct Schedule {
    /// When the next purchase should fire. `None` = funds exhausted,
    /// paused until a deposit arrives.
    next_order_at: Option<DateTime<Utc>>,
    /// Anticipated date of the next fiat deposit. Only ever moves forward.
    period_end: DateTime<Utc>,
    /// Previous cycle's fiat balance, used solely for deposit detection.
    last_seen_balance: Option<Decimal>,
    /// Deposit period length in calendar months.
    period_months: u32,
}

impl Schedule {
    /// Fresh schedule: one order due immediately, period end one full
    /// period out, no balance history.
    pub fn new(now: DateTime<Utc>, period_months: u32) -> Self {
        Self {
            next_order_at: Some(now),
            period_end: now + Months::new(period_months),
            last_seen_balance: None,
            period_months,
        }
    }

    pub fn next_order_at(&self) -> Option<DateTime<Utc>> {
        self.next_order_at
    }

    pub fn period_end(&self) -> DateTime<Utc> {
        self.period_end
    }

    pub fn last_seen_balance(&self) -> Option<Decimal> {
        self.last_seen_balance
    }

    /// Record this cycle's balance reading and report whether it
    /// constitutes a deposit. The reading is stored unconditionally,
    /// including on the first cycle where no comparison is possible.
    pub fn observe_balance(&mut self, current: Decimal) -> bool {
        let arrived = deposit::deposit_arrived(self.last_seen_balance, current);
        self.last_seen_balance = Some(current);
        arrived
    }

    /// Whether an order is due at `now`.
    pub fn order_due(&self, now: DateTime<Utc>) -> bool {
        matches!(self.next_order_at, Some(at) if now >= at)
    }

    /// Recompute `next_order_at` from current funds and price.
    pub fn reschedule(
        &mut self,
        now: DateTime<Utc>,
        fiat_balance: Decimal,
        price: Decimal,
        order_volume: Decimal,
    ) {
        self.next_order_at =
            planner::next_order_time(now, fiat_balance, self.period_end, price, order_volume);
        debug!(
            next_order_at = ?self.next_order_at,
            %fiat_balance,
            %price,
            "Schedule recomputed"
        );
    }

    /// Start a new deposit period from `now`.
    pub fn begin_new_period(&mut self, now: DateTime<Utc>) {
        self.period_end = now + Months::new(self.period_months);
        debug!(period_end = %self.period_end, "New deposit period");
    }
}
