//! Poll driver.
//!
//! Owns the `Schedule` and runs the fixed-interval cycle against the
//! exchange: fetch balance and price, detect deposits, fire the order
//! when due, recompute the schedule. Every failure is transient — log,
//! skip the rest of the cycle, retry after the interval. The interval is
//! consumed even on failure paths as backpressure against a rate-limited
//! API.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use super::executor::MarketOrderExecutor;
use crate::clock::Clock;
use crate::exchange::{ExchangeApi, ExchangeError};
use crate::schedule::Schedule;

// ---------------------------------------------------------------------------
// Cycle outcome
// ---------------------------------------------------------------------------

/// Result of one poll cycle.
#[derive(Debug)]
pub enum CycleOutcome {
    Completed(CycleReport),
    Skipped(SkipReason),
}

/// Summary of a completed cycle.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub cycle_number: u64,
    pub fiat_balance: Decimal,
    pub price: Decimal,
    pub deposit_arrived: bool,
    pub order_placed: bool,
    pub next_order_at: Option<DateTime<Utc>>,
    pub period_end: DateTime<Utc>,
}

/// Why a cycle was abandoned early. All reasons take the same retry
/// path: wait out the interval, run a fresh cycle.
#[derive(Debug, thiserror::Error)]
pub enum SkipReason {
    #[error("balance fetch failed: {0}")]
    BalanceFetch(ExchangeError),

    #[error("price fetch failed: {0}")]
    PriceFetch(ExchangeError),

    #[error("no {0} entry in balance response")]
    MissingFiatBalance(String),

    #[error("order failed: {0}")]
    OrderFailed(ExchangeError),
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

pub struct PollDriver<E: ExchangeApi, C: Clock> {
    exchange: Arc<E>,
    executor: MarketOrderExecutor<E>,
    clock: C,
    fiat_currency: String,
    schedule: Schedule,
    cycle_count: u64,
}

impl<E: ExchangeApi, C: Clock> PollDriver<E, C> {
    /// Build a driver with a fresh schedule: first order due immediately,
    /// period end one deposit period out.
    pub fn new(
        exchange: Arc<E>,
        executor: MarketOrderExecutor<E>,
        clock: C,
        fiat_currency: String,
        period_months: u32,
    ) -> Self {
        let now = clock.now();
        Self {
            exchange,
            executor,
            clock,
            fiat_currency,
            schedule: Schedule::new(now, period_months),
            cycle_count: 0,
        }
    }

    /// Current scheduling state (read-only; tests assert against it).
    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    /// Run one poll cycle. Never mutates the schedule on a skip, except
    /// that the balance observation sticks once both fetches succeeded —
    /// an order failure after that point keeps `next_order_at` untouched
    /// so the same order is retried next cycle.
    pub async fn cycle(&mut self) -> CycleOutcome {
        self.cycle_count += 1;

        let balances = match self.exchange.fetch_balances().await {
            Ok(b) => b,
            Err(e) => return CycleOutcome::Skipped(SkipReason::BalanceFetch(e)),
        };

        let pair = self.executor.order().pair.clone();
        let price = match self.exchange.fetch_price(&pair).await {
            Ok(p) => p,
            Err(e) => return CycleOutcome::Skipped(SkipReason::PriceFetch(e)),
        };

        let fiat_balance = match balances.get(&self.fiat_currency) {
            Some(b) => *b,
            None => {
                return CycleOutcome::Skipped(SkipReason::MissingFiatBalance(
                    self.fiat_currency.clone(),
                ))
            }
        };

        let now = self.clock.now();
        let deposit_arrived = self.schedule.observe_balance(fiat_balance);
        let order_volume = self.executor.order().volume;

        let mut order_placed = false;
        if self.schedule.order_due(now) {
            match self.executor.execute().await {
                Ok(()) => {
                    order_placed = true;
                    self.schedule.reschedule(now, fiat_balance, price, order_volume);
                }
                // Leave next_order_at alone: the same slot is retried
                // next cycle. Deposit handling is also deferred to the
                // retry cycle, matching the balance already observed.
                Err(e) => return CycleOutcome::Skipped(SkipReason::OrderFailed(e)),
            }
        }

        if deposit_arrived {
            info!(%fiat_balance, "Deposit detected — starting new period");
            self.schedule.begin_new_period(now);
            self.schedule.reschedule(now, fiat_balance, price, order_volume);
        }

        CycleOutcome::Completed(CycleReport {
            cycle_number: self.cycle_count,
            fiat_balance,
            price,
            deposit_arrived,
            order_placed,
            next_order_at: self.schedule.next_order_at(),
            period_end: self.schedule.period_end(),
        })
    }

    /// Run cycles forever, paced by `poll_interval`, until Ctrl+C.
    ///
    /// A slow cycle delays the next tick rather than bursting to catch
    /// up, so the interval is a true minimum cycle time.
    pub async fn run(&mut self, poll_interval: Duration) {
        let mut interval = tokio::time::interval(poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);

        info!(
            interval_secs = poll_interval.as_secs(),
            "Entering poll loop. Press Ctrl+C to stop."
        );

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match self.cycle().await {
                        CycleOutcome::Completed(report) => log_cycle_report(&report),
                        CycleOutcome::Skipped(reason) => {
                            warn!(cycle = self.cycle_count, %reason, "Cycle skipped — retrying next interval");
                        }
                    }
                }
                _ = &mut shutdown => {
                    info!("Shutdown signal received.");
                    break;
                }
            }
        }
    }
}

/// Log a human-readable cycle summary.
fn log_cycle_report(report: &CycleReport) {
    info!(
        cycle = report.cycle_number,
        balance = %report.fiat_balance,
        price = %report.price,
        deposit = report.deposit_arrived,
        ordered = report.order_placed,
        next_order_at = ?report.next_order_at,
        period_end = %report.period_end,
        "Cycle complete"
    );
}
