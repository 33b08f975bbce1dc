//! Polling engine.
//!
//! `PollDriver` runs the fixed-interval cycle; `MarketOrderExecutor`
//! turns a "buy now" intent into one exchange call.

pub mod driver;
pub mod executor;
