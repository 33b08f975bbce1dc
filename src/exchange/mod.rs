//! Exchange integration.
//!
//! Defines the `ExchangeApi` trait the scheduling core consumes and the
//! Kraken implementation behind it. The core only ever sees three
//! capabilities: read balances, read a spot price, place a market order.

pub mod kraken;
pub mod nonce;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Kraken-style asset code, e.g. `ZGBP` or `XXBT`.
pub type CurrencyCode = String;

/// Abstraction over the exchange the agent trades against.
///
/// Implemented by `KrakenClient` in production and by in-memory mocks in
/// tests. All methods are fallible; the poll driver treats every error as
/// transient and retries on the next cycle.
#[async_trait]
pub trait ExchangeApi: Send + Sync {
    /// Fetch all account balances, keyed by currency code.
    async fn fetch_balances(&self) -> Result<HashMap<CurrencyCode, Decimal>, ExchangeError>;

    /// Fetch the current spot price for a trading pair.
    async fn fetch_price(&self, pair: &str) -> Result<Decimal, ExchangeError>;

    /// Place a market order. Success means the exchange accepted it.
    async fn place_market_order(&self, order: &MarketOrder) -> Result<(), ExchangeError>;
}

/// A fixed-volume market order for a single pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketOrder {
    pub pair: String,
    pub side: OrderSide,
    /// Volume in the base asset, e.g. BTC for XXBTZGBP.
    pub volume: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "buy"),
            OrderSide::Sell => write!(f, "sell"),
        }
    }
}

/// Errors from exchange calls.
///
/// All variants are treated identically by the poll driver (log, skip the
/// cycle, retry after the interval); the split exists for diagnostics.
/// Permanent auth rejections surface as `Rejected` and are retried forever
/// like everything else — the operator watches the logs.
#[derive(Debug, thiserror::Error)]
pub enum ExchangeError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("exchange rejected request: {0}")]
    Rejected(String),

    #[error("malformed response: {0}")]
    Malformed(String),
}
