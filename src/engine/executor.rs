//! Order executor.
//!
//! Thin adapter from "place the order now" to the exchange call. The
//! order specification is fixed at construction; the adapter never
//! retries and never touches scheduling state — retry belongs to the
//! poll driver.

use std::sync::Arc;
use tracing::info;

use crate::exchange::{ExchangeApi, ExchangeError, MarketOrder};

pub struct MarketOrderExecutor<E: ExchangeApi> {
    exchange: Arc<E>,
    order: MarketOrder,
}

impl<E: ExchangeApi> MarketOrderExecutor<E> {
    pub fn new(exchange: Arc<E>, order: MarketOrder) -> Self {
        Self { exchange, order }
    }

    /// The fixed order this executor places.
    pub fn order(&self) -> &MarketOrder {
        &self.order
    }

    /// Place the order once. `Ok` only when the exchange accepted it.
    pub async fn execute(&self) -> Result<(), ExchangeError> {
        info!(
            pair = %self.order.pair,
            side = %self.order.side,
            volume = %self.order.volume,
            "Placing market order"
        );
        self.exchange.place_market_order(&self.order).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::{CurrencyCode, OrderSide};
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct StubExchange {
        calls: AtomicUsize,
        orders: Mutex<Vec<MarketOrder>>,
        fail: bool,
    }

    impl StubExchange {
        fn new(fail: bool) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                orders: Mutex::new(Vec::new()),
                fail,
            }
        }
    }

    #[async_trait]
    impl ExchangeApi for StubExchange {
        async fn fetch_balances(
            &self,
        ) -> Result<HashMap<CurrencyCode, Decimal>, ExchangeError> {
            Ok(HashMap::new())
        }

        async fn fetch_price(&self, _pair: &str) -> Result<Decimal, ExchangeError> {
            Ok(dec!(50000))
        }

        async fn place_market_order(&self, order: &MarketOrder) -> Result<(), ExchangeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ExchangeError::Rejected(
                    "EOrder:Insufficient funds".to_string(),
                ));
            }
            self.orders.lock().unwrap().push(order.clone());
            Ok(())
        }
    }

    fn fixed_order() -> MarketOrder {
        MarketOrder {
            pair: "XXBTZGBP".to_string(),
            side: OrderSide::Buy,
            volume: dec!(0.0001),
        }
    }

    #[tokio::test]
    async fn test_execute_forwards_fixed_order() {
        let exchange = Arc::new(StubExchange::new(false));
        let executor = MarketOrderExecutor::new(Arc::clone(&exchange), fixed_order());

        executor.execute().await.unwrap();

        let orders = exchange.orders.lock().unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0], fixed_order());
    }

    #[tokio::test]
    async fn test_execute_failure_is_single_attempt() {
        let exchange = Arc::new(StubExchange::new(true));
        let executor = MarketOrderExecutor::new(Arc::clone(&exchange), fixed_order());

        let err = executor.execute().await.unwrap_err();
        assert!(matches!(err, ExchangeError::Rejected(_)));
        // No internal retry: exactly one call per execute().
        assert_eq!(exchange.calls.load(Ordering::SeqCst), 1);
    }
}
