//! DRIP — Deposit-Reactive Incremental Purchaser
//!
//! Entry point. Loads configuration, initialises structured logging,
//! builds the Kraken client, and runs the poll→detect→schedule→buy loop
//! with graceful shutdown.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use drip::clock::SystemClock;
use drip::config::AppConfig;
use drip::engine::driver::PollDriver;
use drip::engine::executor::MarketOrderExecutor;
use drip::exchange::kraken::KrakenClient;
use drip::exchange::{MarketOrder, OrderSide};

const BANNER: &str = r#"
 ____  ____  ___ ____
|  _ \|  _ \|_ _|  _ \
| | | | |_) || || |_) |
| |_| |  _ < | ||  __/
|____/|_| \_\___|_|

  Deposit-Reactive Incremental Purchaser
  v0.1.0 — Kraken DCA Agent
"#;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    // Load configuration from TOML
    let cfg = AppConfig::load("config.toml")?;

    // Initialise structured logging
    init_logging();

    // Print startup banner
    println!("{BANNER}");
    info!(
        pair = %cfg.trading.pair,
        fiat_currency = %cfg.trading.fiat_currency,
        order_volume = %cfg.trading.order_volume,
        poll_interval_secs = cfg.scheduler.poll_interval_secs,
        deposit_period_months = cfg.scheduler.deposit_period_months,
        "DRIP starting up"
    );

    // -- Resolve credentials ----------------------------------------------

    let api_key = AppConfig::resolve_env(&cfg.exchange.api_key_env)?;
    let api_secret = AppConfig::resolve_env(&cfg.exchange.api_secret_env)?;

    // -- Initialise components --------------------------------------------

    let exchange = Arc::new(KrakenClient::new(api_key, &api_secret)?);

    let order = MarketOrder {
        pair: cfg.trading.pair.clone(),
        side: OrderSide::Buy,
        volume: cfg.trading.order_volume,
    };
    let executor = MarketOrderExecutor::new(Arc::clone(&exchange), order);

    let mut driver = PollDriver::new(
        exchange,
        executor,
        SystemClock,
        cfg.trading.fiat_currency.clone(),
        cfg.scheduler.deposit_period_months,
    );

    // -- Main loop ---------------------------------------------------------

    driver
        .run(Duration::from_secs(cfg.scheduler.poll_interval_secs))
        .await;

    info!("DRIP shut down cleanly.");
    Ok(())
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("drip=info"));

    let json_logging = std::env::var("DRIP_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
