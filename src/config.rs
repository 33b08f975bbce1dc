//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Secrets (API credentials) are referenced by env-var name in the config
//! and resolved at runtime via `std::env::var`, so the file itself never
//! holds key material.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::fs;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub exchange: ExchangeConfig,
    pub trading: TradingConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExchangeConfig {
    /// Env var holding the Kraken API public key.
    pub api_key_env: String,
    /// Env var holding the base64-encoded Kraken API private key.
    pub api_secret_env: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TradingConfig {
    /// Kraken pair in its canonical spelling, e.g. `XXBTZGBP`.
    pub pair: String,
    /// Currency code of the fiat balance entry to track, e.g. `ZGBP`.
    pub fiat_currency: String,
    /// Fixed volume of the asset bought per order, as a decimal string.
    pub order_volume: Decimal,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Minimum wall-clock seconds per poll cycle.
    pub poll_interval_secs: u64,
    /// Expected gap between fiat deposits, in calendar months.
    pub deposit_period_months: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 60,
            deposit_period_months: 1,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        let config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {path}"))?;
        Ok(config)
    }

    /// Resolve an environment variable name to its value.
    /// Useful for loading secrets referenced in the config.
    pub fn resolve_env(env_name: &str) -> Result<String> {
        std::env::var(env_name)
            .with_context(|| format!("Environment variable not set: {env_name}"))
    }
}
