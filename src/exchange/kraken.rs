//! Kraken REST API client.
//!
//! Public endpoints are plain GETs; private endpoints are form-encoded
//! POSTs signed with the account's API key pair:
//!
//! `API-Sign = base64(HMAC-SHA512(base64decode(secret),
//!                    uri_path ‖ SHA256(nonce ‖ post_body)))`
//!
//! The post body must be signed byte-for-byte as sent, so this client
//! builds the urlencoded body by hand rather than through reqwest's form
//! serializer.
//!
//! API docs: https://docs.kraken.com/rest/

use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use reqwest::Client;
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretVec};
use serde::Deserialize;
use sha2::{Digest, Sha256, Sha512};
use std::collections::HashMap;
use tracing::{debug, info};

use super::{CurrencyCode, ExchangeApi, ExchangeError, MarketOrder};
use crate::exchange::nonce::NonceGenerator;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

const API_URL: &str = "https://api.kraken.com";
const PUBLIC_PATH: &str = "/0/public";
const PRIVATE_PATH: &str = "/0/private";

// ---------------------------------------------------------------------------
// Kraken API types
// ---------------------------------------------------------------------------

/// Every Kraken response is `{"error": [..], "result": {..}}`.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    error: Vec<String>,
    #[serde(default)]
    result: Option<serde_json::Value>,
}

/// Per-pair entry of the `Ticker` result. Kraken serialises all numeric
/// fields as strings; only the vwap array is consumed here.
#[derive(Debug, Deserialize)]
struct TickerInfo {
    /// Volume-weighted average price: `[today, last 24h]`.
    #[serde(default)]
    p: Vec<Decimal>,
}

// ---------------------------------------------------------------------------
// Pure helpers (unit-testable without HTTP)
// ---------------------------------------------------------------------------

/// Decode a Kraken response envelope into its `result` payload.
///
/// A non-empty `error` array means the request was rejected; a missing
/// `result` on an error-free response is malformed.
fn decode_envelope(body: &str) -> Result<serde_json::Value, ExchangeError> {
    let envelope: Envelope = serde_json::from_str(body)
        .map_err(|e| ExchangeError::Malformed(format!("invalid JSON envelope: {e}")))?;

    if !envelope.error.is_empty() {
        return Err(ExchangeError::Rejected(envelope.error.join("; ")));
    }

    envelope
        .result
        .ok_or_else(|| ExchangeError::Malformed("response has no result field".to_string()))
}

/// Pull the vwap price for `pair` out of a decoded `Ticker` result.
///
/// Kraken echoes the canonical pair name, which can differ from the
/// requested spelling; a single-entry result is accepted as a match.
fn extract_pair_price(result: serde_json::Value, pair: &str) -> Result<Decimal, ExchangeError> {
    let mut tickers: HashMap<String, TickerInfo> = serde_json::from_value(result)
        .map_err(|e| ExchangeError::Malformed(format!("unexpected ticker shape: {e}")))?;

    let ticker = match tickers.remove(pair) {
        Some(t) => t,
        None => {
            if tickers.len() != 1 {
                return Err(ExchangeError::Malformed(format!(
                    "pair {pair} missing from ticker response"
                )));
            }
            // len == 1 checked above
            tickers.into_values().next().ok_or_else(|| {
                ExchangeError::Malformed("empty ticker response".to_string())
            })?
        }
    };

    ticker
        .p
        .first()
        .copied()
        .ok_or_else(|| ExchangeError::Malformed("ticker has no vwap entries".to_string()))
}

/// Compute the `API-Sign` header value for a private request.
fn sign_request(secret: &[u8], uri_path: &str, nonce: u64, body: &str) -> String {
    let mut sha = Sha256::new();
    sha.update(nonce.to_string().as_bytes());
    sha.update(body.as_bytes());
    let digest = sha.finalize();

    // HMAC-SHA512 accepts keys of any length
    let mut mac = Hmac::<Sha512>::new_from_slice(secret)
        .expect("HMAC key of any length is valid");
    mac.update(uri_path.as_bytes());
    mac.update(&digest);

    base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes())
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Authenticated Kraken client.
pub struct KrakenClient {
    http: Client,
    api_key: String,
    api_secret: SecretVec<u8>,
    nonce: NonceGenerator,
}

impl KrakenClient {
    /// Create a new client.
    ///
    /// `api_secret` is the base64-encoded private key as issued by Kraken;
    /// it is decoded once here and held behind `secrecy` from then on.
    pub fn new(api_key: String, api_secret: &str) -> Result<Self> {
        let secret = base64::engine::general_purpose::STANDARD
            .decode(api_secret.trim())
            .context("Kraken API secret is not valid base64")?;

        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent("drip/0.1.0 (kraken-dca-agent)")
            .build()
            .context("Failed to build HTTP client for Kraken")?;

        Ok(Self {
            http,
            api_key,
            api_secret: SecretVec::new(secret),
            nonce: NonceGenerator::with_system_clock(),
        })
    }

    // -- API helpers -------------------------------------------------------

    /// GET a public endpoint, returning the decoded `result` payload.
    async fn public_get(
        &self,
        endpoint: &str,
        query: &str,
    ) -> Result<serde_json::Value, ExchangeError> {
        let url = if query.is_empty() {
            format!("{API_URL}{PUBLIC_PATH}/{endpoint}")
        } else {
            format!("{API_URL}{PUBLIC_PATH}/{endpoint}?{query}")
        };

        debug!(url = %url, "Kraken public request");

        let resp = self.http.get(&url).send().await?;
        Self::read_envelope(resp).await
    }

    /// Signed POST to a private endpoint, returning the decoded `result`.
    async fn private_post(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<serde_json::Value, ExchangeError> {
        let nonce = self.nonce.next();

        let mut body = format!("nonce={nonce}");
        for (key, value) in params {
            body.push('&');
            body.push_str(key);
            body.push('=');
            body.push_str(&urlencoding::encode(value));
        }

        let uri_path = format!("{PRIVATE_PATH}/{endpoint}");
        let signature = sign_request(self.api_secret.expose_secret(), &uri_path, nonce, &body);

        debug!(endpoint, nonce, "Kraken private request");

        let resp = self
            .http
            .post(format!("{API_URL}{uri_path}"))
            .header("API-Key", &self.api_key)
            .header("API-Sign", signature)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await?;

        Self::read_envelope(resp).await
    }

    async fn read_envelope(resp: reqwest::Response) -> Result<serde_json::Value, ExchangeError> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ExchangeError::Status { status, body });
        }

        let text = resp.text().await?;
        decode_envelope(&text)
    }
}

#[async_trait]
impl ExchangeApi for KrakenClient {
    async fn fetch_balances(&self) -> Result<HashMap<CurrencyCode, Decimal>, ExchangeError> {
        let result = self.private_post("Balance", &[]).await?;
        let balances: HashMap<CurrencyCode, Decimal> = serde_json::from_value(result)
            .map_err(|e| ExchangeError::Malformed(format!("unexpected balance shape: {e}")))?;
        debug!(currencies = balances.len(), "Fetched account balances");
        Ok(balances)
    }

    async fn fetch_price(&self, pair: &str) -> Result<Decimal, ExchangeError> {
        let query = format!("pair={}", urlencoding::encode(pair));
        let result = self.public_get("Ticker", &query).await?;
        let price = extract_pair_price(result, pair)?;
        debug!(pair, %price, "Fetched spot price");
        Ok(price)
    }

    async fn place_market_order(&self, order: &MarketOrder) -> Result<(), ExchangeError> {
        let side = order.side.to_string();
        let volume = order.volume.to_string();
        let params = [
            ("pair", order.pair.as_str()),
            ("type", side.as_str()),
            ("ordertype", "market"),
            ("volume", volume.as_str()),
        ];

        let result = self.private_post("AddOrder", &params).await?;
        info!(
            pair = %order.pair,
            side = %order.side,
            volume = %order.volume,
            response = %result,
            "Order accepted by Kraken"
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    // -- Signing -----------------------------------------------------------

    #[test]
    fn test_sign_matches_kraken_documentation_example() {
        // Worked example from the Kraken REST API authentication docs.
        let secret = base64::engine::general_purpose::STANDARD
            .decode("kQH5HW/8p1uGOVjbgWA7FunAmGO8lsSUXNsu3eow76sz84Q18fWxnyRzBHCd3pd5nE9qa99HAZtuZuj6F1huXg==")
            .unwrap();
        let signature = sign_request(
            &secret,
            "/0/private/AddOrder",
            1616492376594,
            "nonce=1616492376594&ordertype=limit&pair=XBTUSD&price=37500&type=buy&volume=1.25",
        );
        assert_eq!(
            signature,
            "4/dpxb3iT4tp/ZCVEwSnEsLxx0bqyhLpdfOpc6fn7OR8+UClSV5n9E6aSS8MPtnRfp32bAb0nmbRn6H8ndwLUQ=="
        );
    }

    // -- Envelope decoding -------------------------------------------------

    #[test]
    fn test_decode_envelope_ok() {
        let result = decode_envelope(r#"{"error":[],"result":{"ZGBP":"104.5000"}}"#).unwrap();
        assert_eq!(result["ZGBP"], "104.5000");
    }

    #[test]
    fn test_decode_envelope_rejected() {
        let err = decode_envelope(r#"{"error":["EAPI:Invalid key","EGeneral:Busy"]}"#)
            .unwrap_err();
        match err {
            ExchangeError::Rejected(msg) => {
                assert_eq!(msg, "EAPI:Invalid key; EGeneral:Busy");
            }
            other => panic!("expected Rejected, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_envelope_missing_result() {
        let err = decode_envelope(r#"{"error":[]}"#).unwrap_err();
        assert!(matches!(err, ExchangeError::Malformed(_)));
    }

    #[test]
    fn test_decode_envelope_invalid_json() {
        let err = decode_envelope("<html>502 Bad Gateway</html>").unwrap_err();
        assert!(matches!(err, ExchangeError::Malformed(_)));
    }

    // -- Ticker parsing ----------------------------------------------------

    fn sample_ticker(pair: &str) -> serde_json::Value {
        serde_json::json!({
            pair: {
                "a": ["50010.00000", "1", "1.000"],
                "b": ["50000.00000", "2", "2.000"],
                "p": ["50123.45678", "49876.54321"],
                "v": ["123.456", "789.012"]
            }
        })
    }

    #[test]
    fn test_extract_pair_price_exact_key() {
        let price = extract_pair_price(sample_ticker("XXBTZGBP"), "XXBTZGBP").unwrap();
        assert_eq!(price, dec!(50123.45678));
    }

    #[test]
    fn test_extract_pair_price_canonical_fallback() {
        // Requested "XBTGBP", Kraken echoed the canonical "XXBTZGBP".
        let price = extract_pair_price(sample_ticker("XXBTZGBP"), "XBTGBP").unwrap();
        assert_eq!(price, dec!(50123.45678));
    }

    #[test]
    fn test_extract_pair_price_missing_pair() {
        let mut multi = sample_ticker("XXBTZGBP");
        multi["XETHZGBP"] = sample_ticker("XETHZGBP")["XETHZGBP"].clone();
        let err = extract_pair_price(multi, "XBTUSD").unwrap_err();
        assert!(matches!(err, ExchangeError::Malformed(_)));
    }

    #[test]
    fn test_extract_pair_price_no_vwap() {
        let result = serde_json::json!({"XXBTZGBP": {"a": ["1", "1", "1"]}});
        let err = extract_pair_price(result, "XXBTZGBP").unwrap_err();
        assert!(matches!(err, ExchangeError::Malformed(_)));
    }

    // -- Balance parsing ---------------------------------------------------

    #[test]
    fn test_balance_string_amounts_parse() {
        let result = serde_json::json!({"ZGBP": "104.5000", "XXBT": "0.0045"});
        let balances: HashMap<CurrencyCode, Decimal> = serde_json::from_value(result).unwrap();
        assert_eq!(balances["ZGBP"], dec!(104.5));
        assert_eq!(balances["XXBT"], dec!(0.0045));
    }
}
