//! Binance spot REST client.
//!
//! Quotes come from the 24h ticker endpoint, history from the klines
//! endpoint bounded by the interval policy table. Neither call retries:
//! the aggregator owns failure policy per cycle.

use crate::{
    error::FeedError,
    exchange::{MarketData, PriceQuote},
    interval,
};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Public Binance spot REST endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.binance.com";

/// Deadline applied to every individual upstream request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Tracked symbols are quoted against USDT upstream.
const QUOTE_ASSET: &str = "USDT";

/// HTTP client for the Binance spot ticker and kline endpoints.
#[derive(Debug, Clone)]
pub struct BinanceClient {
    http: Client,
    base_url: String,
}

impl BinanceClient {
    /// Create a client against the public endpoint.
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Create a client against a custom endpoint.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into(),
        }
    }
}

impl Default for BinanceClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MarketData for BinanceClient {
    async fn fetch_quote(&self, symbol: &str) -> Result<PriceQuote, FeedError> {
        let url = format!(
            "{}/api/v3/ticker/24hr?symbol={}{}",
            self.base_url, symbol, QUOTE_ASSET
        );

        let response = self
            .http
            .get(&url)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(FeedError::Network(format!(
                "ticker request for {symbol} returned {}",
                response.status()
            )));
        }

        let quote = response.json::<PriceQuote>().await?;
        debug!(%symbol, price = %quote.last_price, "fetched quote");
        Ok(quote)
    }

    async fn fetch_history(&self, symbol: &str, interval: &str) -> Result<Vec<f64>, FeedError> {
        let spec = interval::spec(interval)?;

        let end_ms = Utc::now().timestamp_millis();
        let start_ms = end_ms - spec.lookback.as_millis() as i64;
        let url = format!(
            "{}/api/v3/klines?symbol={}{}&interval={}&startTime={}&endTime={}&limit={}",
            self.base_url, symbol, QUOTE_ASSET, interval, start_ms, end_ms, spec.limit
        );

        let response = self
            .http
            .get(&url)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(FeedError::Network(format!(
                "kline request for {symbol} returned {}",
                response.status()
            )));
        }

        let rows = response.json::<Vec<Vec<Value>>>().await?;
        debug!(%symbol, %interval, candles = rows.len(), "fetched history");
        Ok(close_prices(&rows))
    }
}

/// Extract the close price (element index 4) from each raw kline row.
///
/// A malformed or missing close yields `0.0` for that slot: one bad candle
/// must not abort the rest of the series.
pub(crate) fn close_prices(rows: &[Vec<Value>]) -> Vec<f64> {
    rows.iter()
        .map(|row| {
            row.get(4)
                .and_then(Value::as_str)
                .and_then(|text| text.parse::<f64>().ok())
                .unwrap_or(0.0)
        })
        .collect()
}
