//! Upstream exchange integration.
//!
//! [`MarketData`] is the seam between the aggregation core and the concrete
//! HTTP client, so cycle semantics stay testable without a network.
//! [`binance::BinanceClient`] is the production implementation.

pub mod binance;

use crate::error::FeedError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// 24h ticker statistics for one market, decimal fields kept as the
/// upstream's text so no precision is invented on the way through.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize)]
pub struct PriceQuote {
    /// Upstream market identifier, e.g. "BTCUSDT".
    pub symbol: SmolStr,
    #[serde(rename = "lastPrice")]
    pub last_price: String,
    pub volume: String,
    #[serde(rename = "priceChangePercent")]
    pub price_change_percent: String,
}

/// Source of quotes and close-price history for tracked symbols.
#[async_trait]
pub trait MarketData: Send + Sync {
    /// Fetch the current 24h ticker statistics for `symbol`.
    async fn fetch_quote(&self, symbol: &str) -> Result<PriceQuote, FeedError>;

    /// Fetch the close-price series for `symbol` under `interval`, oldest
    /// sample first.
    async fn fetch_history(&self, symbol: &str, interval: &str) -> Result<Vec<f64>, FeedError>;
}
