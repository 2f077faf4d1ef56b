//! Environment-driven configuration.
//!
//! Every knob has a hard-coded default so the server runs with no
//! environment at all; unparseable values fall back rather than abort.

use std::{net::SocketAddr, time::Duration};

/// Symbols tracked when `COINWATCH_SYMBOLS` is unset.
const DEFAULT_SYMBOLS: &str = "BTC,ETH,SOL,XRP,DOGE,ADA,TRX,SUI";

/// Bind address when `COINWATCH_ADDR` is unset.
const DEFAULT_ADDR: &str = "127.0.0.1:8080";

/// Static asset directory when `COINWATCH_ASSETS` is unset.
const DEFAULT_ASSETS_DIR: &str = "static";

#[derive(Debug, Clone)]
pub struct Config {
    /// Listener bind address (`COINWATCH_ADDR`).
    pub addr: SocketAddr,
    /// Tracked symbol set, fixed for the process lifetime
    /// (`COINWATCH_SYMBOLS`, comma-separated).
    pub symbols: Vec<String>,
    /// Period between scheduled refresh cycles (`COINWATCH_REFRESH_SECS`).
    pub refresh_period: Duration,
    /// Directory served for static assets (`COINWATCH_ASSETS`).
    pub assets_dir: String,
    /// Upstream exchange base URL (`COINWATCH_UPSTREAM`).
    pub upstream_url: String,
}

impl Config {
    /// Read configuration from the environment, falling back to defaults.
    pub fn from_env() -> Self {
        let addr = std::env::var("COINWATCH_ADDR")
            .ok()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or_else(|| {
                DEFAULT_ADDR
                    .parse()
                    .expect("static default address parses")
            });

        let symbols = std::env::var("COINWATCH_SYMBOLS")
            .unwrap_or_else(|_| DEFAULT_SYMBOLS.to_string())
            .split(',')
            .map(|symbol| symbol.trim().to_uppercase())
            .filter(|symbol| !symbol.is_empty())
            .collect();

        let refresh_period = std::env::var("COINWATCH_REFRESH_SECS")
            .ok()
            .and_then(|raw| raw.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(coinwatch_data::scheduler::DEFAULT_REFRESH_PERIOD);

        let assets_dir = std::env::var("COINWATCH_ASSETS")
            .unwrap_or_else(|_| DEFAULT_ASSETS_DIR.to_string());

        let upstream_url = std::env::var("COINWATCH_UPSTREAM").unwrap_or_else(|_| {
            coinwatch_data::exchange::binance::DEFAULT_BASE_URL.to_string()
        });

        Self {
            addr,
            symbols,
            refresh_period,
            assets_dir,
            upstream_url,
        }
    }
}
