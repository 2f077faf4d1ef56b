//! coinwatch server entrypoint.
//!
//! Wires the aggregation core to the HTTP/WebSocket surface: scheduler in
//! the background, axum router in the foreground.

use coinwatch_data::{
    aggregator::Aggregator,
    exchange::{MarketData, binance::BinanceClient},
    interval,
    registry::SubscriberRegistry,
    scheduler,
    snapshot::SnapshotStore,
};
use coinwatch_server::{config::Config, routes, state::AppState};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() {
    init_logging();

    let config = Config::from_env();
    info!(
        addr = %config.addr,
        symbols = ?config.symbols,
        refresh_secs = config.refresh_period.as_secs(),
        upstream = %config.upstream_url,
        "starting coinwatch server"
    );

    let source: Arc<dyn MarketData> = Arc::new(BinanceClient::with_base_url(&config.upstream_url));
    let store = Arc::new(SnapshotStore::new(
        config.symbols.iter().map(String::as_str),
        interval::DEFAULT_INTERVAL,
    ));
    let registry = Arc::new(SubscriberRegistry::new());
    let aggregator = Arc::new(Aggregator::new(
        source.clone(),
        store.clone(),
        registry.clone(),
    ));

    tokio::spawn(scheduler::run(
        aggregator.clone(),
        registry.clone(),
        config.refresh_period,
    ));

    let state = AppState {
        store,
        registry,
        aggregator,
        source,
    };
    let app = routes::app(state, &config.assets_dir);

    // The listening socket is the only fatal startup condition.
    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .expect("failed to bind listener");
    info!("listening on http://{}", config.addr);

    axum::serve(listener, app)
        .await
        .expect("server terminated");
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}
