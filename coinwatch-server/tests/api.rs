//! End-to-end tests for the server surface against an in-memory upstream.

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use coinwatch_data::{
    aggregator::Aggregator,
    error::FeedError,
    exchange::{MarketData, PriceQuote},
    interval,
    registry::SubscriberRegistry,
    snapshot::{CoinState, SnapshotStore},
};
use coinwatch_server::{routes, state::AppState};
use futures::{SinkExt, StreamExt};
use http_body_util::BodyExt;
use smol_str::SmolStr;
use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tower::ServiceExt;

/// Upstream stand-in: instant quotes, a fixed close-price series, and the
/// real interval-table validation.
struct FakeSource;

#[async_trait::async_trait]
impl MarketData for FakeSource {
    async fn fetch_quote(&self, symbol: &str) -> Result<PriceQuote, FeedError> {
        Ok(PriceQuote {
            symbol: SmolStr::new(format!("{symbol}USDT")),
            last_price: "97000.5".to_string(),
            volume: "1234.5".to_string(),
            price_change_percent: "-0.75".to_string(),
        })
    }

    async fn fetch_history(&self, _symbol: &str, interval: &str) -> Result<Vec<f64>, FeedError> {
        interval::spec(interval)?;
        Ok(vec![100.5, 0.0, 102.0])
    }
}

fn test_state(symbols: &[&str]) -> AppState {
    let source: Arc<dyn MarketData> = Arc::new(FakeSource);
    let store = Arc::new(SnapshotStore::new(
        symbols.iter().copied(),
        interval::DEFAULT_INTERVAL,
    ));
    let registry = Arc::new(SubscriberRegistry::new());
    let aggregator = Arc::new(Aggregator::new(
        source.clone(),
        store.clone(),
        registry.clone(),
    ));
    AppState {
        store,
        registry,
        aggregator,
        source,
    }
}

#[tokio::test]
async fn test_coins_returns_tracked_symbol_set() {
    let app = routes::app(test_state(&["BTC", "ETH", "SOL"]), "static");

    let response = app
        .oneshot(Request::builder().uri("/coins").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let coins: Vec<String> = serde_json::from_slice(&body).unwrap();
    assert_eq!(coins, vec!["BTC", "ETH", "SOL"]);
}

#[tokio::test]
async fn test_history_requires_both_parameters() {
    for uri in [
        "/history",
        "/history?symbol=BTC",
        "/history?interval=5m",
        "/history?symbol=&interval=5m",
    ] {
        let app = routes::app(test_state(&["BTC"]), "static");
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "uri: {uri}");
    }
}

#[tokio::test]
async fn test_history_rejects_unknown_interval() {
    let app = routes::app(test_state(&["BTC"]), "static");

    let response = app
        .oneshot(
            Request::builder()
                .uri("/history?symbol=BTC&interval=7m")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_history_returns_close_prices() {
    let app = routes::app(test_state(&["BTC"]), "static");

    let response = app
        .oneshot(
            Request::builder()
                .uri("/history?symbol=BTC&interval=5m")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let series: Vec<f64> = serde_json::from_slice(&body).unwrap();
    assert_eq!(series, vec![100.5, 0.0, 102.0]);
}

#[tokio::test]
async fn test_ws_join_snapshot_and_interval_switch() {
    let state = test_state(&["BTC"]);

    // Seed the snapshot so the join-time frame is observable without a cycle.
    state.store.merge_one(
        "BTC",
        CoinState {
            price: "96000.0".to_string(),
            volume: "1.0".to_string(),
            change_24h: "0.1".to_string(),
            history: vec![1.0, 2.0],
            interval: SmolStr::new("5m"),
        },
    );

    let app = routes::app(state, "static");
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let (mut socket, _) = connect_async(format!("ws://{addr}/ws"))
        .await
        .expect("websocket handshake");

    // A new subscriber receives the full snapshot immediately, even though
    // no refresh cycle has run since it connected.
    let joined = tokio::time::timeout(Duration::from_secs(2), socket.next())
        .await
        .expect("join-time frame in time")
        .expect("stream open")
        .expect("frame ok");
    let Message::Text(text) = joined else {
        panic!("expected a text frame, got {joined:?}");
    };
    let snapshot: HashMap<String, CoinState> = serde_json::from_str(text.as_str()).unwrap();
    assert_eq!(snapshot["BTC"].price, "96000.0");
    assert_eq!(snapshot["BTC"].interval, "5m");

    // An interval change triggers an immediate out-of-band cycle whose
    // broadcast carries the new tag.
    socket
        .send(Message::Text(r#"{"interval":"1d"}"#.into()))
        .await
        .unwrap();
    let refreshed = tokio::time::timeout(Duration::from_secs(2), socket.next())
        .await
        .expect("refresh broadcast in time")
        .expect("stream open")
        .expect("frame ok");
    let Message::Text(text) = refreshed else {
        panic!("expected a text frame, got {refreshed:?}");
    };
    let snapshot: HashMap<String, CoinState> = serde_json::from_str(text.as_str()).unwrap();
    assert_eq!(snapshot["BTC"].interval, "1d");
    assert_eq!(snapshot["BTC"].price, "97000.5");
    assert_eq!(snapshot["BTC"].history, vec![100.5, 0.0, 102.0]);
}
