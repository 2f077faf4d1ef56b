//! Fixed-period refresh driver.

use crate::{aggregator::Aggregator, registry::SubscriberRegistry};
use std::{sync::Arc, time::Duration};
use tokio::time::{MissedTickBehavior, interval};
use tracing::info;

/// Default period between scheduled refresh cycles.
pub const DEFAULT_REFRESH_PERIOD: Duration = Duration::from_secs(10);

/// Drive refresh cycles on a fixed period, forever.
///
/// Parks until the first subscriber registers so no upstream calls are made
/// without an audience. After that first cycle it keeps firing regardless
/// of subscriber count: connection churn between ticks is common, and
/// keeping the snapshot warm is worth more than strict gating.
pub async fn run(
    aggregator: Arc<Aggregator>,
    registry: Arc<SubscriberRegistry>,
    period: Duration,
) {
    registry.wait_for_subscriber().await;
    info!("first subscriber connected, starting refresh cycles");

    let mut ticker = interval(period);
    // A cycle may run right up to its deadline; don't burst to catch up.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        aggregator.refresh().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::FeedError,
        exchange::{MarketData, PriceQuote},
        interval::DEFAULT_INTERVAL,
        snapshot::SnapshotStore,
    };
    use smol_str::SmolStr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::mpsc;

    /// Counts quote fetches so the gate can be observed from outside.
    #[derive(Default)]
    struct CountingSource {
        quotes: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl MarketData for CountingSource {
        async fn fetch_quote(&self, symbol: &str) -> Result<PriceQuote, FeedError> {
            self.quotes.fetch_add(1, Ordering::SeqCst);
            Ok(PriceQuote {
                symbol: SmolStr::new(format!("{symbol}USDT")),
                last_price: "1.0".to_string(),
                volume: "2.0".to_string(),
                price_change_percent: "3.0".to_string(),
            })
        }

        async fn fetch_history(&self, _symbol: &str, _interval: &str) -> Result<Vec<f64>, FeedError> {
            Ok(vec![1.0])
        }
    }

    #[tokio::test]
    async fn test_no_upstream_calls_before_first_subscriber() {
        let source = Arc::new(CountingSource::default());
        let store = Arc::new(SnapshotStore::new(["BTC"], DEFAULT_INTERVAL));
        let registry = Arc::new(SubscriberRegistry::new());
        let aggregator = Arc::new(Aggregator::new(
            source.clone(),
            store,
            registry.clone(),
        ));

        tokio::spawn(run(
            aggregator,
            registry.clone(),
            Duration::from_millis(10),
        ));

        // Idle with no audience: nothing may be fetched.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(source.quotes.load(Ordering::SeqCst), 0);

        let (tx, mut rx) = mpsc::unbounded_channel();
        registry.register(tx);

        // The first cycle fires promptly once an audience exists.
        let frame = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("broadcast arrived in time")
            .expect("sender side still alive");
        assert!(frame.contains("\"BTC\""));
        assert!(source.quotes.load(Ordering::SeqCst) >= 1);
    }
}
