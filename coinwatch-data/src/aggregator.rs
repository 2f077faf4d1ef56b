//! Refresh-cycle orchestration: per-symbol fan-out, merge, broadcast.

use crate::{
    error::FeedError,
    exchange::MarketData,
    registry::SubscriberRegistry,
    snapshot::{CoinState, SnapshotStore},
};
use smol_str::SmolStr;
use std::{sync::Arc, time::Duration};
use tokio::{
    task::JoinSet,
    time::{Instant, timeout_at},
};
use tracing::{debug, warn};

/// Overall bound on one refresh cycle; symbols still in flight when it
/// elapses are abandoned for the cycle.
pub const DEFAULT_CYCLE_DEADLINE: Duration = Duration::from_secs(10);

/// Per-cycle accounting, surfaced to logs and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleOutcome {
    /// Symbols merged into the snapshot this cycle.
    pub updated: usize,
    /// Symbols that contributed nothing this cycle.
    pub skipped: usize,
}

/// Drives one refresh pass across all tracked symbols and broadcasts the
/// resulting snapshot.
pub struct Aggregator {
    source: Arc<dyn MarketData>,
    store: Arc<SnapshotStore>,
    registry: Arc<SubscriberRegistry>,
    cycle_deadline: Duration,
    // Serialises cycles: an interval-change refresh queues behind an
    // in-flight scheduled cycle instead of racing it for the store.
    cycle_guard: tokio::sync::Mutex<()>,
}

impl Aggregator {
    pub fn new(
        source: Arc<dyn MarketData>,
        store: Arc<SnapshotStore>,
        registry: Arc<SubscriberRegistry>,
    ) -> Self {
        Self {
            source,
            store,
            registry,
            cycle_deadline: DEFAULT_CYCLE_DEADLINE,
            cycle_guard: tokio::sync::Mutex::new(()),
        }
    }

    /// Override the overall cycle deadline.
    pub fn with_cycle_deadline(mut self, deadline: Duration) -> Self {
        self.cycle_deadline = deadline;
        self
    }

    /// Run one full refresh cycle and broadcast the resulting snapshot.
    ///
    /// Individual symbol failures are contained: they are logged, counted
    /// as skips and never fail the cycle. A cycle with zero successes still
    /// broadcasts the unchanged snapshot.
    pub async fn refresh(&self) -> CycleOutcome {
        let _cycle = self.cycle_guard.lock().await;

        // Interval changes landing after this point apply to the next cycle.
        let interval = self.store.active_interval();
        let deadline = Instant::now() + self.cycle_deadline;

        let mut units = JoinSet::new();
        for symbol in self.store.symbols() {
            let symbol = symbol.clone();
            let interval = interval.clone();
            let source = Arc::clone(&self.source);
            units.spawn(async move {
                let fetched = timeout_at(
                    deadline,
                    fetch_symbol(source.as_ref(), &symbol, &interval),
                )
                .await
                .unwrap_or_else(|_| {
                    Err(FeedError::Timeout(format!(
                        "cycle deadline elapsed for {symbol}"
                    )))
                });
                (symbol, fetched)
            });
        }

        let mut outcome = CycleOutcome::default();
        while let Some(joined) = units.join_next().await {
            let Ok((symbol, fetched)) = joined else {
                outcome.skipped += 1;
                continue;
            };
            match fetched {
                Ok(state) => {
                    self.store.merge_one(&symbol, state);
                    outcome.updated += 1;
                }
                Err(error) => {
                    warn!(%symbol, %error, "symbol contributed nothing this cycle");
                    outcome.skipped += 1;
                }
            }
        }

        let delivered = self.registry.broadcast(&self.store.snapshot());
        debug!(
            updated = outcome.updated,
            skipped = outcome.skipped,
            delivered,
            %interval,
            "refresh cycle complete"
        );
        outcome
    }
}

/// One symbol's unit of work: quote first, then history.
///
/// A quote failure skips the symbol entirely; a history failure degrades to
/// an empty series so the symbol still updates with price data.
async fn fetch_symbol(
    source: &dyn MarketData,
    symbol: &str,
    interval: &str,
) -> Result<CoinState, FeedError> {
    let quote = source.fetch_quote(symbol).await?;

    let history = match source.fetch_history(symbol, interval).await {
        Ok(history) => history,
        Err(error) => {
            warn!(%symbol, %error, "history fetch failed, keeping empty series");
            Vec::new()
        }
    };

    Ok(CoinState {
        price: quote.last_price,
        volume: quote.volume,
        change_24h: quote.price_change_percent,
        history,
        interval: SmolStr::new(interval),
    })
}
