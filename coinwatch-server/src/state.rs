//! Shared application state injected into every handler.

use coinwatch_data::{
    aggregator::Aggregator, exchange::MarketData, registry::SubscriberRegistry,
    snapshot::SnapshotStore,
};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<SnapshotStore>,
    pub registry: Arc<SubscriberRegistry>,
    pub aggregator: Arc<Aggregator>,
    /// Used directly by the history endpoint; cycles go through the
    /// aggregator instead.
    pub source: Arc<dyn MarketData>,
}
