//! Shared in-memory snapshot of the latest known per-symbol market state.
//!
//! The [`SnapshotStore`] is the single owner of the snapshot and of the
//! process-wide active interval. Entries are merged per symbol and never
//! wiped wholesale: a partial refresh leaves previously successful entries
//! untouched, so the service degrades to stale data instead of gaps.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::collections::HashMap;
use tracing::warn;

/// Merged, externally visible record for one tracked symbol. Field names
/// follow the wire format pushed to subscribers.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CoinState {
    /// Last trade price, decimal-as-text.
    pub price: String,
    /// 24h traded volume, decimal-as-text.
    pub volume: String,
    /// 24h percent change, decimal-as-text.
    #[serde(rename = "change24h")]
    pub change_24h: String,
    /// Close prices for the interval this record was computed under, oldest
    /// first. Empty when the history fetch failed but the quote succeeded.
    pub history: Vec<f64>,
    /// Interval label the history was computed under.
    pub interval: SmolStr,
}

/// Full per-symbol state map at a point in time.
pub type Snapshot = HashMap<SmolStr, CoinState>;

/// Owner of the shared [`Snapshot`] and the active interval.
///
/// Reads take shared access and clone; writes take exclusive access per
/// call, so a reader never observes a half-written entry. Locks are never
/// held across an `.await`.
#[derive(Debug)]
pub struct SnapshotStore {
    symbols: Vec<SmolStr>,
    states: RwLock<Snapshot>,
    active_interval: RwLock<SmolStr>,
}

impl SnapshotStore {
    /// Create an empty store tracking `symbols`, starting on `interval`.
    pub fn new<I, S>(symbols: I, interval: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SmolStr>,
    {
        Self {
            symbols: symbols.into_iter().map(Into::into).collect(),
            states: RwLock::new(HashMap::new()),
            active_interval: RwLock::new(SmolStr::new(interval)),
        }
    }

    /// The tracked symbol set, fixed for the process lifetime.
    pub fn symbols(&self) -> &[SmolStr] {
        &self.symbols
    }

    /// Clone of the current snapshot. Symbols appear only after their first
    /// successful refresh.
    pub fn snapshot(&self) -> Snapshot {
        self.states.read().clone()
    }

    /// Merge the refreshed state for one symbol.
    ///
    /// Symbols outside the tracked set are dropped so the snapshot never
    /// grows past it.
    pub fn merge_one(&self, symbol: &str, state: CoinState) {
        if !self.symbols.iter().any(|tracked| tracked.as_str() == symbol) {
            warn!(%symbol, "dropping merge for untracked symbol");
            return;
        }
        self.states.write().insert(SmolStr::new(symbol), state);
    }

    /// The interval label applied to subsequent history fetches.
    pub fn active_interval(&self) -> SmolStr {
        self.active_interval.read().clone()
    }

    /// Switch the process-wide interval. Takes effect from the next cycle;
    /// already-stored entries keep the tag they were computed under.
    pub fn set_active_interval(&self, label: &str) {
        *self.active_interval.write() = SmolStr::new(label);
    }
}
