//! Interval policy table bounding historical queries.
//!
//! Maps a human interval label ("5m", "1d", ...) to the lookback window and
//! maximum sample count used when requesting candlestick data upstream. The
//! table is fixed at process start; there is one entry per supported label.

use crate::error::FeedError;
use smol_str::SmolStr;
use std::time::Duration;

/// Interval applied before any client has requested one.
pub const DEFAULT_INTERVAL: &str = "5m";

/// Lookback window and sample bound for one supported interval label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalSpec {
    pub label: &'static str,
    pub lookback: Duration,
    pub limit: usize,
}

const HOUR: u64 = 60 * 60;

/// Supported intervals, shortest lookback first. Lookbacks are sized so
/// every label resolves to roughly the same number of samples.
static INTERVALS: [IntervalSpec; 5] = [
    IntervalSpec {
        label: "5m",
        lookback: Duration::from_secs(12 * HOUR),
        limit: 144,
    },
    IntervalSpec {
        label: "15m",
        lookback: Duration::from_secs(36 * HOUR),
        limit: 144,
    },
    IntervalSpec {
        label: "30m",
        lookback: Duration::from_secs(72 * HOUR),
        limit: 144,
    },
    IntervalSpec {
        label: "1h",
        lookback: Duration::from_secs(144 * HOUR),
        limit: 144,
    },
    IntervalSpec {
        label: "1d",
        lookback: Duration::from_secs(30 * 24 * HOUR),
        limit: 30,
    },
];

/// Look up the [`IntervalSpec`] for a label.
pub fn spec(label: &str) -> Result<&'static IntervalSpec, FeedError> {
    INTERVALS
        .iter()
        .find(|spec| spec.label == label)
        .ok_or_else(|| FeedError::UnknownInterval(SmolStr::new(label)))
}

/// True if the label is present in the policy table.
pub fn is_supported(label: &str) -> bool {
    INTERVALS.iter().any(|spec| spec.label == label)
}

/// All supported interval labels, in table order.
pub fn labels() -> impl Iterator<Item = &'static str> {
    INTERVALS.iter().map(|spec| spec.label)
}
