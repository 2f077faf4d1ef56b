//! Real-time market-data aggregation and distribution for a fixed set of
//! tracked symbols.
//!
//! On a fixed period the [`aggregator::Aggregator`] fans out over the
//! tracked symbols, fetching the current [`exchange::PriceQuote`] and the
//! close-price history for the active interval from the upstream exchange,
//! and merges every successful result into the shared
//! [`snapshot::SnapshotStore`]. The full snapshot is then pushed to every
//! client registered with the [`registry::SubscriberRegistry`]. Clients may
//! switch the process-wide history interval at any time, which also
//! triggers an out-of-band refresh so the requester is not left waiting for
//! the next scheduled tick.
//!
//! Individual symbol failures never fail a cycle: the service degrades to
//! stale or partial data rather than crashing.

pub mod aggregator;
pub mod error;
pub mod exchange;
pub mod interval;
pub mod registry;
pub mod scheduler;
pub mod snapshot;
