//! Latency statistics
//!
//! Per-label latency histograms fed through a bounded queue and flushed to
//! the log sink as a tabular report on a fixed interval.

mod aggregator;
mod histogram;

pub use aggregator::{StatAggregator, StatSink, FLUSH_INTERVAL};
pub use histogram::{LabelStats, StatTable, NUM_BUCKETS};
