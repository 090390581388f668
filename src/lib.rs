//! Rollog - embedded rolling-file logging with latency statistics
//!
//! A process-embedded logging facility: leveled log lines are appended to a
//! live file that rotates by size and file count, while a background
//! aggregator buckets timed-operation latencies per label and flushes a
//! tabular report into the same log sink once a minute.
//!
//! The pieces compose explicitly and the host application owns the
//! instances:
//!
//! ```no_run
//! use rollog::config::Config;
//! use rollog::logger::Logger;
//! use rollog::stats::StatAggregator;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let config = Config::default();
//! let logger = Logger::new(&config);
//! let stats = StatAggregator::new(Box::new(logger.sink()));
//!
//! logger.error("service starting");
//! stats.record("get_user", 12);
//! # }
//! ```

pub mod config;
pub mod logger;
pub mod rolling;
pub mod stats;
