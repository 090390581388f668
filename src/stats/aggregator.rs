//! Background latency aggregation
//!
//! Receives (label, latency) events through a bounded channel, folds them
//! into per-label histograms on a single worker task, and writes a tabular
//! report into the log sink once per flush interval.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::warn;

use super::histogram::StatTable;

/// Capacity of the ingestion queue
const QUEUE_CAPACITY: usize = 1024;

/// How often the aggregated report is flushed to the sink
pub const FLUSH_INTERVAL: Duration = Duration::from_secs(60);

/// Destination for the periodic report
pub type StatSink = Box<dyn Write + Send>;

/// A single timed-operation observation
#[derive(Debug)]
struct StatRecord {
    label: String,
    cost_ms: u64,
}

/// Concurrent latency accumulator with a periodic report.
///
/// Any number of producers may call [`record`](Self::record); a single
/// background task owns the aggregation state for the aggregator's whole
/// lifetime, so the histogram map needs no lock. The worker exits when the
/// aggregator is closed or dropped.
///
/// Must be created from within a tokio runtime.
pub struct StatAggregator {
    tx: mpsc::Sender<StatRecord>,
    closed: AtomicBool,
    shutdown: Mutex<Option<oneshot::Sender<()>>>,
    sink: Arc<Mutex<StatSink>>,
}

impl StatAggregator {
    /// Create an aggregator flushing to `sink` every [`FLUSH_INTERVAL`]
    pub fn new(sink: StatSink) -> Self {
        Self::with_interval(sink, FLUSH_INTERVAL)
    }

    /// Create an aggregator with a caller-chosen flush interval
    pub fn with_interval(sink: StatSink, interval: Duration) -> Self {
        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let sink = Arc::new(Mutex::new(sink));

        tokio::spawn(run_worker(rx, shutdown_rx, Arc::clone(&sink), interval));

        Self {
            tx,
            closed: AtomicBool::new(false),
            shutdown: Mutex::new(Some(shutdown_tx)),
            sink,
        }
    }

    /// Queue one latency observation for `label`.
    ///
    /// Never blocks. After [`close`](Self::close) the call is a silent
    /// no-op; while the queue is full the event is dropped with a
    /// diagnostic.
    pub fn record(&self, label: &str, cost_ms: u64) {
        if self.closed.load(Ordering::Acquire) {
            return;
        }
        let record = StatRecord {
            label: label.to_string(),
            cost_ms,
        };
        match self.tx.try_send(record) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("stat queue full, dropping record for {}", label);
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {}
        }
    }

    /// Stop the background worker.
    ///
    /// Idempotent. No report is emitted after close (the pending histograms
    /// are discarded, not flushed) and later `record` calls become no-ops.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        let sender = self.shutdown.lock().ok().and_then(|mut slot| slot.take());
        if let Some(tx) = sender {
            let _ = tx.send(());
        }
    }

    /// Swap the destination the periodic report is written to.
    ///
    /// Safe to call at any time; the next flush uses the new sink.
    pub fn set_sink(&self, sink: StatSink) {
        if let Ok(mut slot) = self.sink.lock() {
            *slot = sink;
        }
    }
}

async fn run_worker(
    mut rx: mpsc::Receiver<StatRecord>,
    mut shutdown_rx: oneshot::Receiver<()>,
    sink: Arc<Mutex<StatSink>>,
    interval: Duration,
) {
    let mut table = StatTable::default();
    // interval_at: plain interval() fires its first tick immediately, which
    // would flush an empty table at startup
    let mut ticker = time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = &mut shutdown_rx => break,
            record = rx.recv() => match record {
                Some(record) => table.observe(&record.label, record.cost_ms),
                None => break,
            },
            _ = ticker.tick() => {
                // Fold in everything enqueued before the tick fired, so the
                // report reflects all earlier records
                while let Ok(record) = rx.try_recv() {
                    table.observe(&record.label, record.cost_ms);
                }
                flush(&table, &sink);
                table.clear();
            }
        }
    }
}

fn flush(table: &StatTable, sink: &Arc<Mutex<StatSink>>) {
    if table.is_empty() {
        return;
    }
    let report = table.render();
    if let Ok(mut sink) = sink.lock() {
        if let Err(e) = sink.write_all(report.as_bytes()) {
            warn!("write stat report: {}", e);
        }
    }
}
