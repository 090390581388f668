//! Per-label latency accounting
//!
//! Keeps a coarse six-bucket histogram per label plus count, max, and a
//! decaying average, and renders the periodic report.

use std::collections::BTreeMap;
use std::fmt::Write as _;

/// Exclusive upper bounds of the first five latency buckets in
/// milliseconds; the sixth bucket is unbounded
const BUCKET_BOUNDS: [u64; 5] = [10, 50, 100, 200, 500];

/// Number of latency buckets
pub const NUM_BUCKETS: usize = 6;

/// Title block of the periodic report; columns are tab-separated
const REPORT_TITLE: &str = "--------------Stat Info-------------------\n\
                            Cmd\tTotal\tMaxTime\tAverageTime\t[10)\t[10,50)\t[50,100)\t[100,200)\t[200,500)\t[500)";

fn bucket_index(cost_ms: u64) -> usize {
    BUCKET_BOUNDS
        .iter()
        .position(|&bound| cost_ms < bound)
        .unwrap_or(NUM_BUCKETS - 1)
}

/// Running tallies for one label
#[derive(Debug, Clone, Default)]
pub struct LabelStats {
    total: u64,
    max_ms: u64,
    avg_ms: f64,
    buckets: [u64; NUM_BUCKETS],
}

impl LabelStats {
    /// Fold one latency sample in.
    ///
    /// The average is the cheap decaying form `avg = (avg + sample) / 2`,
    /// not a true mean.
    pub fn observe(&mut self, cost_ms: u64) {
        if self.total == 0 {
            self.max_ms = cost_ms;
            self.avg_ms = cost_ms as f64;
        } else {
            if cost_ms > self.max_ms {
                self.max_ms = cost_ms;
            }
            self.avg_ms = (self.avg_ms + cost_ms as f64) / 2.0;
        }
        self.total += 1;
        self.buckets[bucket_index(cost_ms)] += 1;
    }

    /// Number of samples observed
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Largest latency observed, in milliseconds
    pub fn max_ms(&self) -> u64 {
        self.max_ms
    }

    /// Decaying average latency in milliseconds
    pub fn average_ms(&self) -> f64 {
        self.avg_ms
    }

    /// Per-bucket sample counts, ranges `[0,10) [10,50) [50,100) [100,200)
    /// [200,500) [500,inf)`
    pub fn buckets(&self) -> &[u64; NUM_BUCKETS] {
        &self.buckets
    }
}

/// Label-to-histogram table cleared in bulk at every flush
#[derive(Debug, Default)]
pub struct StatTable {
    entries: BTreeMap<String, LabelStats>,
}

impl StatTable {
    /// Fold one (label, latency) observation into the table
    pub fn observe(&mut self, label: &str, cost_ms: u64) {
        self.entries.entry(label.to_string()).or_default().observe(cost_ms);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Tallies recorded for `label`, if any
    pub fn get(&self, label: &str) -> Option<&LabelStats> {
        self.entries.get(label)
    }

    /// Render the tabular report: the title block, then one tab-separated
    /// row per label (sorted by label) with the integer-truncated average.
    pub fn render(&self) -> String {
        let mut out = String::from(REPORT_TITLE);
        for (label, stats) in &self.entries {
            out.push('\n');
            let _ = write!(
                out,
                "{}\t{}\t{}\t{}",
                label, stats.total, stats.max_ms, stats.avg_ms as u64
            );
            for bucket in &stats.buckets {
                let _ = write!(out, "\t{}", bucket);
            }
        }
        out.push('\n');
        out
    }
}
