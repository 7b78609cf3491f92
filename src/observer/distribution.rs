//! Time distribution of observations with bucket retention.

use crate::histogram::{Bucket, Collector};
use parking_lot::Mutex;

/// Bounded histogram of quantized observation times.
///
/// Adding a point and pruning stale buckets happen in one critical section
/// so that a bucket is never pruned while it is being merged.
pub struct TimeDistribution {
    collector: Mutex<Collector>,
    /// Quantized retention, `None` keeps buckets forever
    retention: Option<i64>,
}

impl TimeDistribution {
    /// Create a distribution with at most `resolution` buckets
    pub fn new(resolution: usize, retention: Option<i64>) -> Self {
        Self {
            collector: Mutex::new(Collector::new(resolution)),
            retention,
        }
    }

    /// Record an observation at quantized time `now`, returns the number
    /// of pruned buckets
    pub fn add(&self, now: i64) -> usize {
        let mut collector = self.collector.lock();
        let mut pruned = 0;

        // Stale buckets go before the point is added, otherwise a merge
        // could fold `now` into a stale bucket and prune it with it.
        if let Some(retention) = self.retention {
            let horizon = now.saturating_sub(retention);
            while collector.first().map_or(false, |b| b.min < horizon) {
                collector.pop_oldest();
                pruned += 1;
            }
        }

        collector.add(now);
        pruned
    }

    /// Copy of the buckets in ascending time order
    pub fn buckets(&self) -> Vec<Bucket> {
        self.collector.lock().buckets().to_vec()
    }
}
