//! Per-key aggregate state.

use crate::observer::distribution::TimeDistribution;
use crate::observer::ring::SampleRing;
use crate::observer::types::Sample;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

/// Quantized time meaning "not observed yet".
const UNSET: i64 = i64::MIN;

/// Aggregated state of one message key.
///
/// Counters and timestamps are atomics, the ring and the distribution
/// carry their own locks; no lock spans the whole entry.
pub(crate) struct MessageEntry {
    key: String,
    count: AtomicU64,
    first: AtomicI64,
    latest: AtomicI64,
    samples: SampleRing,
    distribution: Option<TimeDistribution>,
}

impl MessageEntry {
    pub(crate) fn new(
        key: String,
        max_samples: usize,
        distribution: Option<TimeDistribution>,
    ) -> Self {
        Self {
            key,
            count: AtomicU64::new(0),
            first: AtomicI64::new(UNSET),
            latest: AtomicI64::new(UNSET),
            samples: SampleRing::new(max_samples),
            distribution,
        }
    }

    /// Record one occurrence at quantized time `now`.
    ///
    /// Counting is exact. Once the ring has filled, a sample is retained
    /// at most once per quantized time unit. The count check and the
    /// rotation are not atomic together: near the boundary a sample may be
    /// retained or skipped slightly off the rate rule, the ring itself is
    /// never corrupted.
    pub(crate) fn push(&self, now: i64, sample: Sample) {
        let cnt = self.count.fetch_add(1, Ordering::AcqRel) + 1;

        // Only the first writer moves `first` away from UNSET
        let _ = self
            .first
            .compare_exchange(UNSET, now, Ordering::AcqRel, Ordering::Acquire);

        if let Some(distribution) = &self.distribution {
            distribution.add(now);
        }

        let previous = self.latest.fetch_max(now, Ordering::AcqRel);
        if cnt > self.samples.capacity() as u64 && now <= previous {
            return;
        }

        self.samples.rotate(sample);
    }

    pub(crate) fn key(&self) -> &str {
        &self.key
    }

    pub(crate) fn count(&self) -> u64 {
        self.count.load(Ordering::Acquire)
    }

    pub(crate) fn first(&self) -> Option<i64> {
        Some(self.first.load(Ordering::Acquire)).filter(|&t| t != UNSET)
    }

    pub(crate) fn latest(&self) -> Option<i64> {
        Some(self.latest.load(Ordering::Acquire)).filter(|&t| t != UNSET)
    }

    pub(crate) fn samples(&self) -> &SampleRing {
        &self.samples
    }

    pub(crate) fn distribution(&self) -> Option<&TimeDistribution> {
        self.distribution.as_ref()
    }
}
