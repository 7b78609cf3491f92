//! Dynamic histogram with a bounded number of buckets.
//!
//! Values are grouped into contiguous, non-overlapping buckets kept in
//! ascending order. When a new value does not fall into an existing bucket
//! a single-point bucket is inserted, and once the bucket limit is exceeded
//! the two adjacent buckets with the narrowest merged span are combined.
//! Memory is O(limit) regardless of the number of values added.

/// A contiguous range of values and the number of values seen in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bucket {
    /// Smallest value in the bucket
    pub min: i64,
    /// Largest value in the bucket
    pub max: i64,
    /// Number of values
    pub count: u64,
}

impl Bucket {
    fn point(value: i64) -> Self {
        Self {
            min: value,
            max: value,
            count: 1,
        }
    }

    fn contains(&self, value: i64) -> bool {
        self.min <= value && value <= self.max
    }

    fn merge(&mut self, other: &Bucket) {
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
        self.count += other.count;
    }
}

/// Bounded-bucket histogram collector.
///
/// Not synchronized, callers guard it with their own lock.
#[derive(Debug, Clone)]
pub struct Collector {
    limit: usize,
    buckets: Vec<Bucket>,
}

impl Collector {
    /// Create a collector holding at most `limit` buckets (at least one).
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            limit,
            buckets: Vec::new(),
        }
    }

    /// Add a value
    pub fn add(&mut self, value: i64) {
        let idx = self.buckets.partition_point(|b| b.max < value);

        if let Some(bucket) = self.buckets.get_mut(idx) {
            if bucket.contains(value) {
                bucket.count += 1;
                return;
            }
        }

        self.buckets.insert(idx, Bucket::point(value));

        if self.buckets.len() > self.limit {
            self.merge_narrowest();
        }
    }

    fn merge_narrowest(&mut self) {
        let Some(idx) = self
            .buckets
            .windows(2)
            .enumerate()
            .min_by_key(|(_, pair)| pair[1].max.saturating_sub(pair[0].min))
            .map(|(i, _)| i)
        else {
            return;
        };

        let next = self.buckets.remove(idx + 1);
        self.buckets[idx].merge(&next);
    }

    /// Buckets in ascending order
    pub fn buckets(&self) -> &[Bucket] {
        &self.buckets
    }

    /// Oldest (lowest) bucket
    pub fn first(&self) -> Option<&Bucket> {
        self.buckets.first()
    }

    /// Remove and return the lowest bucket
    pub fn pop_oldest(&mut self) -> Option<Bucket> {
        if self.buckets.is_empty() {
            None
        } else {
            Some(self.buckets.remove(0))
        }
    }

    /// Number of buckets
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// Check if no value was added
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Bucket limit
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Total number of values across buckets
    pub fn total(&self) -> u64 {
        self.buckets.iter().map(|b| b.count).sum()
    }
}
