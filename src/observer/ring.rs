//! Fixed-capacity ring of the most recent samples.
//!
//! The ring always holds exactly `capacity` slots. Unwritten slots are
//! `None` tombstones, a rotation overwrites the oldest slot with the newest
//! sample, so the ring never grows nor shrinks during its lifetime.

use crate::observer::types::Sample;
use parking_lot::Mutex;

struct Slots {
    slots: Box<[Option<Sample>]>,
    /// Index of the oldest slot, next to be overwritten
    next: usize,
}

/// Sample ring buffer safe for concurrent rotation.
pub struct SampleRing {
    inner: Mutex<Slots>,
    capacity: usize,
}

impl SampleRing {
    /// Create a ring filled with tombstones. Zero capacity is allowed,
    /// such a ring drops every sample.
    pub fn new(capacity: usize) -> Self {
        let slots = (0..capacity).map(|_| None).collect::<Vec<_>>();

        Self {
            inner: Mutex::new(Slots {
                slots: slots.into_boxed_slice(),
                next: 0,
            }),
            capacity,
        }
    }

    /// Evict the oldest slot and store `sample` as the newest one
    pub fn rotate(&self, sample: Sample) {
        if self.capacity == 0 {
            return;
        }

        let mut inner = self.inner.lock();
        let idx = inner.next;
        inner.slots[idx] = Some(sample);
        inner.next = (idx + 1) % self.capacity;
    }

    /// Written samples, most recent first
    pub fn snapshot(&self) -> Vec<Sample> {
        if self.capacity == 0 {
            return Vec::new();
        }

        let inner = self.inner.lock();
        let mut result = Vec::with_capacity(self.capacity);

        for back in 1..=self.capacity {
            let idx = (inner.next + self.capacity - back) % self.capacity;
            match &inner.slots[idx] {
                Some(sample) => result.push(sample.clone()),
                // Slots are written in order, the rest are tombstones too
                None => break,
            }
        }

        result
    }

    /// Number of written slots
    pub fn len(&self) -> usize {
        self.inner.lock().slots.iter().filter(|s| s.is_some()).count()
    }

    /// Check if nothing was written yet
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Slot count, constant for the ring's lifetime
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
