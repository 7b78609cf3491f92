//! Message observer: the concurrent registry of per-key aggregates.
//!
//! Every call to [`Observer::observe_message`] is counted exactly. The
//! first `max_cardinality` distinct keys get their own entry, later keys
//! are folded into a shared "other" entry. Each entry keeps a bounded ring
//! of recent samples and a bounded time histogram, so memory stays bounded
//! regardless of input cardinality.
//!
//! # Example
//!
//! ```
//! use logz::observer::Observer;
//!
//! let mut observer = Observer::default();
//! observer.config.max_cardinality = Some(5);
//!
//! observer.observe_message("cache miss", serde_json::json!({"key": "user:1"}));
//! observer.observe_message("cache miss", serde_json::json!({"key": "user:2"}));
//!
//! let entry = observer.find("cache miss").unwrap();
//! assert_eq!(entry.count, 2);
//! assert_eq!(entry.samples.len(), 2);
//! ```

pub mod distribution;
pub mod entry;
pub mod ring;
pub mod types;

pub use types::{Bucket, Entry, Payload, Sample};

use crate::core::{Config, Settings};
use crate::filter;
use crate::observer::distribution::TimeDistribution;
use crate::observer::entry::MessageEntry;
use chrono::{DateTime, TimeZone, Utc};
use dashmap::mapref::entry::Entry as Slot;
use dashmap::DashMap;
use once_cell::sync::OnceCell;
use std::borrow::Cow;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

/// Sink for observed messages, implemented by both observer kinds.
pub trait Observe: Send + Sync {
    /// Record one occurrence of `msg` with a shared payload
    fn observe_shared(&self, msg: &str, data: Arc<dyn Payload>);
}

/// Observer with resolved settings, ready for ingestion.
pub struct PreparedObserver {
    settings: Settings,
    entries: DashMap<String, Arc<MessageEntry>>,
    /// Number of admitted keys, never above `max_cardinality`
    cardinality: AtomicU32,
    other: MessageEntry,
    overflow_reported: AtomicBool,
}

impl PreparedObserver {
    /// Create an observer, resolving defaults immediately
    pub fn new(config: Config) -> Self {
        let settings = config.resolve();
        let other = MessageEntry::new(
            String::new(),
            settings.max_samples as usize,
            new_distribution(&settings),
        );

        Self {
            settings,
            entries: DashMap::new(),
            cardinality: AtomicU32::new(0),
            other,
            overflow_reported: AtomicBool::new(false),
        }
    }

    /// Resolved settings
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Record one occurrence of `msg`
    pub fn observe_message<P: Payload + 'static>(&self, msg: &str, data: P) {
        self.observe_shared(msg, Arc::new(data));
    }

    fn observe(&self, msg: &str, data: Arc<dyn Payload>) {
        let time = Utc::now();
        let now = self
            .settings
            .quantize(time.timestamp_nanos_opt().unwrap_or(i64::MAX));
        let sample = Sample {
            msg: msg.to_owned(),
            data,
            time,
        };

        let key = self.admission_key(msg);

        match self.admit(&key) {
            Some(entry) => entry.push(now, sample),
            None => self.other.push(now, sample),
        }
    }

    fn admission_key<'a>(&self, msg: &'a str) -> Cow<'a, str> {
        if self.settings.filter_message {
            filter::dynamic(msg, filter::DEFAULT_MAX_LEN)
        } else {
            Cow::Borrowed(msg)
        }
    }

    /// Resolves the entry for `key`, creating it while the cardinality
    /// budget allows. `None` routes the call to "other".
    fn admit(&self, key: &str) -> Option<Arc<MessageEntry>> {
        if let Some(found) = self.entries.get(key) {
            return Some(Arc::clone(found.value()));
        }

        let max = self.settings.max_cardinality;
        if self.cardinality.load(Ordering::Acquire) >= max {
            self.report_overflow(key);
            return None;
        }

        let admitted = match self.entries.entry(key.to_owned()) {
            // Lost the race to another writer of the same key
            Slot::Occupied(slot) => return Some(Arc::clone(slot.get())),
            Slot::Vacant(slot) => {
                let reserved = self
                    .cardinality
                    .fetch_update(Ordering::AcqRel, Ordering::Acquire, |c| {
                        (c < max).then_some(c + 1)
                    });
                if reserved.is_err() {
                    None
                } else {
                    let entry = Arc::new(MessageEntry::new(
                        key.to_owned(),
                        self.settings.max_samples as usize,
                        new_distribution(&self.settings),
                    ));
                    slot.insert(Arc::clone(&entry));
                    Some(entry)
                }
            },
        };

        match &admitted {
            Some(_) => tracing::debug!(
                observer = %self.settings.name,
                key,
                cardinality = self.cardinality.load(Ordering::Relaxed),
                "Admitted new message key"
            ),
            None => self.report_overflow(key),
        }

        admitted
    }

    fn report_overflow(&self, key: &str) {
        if self.overflow_reported.load(Ordering::Relaxed)
            || self.overflow_reported.swap(true, Ordering::Relaxed)
        {
            return;
        }

        tracing::warn!(
            observer = %self.settings.name,
            max_cardinality = self.settings.max_cardinality,
            key,
            "Message cardinality limit reached, new keys are grouped as other"
        );
    }

    /// Number of admitted keys
    pub fn cardinality(&self) -> u32 {
        self.cardinality.load(Ordering::Acquire)
    }

    /// Snapshot of all admitted entries without samples
    pub fn entries(&self) -> Vec<Entry> {
        self.collect_entries(false)
    }

    /// Snapshot of all admitted entries with samples
    pub fn entries_with_samples(&self) -> Vec<Entry> {
        self.collect_entries(true)
    }

    fn collect_entries(&self, with_samples: bool) -> Vec<Entry> {
        // Shard locks are released before entries are exported
        let entries: Vec<Arc<MessageEntry>> = self
            .entries
            .iter()
            .map(|item| Arc::clone(item.value()))
            .collect();

        entries
            .iter()
            .map(|entry| self.export(entry, with_samples))
            .collect()
    }

    /// Entry with samples for `key`, normalized like observed messages
    pub fn find(&self, key: &str) -> Option<Entry> {
        let key = self.admission_key(key);
        let entry = self.entries.get(&*key).map(|e| Arc::clone(e.value()))?;
        Some(self.export(&entry, true))
    }

    /// Catch-all entry for keys beyond the cardinality limit
    pub fn other(&self, with_samples: bool) -> Entry {
        self.export(&self.other, with_samples)
    }

    fn export(&self, entry: &MessageEntry, with_samples: bool) -> Entry {
        let buckets = entry
            .distribution()
            .map(|dist| {
                dist.buckets()
                    .iter()
                    .map(|b| Bucket {
                        from: self.to_time(b.min),
                        to: self.to_time(b.max),
                        count: b.count,
                    })
                    .collect()
            })
            .unwrap_or_default();

        Entry {
            message: entry.key().to_owned(),
            count: entry.count(),
            first: entry.first().map(|q| self.to_time(q)),
            last: entry.latest().map(|q| self.to_time(q)),
            samples: if with_samples {
                entry.samples().snapshot()
            } else {
                Vec::new()
            },
            buckets,
        }
    }

    fn to_time(&self, quantized: i64) -> DateTime<Utc> {
        Utc.timestamp_nanos(self.settings.unquantize(quantized))
    }
}

impl Observe for PreparedObserver {
    fn observe_shared(&self, msg: &str, data: Arc<dyn Payload>) {
        self.observe(msg, data);
    }
}

fn new_distribution(settings: &Settings) -> Option<TimeDistribution> {
    (settings.dist_resolution > 0)
        .then(|| TimeDistribution::new(settings.dist_resolution, settings.dist_retention))
}

/// Observer that resolves its configuration on first ingestion.
///
/// `Observer::default()` is usable directly; `config` may be adjusted
/// until the first observed message, later changes have no effect.
#[derive(Default)]
pub struct Observer {
    /// Configuration applied at first use
    pub config: Config,
    prepared: OnceCell<PreparedObserver>,
}

impl Observer {
    /// Create an observer with lazily applied configuration
    pub fn new(config: Config) -> Self {
        Self {
            config,
            prepared: OnceCell::new(),
        }
    }

    /// Observer name, identifies it in a group
    pub fn name(&self) -> &str {
        match self.prepared.get() {
            Some(prepared) => &prepared.settings.name,
            None => &self.config.name,
        }
    }

    fn prepared(&self) -> &PreparedObserver {
        self.prepared
            .get_or_init(|| PreparedObserver::new(self.config.clone()))
    }

    /// Resolved settings, `None` before the first observed message
    pub fn settings(&self) -> Option<&Settings> {
        self.prepared.get().map(PreparedObserver::settings)
    }

    /// Record one occurrence of `msg`
    pub fn observe_message<P: Payload + 'static>(&self, msg: &str, data: P) {
        self.prepared().observe_shared(msg, Arc::new(data));
    }

    /// Number of admitted keys
    pub fn cardinality(&self) -> u32 {
        self.prepared.get().map_or(0, PreparedObserver::cardinality)
    }

    /// Snapshot of all admitted entries without samples
    pub fn entries(&self) -> Vec<Entry> {
        self.prepared
            .get()
            .map(PreparedObserver::entries)
            .unwrap_or_default()
    }

    /// Snapshot of all admitted entries with samples
    pub fn entries_with_samples(&self) -> Vec<Entry> {
        self.prepared
            .get()
            .map(PreparedObserver::entries_with_samples)
            .unwrap_or_default()
    }

    /// Entry with samples for `key`
    pub fn find(&self, key: &str) -> Option<Entry> {
        self.prepared.get()?.find(key)
    }

    /// Catch-all entry for keys beyond the cardinality limit
    pub fn other(&self, with_samples: bool) -> Entry {
        self.prepared
            .get()
            .map(|p| p.other(with_samples))
            .unwrap_or_default()
    }
}

impl Observe for Observer {
    fn observe_shared(&self, msg: &str, data: Arc<dyn Payload>) {
        self.prepared().observe_shared(msg, data);
    }
}
