//! Observed data types and exported views.

use chrono::{DateTime, Utc};
use serde::ser::{Error as _, SerializeStruct};
use serde::{Serialize, Serializer};
use std::fmt;
use std::sync::Arc;

/// Opaque data attached to an observed message.
///
/// Conversion to JSON is deferred until a sample is exported, so that
/// the ingestion hot path never pays for marshaling. Every
/// `Serialize + Send + Sync` type is a payload.
pub trait Payload: Send + Sync {
    /// Marshal the payload
    fn to_json(&self) -> serde_json::Result<serde_json::Value>;
}

impl<T: Serialize + Send + Sync> Payload for T {
    fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }
}

/// A single retained occurrence of a message.
#[derive(Clone)]
pub struct Sample {
    /// Original (unfiltered) message
    pub msg: String,
    /// Attached payload
    pub data: Arc<dyn Payload>,
    /// Wall-clock time of the observation
    pub time: DateTime<Utc>,
}

impl Sample {
    /// Marshal the payload, errors are reported to the caller of the export
    pub fn data_json(&self) -> serde_json::Result<serde_json::Value> {
        self.data.to_json()
    }
}

impl fmt::Debug for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sample")
            .field("msg", &self.msg)
            .field("time", &self.time)
            .finish_non_exhaustive()
    }
}

impl Serialize for Sample {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let data = self.data.to_json().map_err(S::Error::custom)?;

        let mut state = serializer.serialize_struct("Sample", 3)?;
        state.serialize_field("msg", &self.msg)?;
        state.serialize_field("data", &data)?;
        state.serialize_field("time", &self.time)?;
        state.end()
    }
}

/// Count of observations in a time interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Bucket {
    /// Interval start
    pub from: DateTime<Utc>,
    /// Interval end
    pub to: DateTime<Utc>,
    /// Observations in the interval
    pub count: u64,
}

/// Point-in-time snapshot of aggregated information about a message key.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Entry {
    /// Message key, empty for "other"
    pub message: String,
    /// Exact number of observations
    pub count: u64,
    /// First observation, `None` until observed
    pub first: Option<DateTime<Utc>>,
    /// Latest observation, `None` until observed
    pub last: Option<DateTime<Utc>>,
    /// Retained samples, most recent first
    pub samples: Vec<Sample>,
    /// Time distribution, oldest first
    pub buckets: Vec<Bucket>,
}

impl Entry {
    /// Highest bucket count, useful to scale histograms
    pub fn max_bucket_count(&self) -> u64 {
        self.buckets.iter().map(|b| b.count).max().unwrap_or(0)
    }
}
