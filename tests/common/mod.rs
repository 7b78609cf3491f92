//! Common test utilities and fixtures.

#![allow(dead_code)]

use logz::core::ConfigBuilder;
use logz::observer::{Entry, Payload, PreparedObserver};
use serde_json::Value;

/// Observer with explicit cardinality and sample limits.
pub fn observer(max_cardinality: u32, max_samples: u32) -> PreparedObserver {
    PreparedObserver::new(
        ConfigBuilder::new()
            .max_cardinality(max_cardinality)
            .max_samples(max_samples)
            .build()
            .unwrap(),
    )
}

/// Marshaled payloads of an entry's samples, in export order.
pub fn sample_data(entry: &Entry) -> Vec<Value> {
    entry
        .samples
        .iter()
        .map(|s| s.data_json().unwrap())
        .collect()
}

/// Sorted message keys of entries.
pub fn keys(entries: &[Entry]) -> Vec<String> {
    let mut keys: Vec<String> = entries.iter().map(|e| e.message.clone()).collect();
    keys.sort();
    keys
}

/// Payload that always fails to marshal.
pub struct Unmarshalable;

impl Payload for Unmarshalable {
    fn to_json(&self) -> serde_json::Result<Value> {
        Err(serde::ser::Error::custom("refusing to marshal"))
    }
}
