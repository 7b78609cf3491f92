//! Observer behavior tests.

mod common;

use common::{keys, observer, sample_data, Unmarshalable};
use logz::core::{ConfigBuilder, Retention};
use logz::observer::{Observer, PreparedObserver};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[test]
fn test_basic_scenario() {
    let observer = observer(5, 10);

    observer.observe_message("test", 1);
    observer.observe_message("test", 2);
    observer.observe_message("test", 3);
    observer.observe_message("other-msg", 4);

    let entries = observer.entries();
    assert_eq!(keys(&entries), vec!["other-msg", "test"]);

    let entry = observer.find("test").unwrap();
    assert_eq!(entry.count, 3);
    assert_eq!(sample_data(&entry), vec![json!(3), json!(2), json!(1)]);
    assert!(entry.samples.iter().all(|s| s.msg == "test"));
    assert!(entry.first.unwrap() <= entry.last.unwrap());
}

#[test]
fn test_zero_value_observer_uses_defaults() {
    let observer = Observer::default();
    observer.observe_message("hello", ());

    let settings = observer.settings().unwrap();
    assert_eq!(settings.max_cardinality, 100);
    assert_eq!(settings.max_samples, 10);
    assert_eq!(settings.sampling_interval, 1_000_000);
    assert_eq!(settings.dist_resolution, 100);
    // 168h in 1ms units
    assert_eq!(settings.dist_retention, Some(604_800_000));
}

#[test]
fn test_count_exact_under_concurrency() {
    let observer = Arc::new(observer(10, 3));
    let threads = 8;
    let per_thread = 1_000;

    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let observer = Arc::clone(&observer);
            thread::spawn(move || {
                for i in 0..per_thread {
                    observer.observe_message("hot", json!({"thread": t, "i": i}));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let entry = observer.find("hot").unwrap();
    assert_eq!(entry.count, threads * per_thread);
    assert!(entry.samples.len() <= 3);
    assert!(!entry.samples.is_empty());
    assert_eq!(entry.buckets.iter().map(|b| b.count).sum::<u64>(), entry.count);
}

#[test]
fn test_cardinality_cap() {
    let (k, m) = (10, 15);
    let observer = observer(k, 10);

    for i in 0..(k + m) {
        observer.observe_message(&format!("key-{}", i), i);
    }

    assert_eq!(observer.entries().len(), k as usize);
    assert_eq!(observer.cardinality(), k);

    let other = observer.other(false);
    assert_eq!(other.count, u64::from(m));
    assert!(other.samples.is_empty());
    assert_eq!(observer.other(true).samples.len(), 10);
}

#[test]
fn test_cardinality_cap_under_racing_admissions() {
    let observer = Arc::new(observer(20, 1));

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let observer = Arc::clone(&observer);
            thread::spawn(move || {
                for i in 0..50 {
                    observer.observe_message(&format!("t{}-{}", t, i), ());
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(observer.entries().len(), 20);
    assert_eq!(observer.other(false).count, 400 - 20);
}

#[test]
fn test_known_keys_still_counted_after_cap() {
    let observer = observer(1, 10);
    observer.observe_message("known", ());
    observer.observe_message("unknown", ());
    observer.observe_message("known", ());

    assert_eq!(observer.find("known").unwrap().count, 2);
    assert!(observer.find("unknown").is_none());
    assert_eq!(observer.other(false).count, 1);
}

#[test]
fn test_sample_bound() {
    let observer = observer(5, 4);
    for i in 0..4 {
        observer.observe_message("bounded", i);
    }

    let entry = observer.find("bounded").unwrap();
    assert_eq!(sample_data(&entry), vec![json!(3), json!(2), json!(1), json!(0)]);

    for i in 4..100 {
        observer.observe_message("bounded", i);
    }
    let entry = observer.find("bounded").unwrap();
    assert_eq!(entry.count, 100);
    assert!(entry.samples.len() <= 4);
}

#[test]
fn test_zero_samples_counts_only() {
    let observer = observer(5, 0);
    for i in 0..10 {
        observer.observe_message("counted", i);
    }

    let entry = observer.find("counted").unwrap();
    assert_eq!(entry.count, 10);
    assert!(entry.samples.is_empty());
}

#[test]
fn test_filter_message_groups_dynamic_parts() {
    let observer = PreparedObserver::new(ConfigBuilder::new().filter_message(true).build().unwrap());

    observer.observe_message("test foo123", 1);
    observer.observe_message("test bar456", 2);

    let entries = observer.entries();
    assert_eq!(keys(&entries), vec!["test X"]);

    let entry = observer.find("test baz789").unwrap();
    assert_eq!(entry.message, "test X");
    assert_eq!(entry.count, 2);
    // Samples keep the original message
    let messages: Vec<&str> = entry.samples.iter().map(|s| s.msg.as_str()).collect();
    assert_eq!(messages, vec!["test bar456", "test foo123"]);
}

#[test]
fn test_histogram_retention() {
    let observer = PreparedObserver::new(
        ConfigBuilder::new()
            .sampling_interval(Duration::from_millis(1))
            .dist_retention_period(Retention::Limited(Duration::from_millis(1)))
            .build()
            .unwrap(),
    );

    observer.observe_message("aging", ());
    thread::sleep(Duration::from_millis(20));
    observer.observe_message("aging", ());

    let entry = observer.find("aging").unwrap();
    assert_eq!(entry.count, 2);
    assert_eq!(entry.buckets.len(), 1);

    let last = entry.last.unwrap();
    let oldest = entry.buckets[0].from;
    assert!(oldest >= last - chrono::Duration::milliseconds(1));
}

#[test]
fn test_entry_serializes_with_samples() {
    let observer = observer(5, 2);
    observer.observe_message("json", json!({"k": "v"}));

    let value = serde_json::to_value(observer.find("json").unwrap()).unwrap();
    assert_eq!(value["message"], "json");
    assert_eq!(value["count"], 1);
    assert_eq!(value["samples"][0]["msg"], "json");
    assert_eq!(value["samples"][0]["data"], json!({"k": "v"}));
    assert!(value["samples"][0]["time"].is_string());
}

#[test]
fn test_marshal_failure_only_at_export() {
    let observer = observer(5, 2);
    observer.observe_message("broken", Unmarshalable);

    let entry = observer.find("broken").unwrap();
    assert_eq!(entry.count, 1);
    assert!(serde_json::to_value(&entry).is_err());
    assert!(serde_json::to_value(observer.entries()).is_ok());
}

#[test]
fn test_lazy_observer_shared_between_threads() {
    let observer = Arc::new(Observer::default());

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let observer = Arc::clone(&observer);
            thread::spawn(move || {
                for _ in 0..100 {
                    observer.observe_message("shared", ());
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(observer.find("shared").unwrap().count, 400);
    assert_eq!(observer.cardinality(), 1);
}
