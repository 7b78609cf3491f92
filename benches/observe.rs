//! Ingestion hot path benchmarks.
//!
//! Observing a message must stay cheap enough to sit on every log call:
//! no payload marshaling, one map lookup, a few atomics and two short
//! critical sections.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use logz::core::ConfigBuilder;
use logz::filter;
use logz::observer::PreparedObserver;
use serde_json::json;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn observer(filter_message: bool) -> PreparedObserver {
    PreparedObserver::new(
        ConfigBuilder::new()
            .max_cardinality(100)
            .filter_message(filter_message)
            .build()
            .expect("valid config"),
    )
}

/// Repeated key: lookup plus counter and ring updates
fn bench_observe_known_key(c: &mut Criterion) {
    let mut group = c.benchmark_group("observe_known_key");

    let o = observer(false);
    group.bench_function("unit_payload", |b| {
        b.iter(|| o.observe_message(black_box("request served"), ()));
    });

    let o = observer(false);
    group.bench_function("json_payload", |b| {
        b.iter(|| {
            o.observe_message(
                black_box("request served"),
                json!({"status": 200, "path": "/api/users"}),
            );
        });
    });

    let o = observer(true);
    group.bench_function("filtered", |b| {
        b.iter(|| o.observe_message(black_box("request 12345 served in 17ms"), ()));
    });

    group.finish();
}

/// Keys beyond the cardinality cap go to "other"
fn bench_observe_overflow(c: &mut Criterion) {
    let o = observer(false);
    for i in 0..100 {
        o.observe_message(&format!("key {}", i), ());
    }

    let keys: Vec<String> = (100..1_100).map(|i| format!("key {}", i)).collect();
    let mut i = 0;
    c.bench_function("observe_overflow", |b| {
        b.iter(|| {
            i = (i + 1) % keys.len();
            o.observe_message(black_box(&keys[i]), ());
        });
    });
}

fn bench_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter_dynamic");

    for msg in [
        "static message without numbers",
        "user 42 logged in from 10.0.0.1 after 3 attempts",
    ] {
        group.bench_with_input(BenchmarkId::from_parameter(msg.len()), msg, |b, msg| {
            b.iter(|| filter::dynamic(black_box(msg), filter::DEFAULT_MAX_LEN));
        });
    }

    group.finish();
}

/// Contention on one key from several writer threads
fn bench_concurrent(c: &mut Criterion) {
    let mut group = c.benchmark_group("observe_concurrent");

    for threads in [2, 4, 8] {
        group.bench_with_input(BenchmarkId::from_parameter(threads), &threads, |b, &threads| {
            let o = Arc::new(observer(false));
            b.iter(|| {
                let handles: Vec<_> = (0..threads)
                    .map(|_| {
                        let o = Arc::clone(&o);
                        thread::spawn(move || {
                            for _ in 0..1_000 {
                                o.observe_message("contended", ());
                            }
                        })
                    })
                    .collect();
                for handle in handles {
                    handle.join().expect("writer thread");
                }
            });
        });
    }

    group.finish();
}

fn bench_export(c: &mut Criterion) {
    let o = observer(false);
    for i in 0..100 {
        for j in 0..20 {
            o.observe_message(&format!("key {}", i), j);
        }
    }

    c.bench_function("entries_with_samples_100", |b| {
        b.iter(|| black_box(o.entries_with_samples()));
    });
}

criterion_group! {
    name = hot_paths;
    config = Criterion::default()
        .sample_size(200)
        .measurement_time(Duration::from_secs(5))
        .warm_up_time(Duration::from_secs(2));
    targets = bench_observe_known_key,
              bench_observe_overflow,
              bench_filter,
              bench_concurrent,
              bench_export
}

criterion_main!(hot_paths);
