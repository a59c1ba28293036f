//! Benchmarks for Kestrel storage operations.
//!
//! The headline comparison is indexed point lookup against the full-file
//! linear scan the index replaces.

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use kestrel_common::EngineConfig;
use kestrel_engine::StorageEngine;
use tempfile::TempDir;

const DATASET: usize = 2_000;

fn loaded_engine() -> (StorageEngine, TempDir) {
    let dir = TempDir::new().unwrap();
    let config = EngineConfig {
        fsync_enabled: false,
        ..EngineConfig::in_dir(dir.path())
    };
    let mut db = StorageEngine::open(config).unwrap();
    for i in 0..DATASET {
        db.insert(&format!("bench:{}", i), &format!("Data_{}", i * 1000))
            .unwrap();
    }
    (db, dir)
}

fn lookup_benchmarks(c: &mut Criterion) {
    let (mut db, _dir) = loaded_engine();
    let probe = format!("bench:{}", DATASET - 1);

    let mut group = c.benchmark_group("point_lookup");
    group.bench_function("indexed_get", |b| {
        b.iter(|| db.get(&probe).unwrap());
    });
    group.bench_function("linear_scan", |b| {
        b.iter(|| db.linear_search(&probe).unwrap());
    });
    group.finish();
}

fn write_benchmarks(c: &mut Criterion) {
    c.bench_function("insert", |b| {
        b.iter_batched(
            loaded_engine,
            |(mut db, _dir)| {
                db.insert("fresh:key", "fresh value").unwrap();
            },
            BatchSize::PerIteration,
        );
    });

    let (mut db, _dir) = loaded_engine();
    let probe = format!("bench:{}", DATASET / 2);
    c.bench_function("update", |b| {
        b.iter(|| db.update(&probe, "rewritten").unwrap());
    });
}

criterion_group!(benches, lookup_benchmarks, write_benchmarks);
criterion_main!(benches);
