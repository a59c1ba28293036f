//! Demo driver for the Kestrel storage engine.
//!
//! Walks through the CRUD surface, bulk-loads a dataset, and reports the
//! speedup of the B+ tree index over a full-file linear scan.

use std::time::Instant;

use kestrel_common::{EngineConfig, Result};
use kestrel_engine::StorageEngine;
use tracing_subscriber::EnvFilter;

const BULK: usize = 10_000;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut db = StorageEngine::open(EngineConfig::in_dir("./kestrel-data"))?;

    println!("=== Kestrel storage engine demo ===\n");

    println!("Part 1: basic CRUD");
    db.insert("user:1001", "Alice Johnson")?;
    db.insert("user:1002", "Bob Smith")?;
    db.insert("product:5001", "Laptop - $1299")?;

    println!("  get user:1001      -> {:?}", db.get("user:1001")?);
    println!("  get user:9999      -> {:?}", db.get("user:9999")?);

    db.update("user:1002", "Bob Smith (updated)")?;
    println!("  after update       -> {:?}", db.get("user:1002")?);

    db.remove("product:5001")?;
    println!("  after remove       -> {:?}", db.get("product:5001")?);

    println!("\nPart 2: bulk load ({} records)", BULK);
    let start = Instant::now();
    for i in 0..BULK {
        db.insert(&format!("bench:{}", i), &format!("Data_{}", i * 1000))?;
    }
    let elapsed = start.elapsed();
    println!(
        "  loaded in {:.0?} ({:.0} inserts/sec)",
        elapsed,
        BULK as f64 / elapsed.as_secs_f64()
    );
    db.flush_all()?;

    println!("\nPart 3: indexed lookup vs linear scan");
    let probes = [
        "bench:100",
        "bench:2500",
        "bench:5000",
        "bench:7500",
        "bench:9999",
        "user:1001",
    ];

    let start = Instant::now();
    for key in &probes {
        db.get(key)?;
    }
    let indexed = start.elapsed();
    println!("  indexed: {} probes in {:?}", probes.len(), indexed);

    let start = Instant::now();
    for key in &probes {
        db.linear_search(key)?;
    }
    let linear = start.elapsed();
    println!("  linear:  {} probes in {:?}", probes.len(), linear);

    if indexed.as_nanos() > 0 {
        println!(
            "  speedup: {:.0}x",
            linear.as_secs_f64() / indexed.as_secs_f64()
        );
    }

    let stats = db.stats()?;
    println!("\n=== Database statistics ===");
    println!("File size:       {} bytes", stats.file_size);
    println!("Number of pages: {}", stats.num_pages);
    println!("Page size:       {} bytes", stats.page_size);
    println!(
        "Cache usage:     {}/{} pages",
        stats.cached_pages, stats.cache_capacity
    );

    db.close()
}
