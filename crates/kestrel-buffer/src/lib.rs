//! Buffer pool management for Kestrel.
//!
//! This crate provides in-memory page caching with:
//! - Fixed-size pool with configurable page count
//! - Least-recently-used eviction driven by a logical clock
//! - Dirty page tracking for write-back

mod pool;

pub use pool::{BufferPool, BufferPoolConfig, EvictedPage};
