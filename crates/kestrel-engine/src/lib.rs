//! Kestrel storage engine.
//!
//! A single-process, single-writer embedded key-value store backed by a
//! paged file. The engine binds four subsystems:
//! - the paged data file (`database.dat`), one record per 4 KB page
//! - the write-ahead journal (`journal.log`) with a commit protocol
//! - a bounded LRU buffer pool over data pages
//! - a memory-resident B+ tree index, rebuilt on open
//!
//! Every mutation reaches stable storage in the sequence journal entry →
//! page write → journal COMMIT, with an explicit flush at each step. On
//! open, the committed journal prefix is replayed and the journal
//! truncated, so a crash between any two steps is repaired.

mod datafile;
mod engine;

pub use datafile::DataFile;
pub use engine::{EngineStats, StorageEngine};
