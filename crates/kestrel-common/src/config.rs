//! Configuration for the Kestrel storage engine.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Size of one data-file page in bytes (4 KB).
pub const PAGE_SIZE: usize = 4096;

/// Default buffer pool capacity in pages.
pub const CACHE_SIZE: usize = 100;

/// Default B+ tree branching factor.
pub const BTREE_ORDER: usize = 64;

/// Maximum key field size in bytes (content is limited to one less,
/// reserving a byte for the NUL terminator).
pub const MAX_KEY_SIZE: usize = 256;

/// Maximum value field size in bytes (content is limited to one less).
pub const MAX_VALUE_SIZE: usize = 1024;

/// Default data file name.
pub const DATA_FILE: &str = "database.dat";

/// Default journal file name.
pub const JOURNAL_FILE: &str = "journal.log";

/// Default index file name. Reserved: the index is memory-resident and
/// rebuilt on open, so this file is never written.
pub const INDEX_FILE: &str = "index.dat";

/// Immutable settings bundle for a storage engine instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Path to the paged data file.
    pub data_path: PathBuf,
    /// Path to the write-ahead journal file.
    pub journal_path: PathBuf,
    /// Path reserved for a persisted index (unused; see [`INDEX_FILE`]).
    pub index_path: PathBuf,
    /// Buffer pool capacity in pages.
    pub cache_pages: usize,
    /// B+ tree branching factor.
    pub btree_order: usize,
    /// Enable fsync for durability.
    pub fsync_enabled: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from(DATA_FILE),
            journal_path: PathBuf::from(JOURNAL_FILE),
            index_path: PathBuf::from(INDEX_FILE),
            cache_pages: CACHE_SIZE,
            btree_order: BTREE_ORDER,
            fsync_enabled: true,
        }
    }
}

impl EngineConfig {
    /// Returns a config with all engine files placed under `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            data_path: dir.join(DATA_FILE),
            journal_path: dir.join(JOURNAL_FILE),
            index_path: dir.join(INDEX_FILE),
            ..Default::default()
        }
    }
}
