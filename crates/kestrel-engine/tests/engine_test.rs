//! End-to-end tests for the storage engine.
//!
//! Covers the CRUD surface, the LRU cache bound, checkpointing, durability
//! across reopen, and journal recovery.

use std::path::Path;

use kestrel_common::{EngineConfig, KestrelError, PageId, MAX_KEY_SIZE, PAGE_SIZE};
use kestrel_engine::StorageEngine;
use kestrel_journal::{Journal, JournalOp};
use tempfile::tempdir;

fn test_config(dir: &Path) -> EngineConfig {
    // fsync disabled for faster tests
    EngineConfig {
        fsync_enabled: false,
        ..EngineConfig::in_dir(dir)
    }
}

fn open_engine(dir: &Path) -> StorageEngine {
    StorageEngine::open(test_config(dir)).unwrap()
}

#[test]
fn test_basic_crud_roundtrip() {
    let dir = tempdir().unwrap();
    let mut db = open_engine(dir.path());

    assert!(db.insert("user:1001", "Alice Johnson").unwrap());
    assert!(db.insert("user:1002", "Bob Smith").unwrap());
    assert!(db.insert("product:5001", "Laptop - $1299").unwrap());

    assert_eq!(
        db.get("user:1001").unwrap().as_deref(),
        Some("Alice Johnson")
    );
    assert_eq!(
        db.get("product:5001").unwrap().as_deref(),
        Some("Laptop - $1299")
    );
    assert_eq!(db.get("user:9999").unwrap(), None);
}

#[test]
fn test_duplicate_insert_rejected() {
    let dir = tempdir().unwrap();
    let mut db = open_engine(dir.path());

    assert!(db.insert("k", "v1").unwrap());
    assert!(!db.insert("k", "v2").unwrap());
    assert_eq!(db.get("k").unwrap().as_deref(), Some("v1"));
}

#[test]
fn test_update_and_remove_cycle() {
    let dir = tempdir().unwrap();
    let mut db = open_engine(dir.path());

    assert!(db.insert("k", "v").unwrap());
    assert!(db.update("k", "V").unwrap());
    assert_eq!(db.get("k").unwrap().as_deref(), Some("V"));

    assert!(db.remove("k").unwrap());
    assert_eq!(db.get("k").unwrap(), None);
}

#[test]
fn test_update_missing_key_fails() {
    let dir = tempdir().unwrap();
    let mut db = open_engine(dir.path());
    assert!(!db.update("ghost", "v").unwrap());
}

#[test]
fn test_remove_missing_key_fails() {
    let dir = tempdir().unwrap();
    let mut db = open_engine(dir.path());
    assert!(!db.remove("ghost").unwrap());
}

#[test]
fn test_update_is_idempotent() {
    let dir = tempdir().unwrap();
    let mut db = open_engine(dir.path());

    assert!(db.insert("k", "v").unwrap());
    assert!(db.update("k", "v2").unwrap());
    assert!(db.update("k", "v2").unwrap());
    assert_eq!(db.get("k").unwrap().as_deref(), Some("v2"));
}

#[test]
fn test_reinsert_after_remove() {
    let dir = tempdir().unwrap();
    let mut db = open_engine(dir.path());

    assert!(db.insert("k", "v").unwrap());
    assert!(db.remove("k").unwrap());
    assert_eq!(db.get("k").unwrap(), None);

    // The tombstoned index slot must accept a fresh insert.
    assert!(db.insert("k", "v2").unwrap());
    assert_eq!(db.get("k").unwrap().as_deref(), Some("v2"));
}

#[test]
fn test_reinsert_survives_reopen() {
    let dir = tempdir().unwrap();
    {
        let mut db = open_engine(dir.path());
        db.insert("k", "v").unwrap();
        db.remove("k").unwrap();
        db.insert("k", "v2").unwrap();
    }

    // The orphaned tombstone page is still on disk; the rebuilt index must
    // skip it and find the live record.
    let mut db = open_engine(dir.path());
    assert_eq!(db.get("k").unwrap().as_deref(), Some("v2"));
}

#[test]
fn test_oversize_key_rejected() {
    let dir = tempdir().unwrap();
    let mut db = open_engine(dir.path());

    let key = "k".repeat(MAX_KEY_SIZE);
    let err = db.insert(&key, "v").unwrap_err();
    assert!(matches!(err, KestrelError::KeyTooLarge { .. }));
    assert_eq!(db.get(&key).unwrap(), None);
}

#[test]
fn test_durability_across_reopen() {
    let dir = tempdir().unwrap();
    {
        let mut db = StorageEngine::open(EngineConfig::in_dir(dir.path())).unwrap();
        db.insert("persist:1", "survives").unwrap();
        db.insert("persist:2", "also survives").unwrap();
        db.update("persist:2", "updated").unwrap();
    }

    let mut db = StorageEngine::open(EngineConfig::in_dir(dir.path())).unwrap();
    assert_eq!(db.get("persist:1").unwrap().as_deref(), Some("survives"));
    assert_eq!(db.get("persist:2").unwrap().as_deref(), Some("updated"));
}

#[test]
fn test_remove_survives_reopen() {
    let dir = tempdir().unwrap();
    {
        let mut db = open_engine(dir.path());
        db.insert("keep", "v").unwrap();
        db.insert("drop", "v").unwrap();
        db.remove("drop").unwrap();
    }

    let mut db = open_engine(dir.path());
    assert_eq!(db.get("keep").unwrap().as_deref(), Some("v"));
    assert_eq!(db.get("drop").unwrap(), None);
    assert_eq!(db.linear_search("drop").unwrap(), None);
}

#[test]
fn test_cache_stays_bounded() {
    let dir = tempdir().unwrap();
    let config = EngineConfig {
        cache_pages: 10,
        ..test_config(dir.path())
    };
    let mut db = StorageEngine::open(config).unwrap();

    for i in 0..50 {
        db.insert(&format!("k:{:03}", i), "v").unwrap();
    }
    // Read everything back through the cache.
    for i in 0..50 {
        assert!(db.get(&format!("k:{:03}", i)).unwrap().is_some());
    }
    assert!(db.stats().unwrap().cached_pages <= 10);
}

#[test]
fn test_linear_search_matches_get() {
    let dir = tempdir().unwrap();
    let mut db = open_engine(dir.path());

    for i in 0..20 {
        db.insert(&format!("k:{:02}", i), &format!("v{}", i)).unwrap();
    }
    db.remove("k:07").unwrap();

    for i in 0..20 {
        let key = format!("k:{:02}", i);
        assert_eq!(db.get(&key).unwrap(), db.linear_search(&key).unwrap());
    }
    assert_eq!(db.linear_search("missing").unwrap(), None);
}

#[test]
fn test_bulk_insert_and_point_lookups() {
    const BULK: usize = 10_000;

    let dir = tempdir().unwrap();
    let mut db = open_engine(dir.path());

    for i in 0..BULK {
        assert!(db
            .insert(&format!("bench:{}", i), &format!("Data_{}", i * 1000))
            .unwrap());
    }

    for i in [100usize, 2500, 5000, 7500, 9999] {
        assert_eq!(
            db.get(&format!("bench:{}", i)).unwrap().as_deref(),
            Some(format!("Data_{}", i * 1000).as_str())
        );
    }

    let stats = db.stats().unwrap();
    assert!(stats.file_size >= (BULK * PAGE_SIZE) as u64);
    assert!(stats.num_pages >= BULK as u64);
    assert!(stats.cached_pages <= stats.cache_capacity);
}

#[test]
fn test_checkpoint_truncates_journal() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path());
    let mut db = StorageEngine::open(config.clone()).unwrap();

    for i in 0..100 {
        db.insert(&format!("k:{}", i), "v").unwrap();
    }
    db.flush_all().unwrap();

    let journal_len = std::fs::metadata(&config.journal_path).unwrap().len();
    assert_eq!(journal_len, 0);
}

#[test]
fn test_close_truncates_journal() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path());
    {
        let mut db = StorageEngine::open(config.clone()).unwrap();
        db.insert("k", "v").unwrap();
        db.close().unwrap();
    }
    assert_eq!(std::fs::metadata(&config.journal_path).unwrap().len(), 0);
}

// ----------------------------------------------------------------------
// Journal recovery
// ----------------------------------------------------------------------

#[test]
fn test_recovery_replays_committed_insert() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path());

    // A committed INSERT that never reached the data file, as after a
    // crash between the journal commit and process death.
    {
        let mut journal = Journal::open(&config.journal_path, false).unwrap();
        journal
            .append(JournalOp::Insert, "lost", "found", PageId::INVALID)
            .unwrap();
        journal.commit().unwrap();
    }

    let mut db = StorageEngine::open(config.clone()).unwrap();
    assert_eq!(db.get("lost").unwrap().as_deref(), Some("found"));

    // Recovery ends with a truncated journal.
    assert_eq!(std::fs::metadata(&config.journal_path).unwrap().len(), 0);

    // The replayed record is durable, not index-only.
    assert_eq!(db.linear_search("lost").unwrap().as_deref(), Some("found"));
}

#[test]
fn test_recovery_discards_uncommitted_tail() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path());

    {
        let mut journal = Journal::open(&config.journal_path, false).unwrap();
        journal
            .append(JournalOp::Insert, "committed", "yes", PageId::INVALID)
            .unwrap();
        journal.commit().unwrap();
        journal
            .append(JournalOp::Insert, "torn", "no", PageId::INVALID)
            .unwrap();
        // No commit: the operation was still in flight at the crash.
    }

    let mut db = StorageEngine::open(config).unwrap();
    assert_eq!(db.get("committed").unwrap().as_deref(), Some("yes"));
    assert_eq!(db.get("torn").unwrap(), None);
}

#[test]
fn test_recovery_is_idempotent_for_applied_effects() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path());

    // A normal, fully applied insert whose journal was never truncated:
    // simulate by re-journaling the same operation after the fact.
    {
        let mut db = StorageEngine::open(config.clone()).unwrap();
        db.insert("k", "v").unwrap();
        db.close().unwrap();
    }
    {
        let mut journal = Journal::open(&config.journal_path, false).unwrap();
        journal
            .append(JournalOp::Insert, "k", "v", PageId::INVALID)
            .unwrap();
        journal.commit().unwrap();
    }

    let mut db = StorageEngine::open(config).unwrap();
    assert_eq!(db.get("k").unwrap().as_deref(), Some("v"));

    // No second page was allocated for the replayed insert.
    assert_eq!(db.stats().unwrap().num_pages, 2);
}

#[test]
fn test_recovery_replays_committed_update_and_delete() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path());

    {
        let mut db = StorageEngine::open(config.clone()).unwrap();
        db.insert("upd", "old").unwrap();
        db.insert("del", "v").unwrap();
        db.close().unwrap();
    }

    // Journal an update and a delete that were committed but whose page
    // effects are assumed lost.
    {
        let mut journal = Journal::open(&config.journal_path, false).unwrap();
        journal
            .append(JournalOp::Update, "upd", "new", PageId::new(1))
            .unwrap();
        journal.commit().unwrap();
        journal
            .append(JournalOp::Delete, "del", "", PageId::new(2))
            .unwrap();
        journal.commit().unwrap();
    }

    let mut db = StorageEngine::open(config).unwrap();
    assert_eq!(db.get("upd").unwrap().as_deref(), Some("new"));
    assert_eq!(db.get("del").unwrap(), None);
    assert_eq!(db.linear_search("del").unwrap(), None);
}

#[test]
fn test_recovery_survives_corrupt_journal_tail() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path());

    {
        let mut journal = Journal::open(&config.journal_path, false).unwrap();
        journal
            .append(JournalOp::Insert, "good", "v", PageId::INVALID)
            .unwrap();
        journal.commit().unwrap();
    }

    // Garbage after the committed prefix, as left by a torn write.
    {
        use std::io::Write;
        let mut file = std::fs::OpenOptions::new()
            .append(true)
            .open(&config.journal_path)
            .unwrap();
        file.write_all(&[0xEE; 700]).unwrap();
    }

    let mut db = StorageEngine::open(config).unwrap();
    assert_eq!(db.get("good").unwrap().as_deref(), Some("v"));
}

#[test]
fn test_recovered_engine_accepts_new_writes() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path());

    {
        let mut journal = Journal::open(&config.journal_path, false).unwrap();
        journal
            .append(JournalOp::Insert, "a", "1", PageId::INVALID)
            .unwrap();
        journal.commit().unwrap();
    }

    let mut db = StorageEngine::open(config).unwrap();
    assert!(db.insert("b", "2").unwrap());
    assert_eq!(db.get("a").unwrap().as_deref(), Some("1"));
    assert_eq!(db.get("b").unwrap().as_deref(), Some("2"));
    assert!(!db.insert("a", "dup").unwrap());
}
