//! Storage engine coordinator.

use crate::datafile::DataFile;
use kestrel_buffer::{BufferPool, BufferPoolConfig};
use kestrel_common::{EngineConfig, KestrelError, Page, PageId, Record, Result, PAGE_SIZE, RECORD_SIZE};
use kestrel_index::BTreeIndex;
use kestrel_journal::{Journal, JournalEntry, JournalOp, RecoveryPlan};

/// Point-in-time counters reported by [`StorageEngine::stats`].
///
/// Formatting belongs to the caller; the engine only measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineStats {
    /// Data file size in bytes.
    pub file_size: u64,
    /// Number of complete pages the file spans (including reserved page 0).
    pub num_pages: u64,
    /// Page size in bytes.
    pub page_size: usize,
    /// Buffer pool capacity in pages.
    pub cache_capacity: usize,
    /// Pages currently cached.
    pub cached_pages: usize,
}

/// The storage engine: exclusive owner of the data file, journal, buffer
/// pool, index, and page-id counter.
///
/// Every mutation follows the same protocol: journal the intent (forced),
/// apply it to the page and flush, update the index, then journal COMMIT
/// (forced). Reads go through the index and the buffer pool.
pub struct StorageEngine {
    config: EngineConfig,
    data: DataFile,
    journal: Journal,
    pool: BufferPool,
    index: BTreeIndex,
    /// Next page id to hand out; page ids grow monotonically and are
    /// never reclaimed.
    next_page_id: u64,
}

impl StorageEngine {
    /// Opens the engine: opens or creates the data and journal files,
    /// rebuilds the index from the data file, replays the committed
    /// journal prefix, and truncates the journal.
    pub fn open(config: EngineConfig) -> Result<Self> {
        let data = DataFile::open(&config.data_path, config.fsync_enabled)?;
        let journal = Journal::open(&config.journal_path, config.fsync_enabled)?;
        let next_page_id = data.len()? / PAGE_SIZE as u64 + 1;

        let mut engine = Self {
            pool: BufferPool::new(BufferPoolConfig {
                capacity: config.cache_pages,
            }),
            index: BTreeIndex::new(config.btree_order),
            data,
            journal,
            next_page_id,
            config,
        };
        engine.rebuild_index()?;
        engine.recover()?;

        tracing::info!(
            path = %engine.config.data_path.display(),
            pages = engine.data.page_count()?,
            "storage engine opened"
        );
        Ok(engine)
    }

    /// Returns the engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // CRUD
    // ------------------------------------------------------------------

    /// Inserts a new key. Returns `Ok(false)` if the key already exists.
    pub fn insert(&mut self, key: &str, value: &str) -> Result<bool> {
        if self.index.search(key).is_valid() {
            return Ok(false);
        }

        self.journal
            .append(JournalOp::Insert, key, value, PageId::INVALID)?;

        let page_id = self.allocate_page();
        let record = Record::new(key, value, page_id)?;
        let mut page = Page::new(page_id);
        page.write_record(&record);
        self.cache_page(page_id, page)?;
        self.flush_page(page_id)?;

        self.index.insert(key, page_id);
        self.journal.commit()?;
        Ok(true)
    }

    /// Looks up a key. Returns `Ok(None)` when absent or tombstoned.
    pub fn get(&mut self, key: &str) -> Result<Option<String>> {
        let page_id = self.index.search(key);
        if !page_id.is_valid() {
            return Ok(None);
        }

        let record = self.read_record_at(page_id)?;
        if record.is_deleted() {
            return Ok(None);
        }
        Ok(Some(record.value().to_string()))
    }

    /// Replaces the value of an existing key. Returns `Ok(false)` when the
    /// key is absent or tombstoned.
    pub fn update(&mut self, key: &str, new_value: &str) -> Result<bool> {
        let page_id = self.index.search(key);
        if !page_id.is_valid() {
            return Ok(false);
        }

        self.journal
            .append(JournalOp::Update, key, new_value, page_id)?;

        let mut record = self.read_record_at(page_id)?;
        if record.is_deleted() {
            // The intent entry above stays uncommitted and is discarded on
            // the next recovery.
            return Ok(false);
        }
        record.set_value(new_value)?;
        self.write_record_at(page_id, &record)?;

        self.journal.commit()?;
        Ok(true)
    }

    /// Tombstones a key. Returns `Ok(false)` when the key is absent.
    pub fn remove(&mut self, key: &str) -> Result<bool> {
        let page_id = self.index.search(key);
        if !page_id.is_valid() {
            return Ok(false);
        }

        self.journal.append(JournalOp::Delete, key, "", page_id)?;

        let mut record = self.read_record_at(page_id)?;
        record.mark_deleted();
        self.write_record_at(page_id, &record)?;

        self.index.remove(key);
        self.journal.commit()?;
        Ok(true)
    }

    /// Full-file scan lookup, bypassing both index and cache. Exists as
    /// the benchmark baseline the index is measured against.
    pub fn linear_search(&mut self, key: &str) -> Result<Option<String>> {
        let page_count = self.data.page_count()?;
        for raw_id in 1..page_count {
            let image = self.data.read_page(PageId::new(raw_id))?;
            let record = Record::from_bytes(&image[..RECORD_SIZE])?;
            if !record.is_deleted() && record.key() == key {
                return Ok(Some(record.value().to_string()));
            }
        }
        Ok(None)
    }

    // ------------------------------------------------------------------
    // Maintenance
    // ------------------------------------------------------------------

    /// Checkpoint: flushes every dirty pooled page, forces the data file,
    /// and truncates the journal. Afterwards the data file alone
    /// represents all committed state.
    pub fn flush_all(&mut self) -> Result<()> {
        for page_id in self.pool.dirty_page_ids() {
            self.flush_page(page_id)?;
        }
        self.data.sync()?;
        self.journal.truncate()?;
        tracing::debug!("checkpoint complete");
        Ok(())
    }

    /// Returns current size and cache counters.
    pub fn stats(&self) -> Result<EngineStats> {
        let file_size = self.data.len()?;
        Ok(EngineStats {
            file_size,
            num_pages: file_size / PAGE_SIZE as u64,
            page_size: PAGE_SIZE,
            cache_capacity: self.pool.capacity(),
            cached_pages: self.pool.len(),
        })
    }

    /// Checkpoints and closes the engine, surfacing any flush error that
    /// the implicit drop would swallow.
    pub fn close(mut self) -> Result<()> {
        self.flush_all()?;
        self.data.sync()?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Pages
    // ------------------------------------------------------------------

    fn allocate_page(&mut self) -> PageId {
        let page_id = PageId::new(self.next_page_id);
        self.next_page_id += 1;
        page_id
    }

    /// Makes sure the page is in the pool, reading it from disk on a miss.
    fn ensure_cached(&mut self, page_id: PageId) -> Result<()> {
        if self.pool.contains(page_id) {
            return Ok(());
        }
        let image = self.data.read_page(page_id)?;
        self.cache_page(page_id, Page::from_bytes(page_id, image))
    }

    /// Inserts a page into the pool, writing back any dirty evictee.
    /// Eviction itself never flushes; the engine does.
    fn cache_page(&mut self, page_id: PageId, page: Page) -> Result<()> {
        if let Some(evicted) = self.pool.put(page_id, page) {
            tracing::debug!(
                page_id = evicted.page_id.as_u64(),
                "writing back dirty evicted page"
            );
            self.data.write_page(evicted.page_id, evicted.page.bytes())?;
        }
        Ok(())
    }

    /// Writes a pooled page to the data file (forced) and clears its
    /// dirty flag.
    fn flush_page(&mut self, page_id: PageId) -> Result<()> {
        let Some(page) = self.pool.get_mut(page_id) else {
            return Ok(());
        };
        self.data.write_page(page_id, page.bytes())?;
        page.set_dirty(false);
        Ok(())
    }

    fn read_record_at(&mut self, page_id: PageId) -> Result<Record> {
        self.ensure_cached(page_id)?;
        match self.pool.get(page_id) {
            Some(page) => page.read_record(),
            None => Err(KestrelError::PageNotFound {
                page_id: page_id.as_u64(),
            }),
        }
    }

    /// Rewrites the record on its page and flushes the page.
    fn write_record_at(&mut self, page_id: PageId, record: &Record) -> Result<()> {
        self.ensure_cached(page_id)?;
        match self.pool.get_mut(page_id) {
            Some(page) => page.write_record(record),
            None => {
                return Err(KestrelError::PageNotFound {
                    page_id: page_id.as_u64(),
                })
            }
        }
        self.flush_page(page_id)
    }

    // ------------------------------------------------------------------
    // Open-time rebuild and recovery
    // ------------------------------------------------------------------

    /// Scans the data file and indexes every live record. Unoccupied
    /// (all-zero) and tombstoned pages are skipped; undecodable pages
    /// surface as corruption.
    fn rebuild_index(&mut self) -> Result<()> {
        let page_count = self.data.page_count()?;
        let mut live = 0usize;
        for raw_id in 1..page_count {
            let page_id = PageId::new(raw_id);
            let image = self.data.read_page(page_id)?;
            let record = Page::from_bytes(page_id, image).read_record()?;
            if record.key().is_empty() || record.is_deleted() {
                continue;
            }
            self.index.insert(record.key(), page_id);
            live += 1;
        }
        if live > 0 {
            tracing::debug!(live, "index rebuilt from data file");
        }
        Ok(())
    }

    /// Replays the committed journal prefix against the data file and the
    /// freshly built index, then truncates the journal.
    fn recover(&mut self) -> Result<()> {
        if self.journal.is_empty()? {
            return Ok(());
        }

        let entries = self.journal.read_entries()?;
        let plan = RecoveryPlan::from_entries(entries);
        if plan.discarded > 0 {
            tracing::warn!(
                discarded = plan.discarded,
                "dropping journal entries past the last commit"
            );
        }

        let total = plan.committed.len();
        let mut applied = 0usize;
        for entry in &plan.committed {
            if self.replay(entry)? {
                applied += 1;
            }
        }
        if total > 0 {
            tracing::info!(total, applied, "journal recovery complete");
        }

        self.journal.truncate()
    }

    /// Applies one committed entry if its effect is not already on disk.
    /// Returns true if anything changed.
    fn replay(&mut self, entry: &JournalEntry) -> Result<bool> {
        match entry.op {
            JournalOp::Insert => {
                if self.index.search(&entry.key).is_valid() {
                    return Ok(false);
                }
                let page_id = self.allocate_page();
                let record = Record::new(&entry.key, &entry.value, page_id)?;
                let mut page = Page::new(page_id);
                page.write_record(&record);
                self.data.write_page(page_id, page.bytes())?;
                self.index.insert(&entry.key, page_id);
                Ok(true)
            }
            JournalOp::Update => {
                let mut page = self.replay_target(entry)?;
                let mut record = page.read_record()?;
                if record.is_deleted() || record.value() == entry.value {
                    return Ok(false);
                }
                record.set_value(&entry.value)?;
                page.write_record(&record);
                self.data.write_page(page.id(), page.bytes())?;
                Ok(true)
            }
            JournalOp::Delete => {
                let mut page = self.replay_target(entry)?;
                let mut record = page.read_record()?;
                self.index.remove(&entry.key);
                if record.is_deleted() {
                    return Ok(false);
                }
                record.mark_deleted();
                page.write_record(&record);
                self.data.write_page(page.id(), page.bytes())?;
                Ok(true)
            }
            JournalOp::Commit => Ok(false),
        }
    }

    /// Loads the page a committed entry targets, checking that it holds
    /// the expected key.
    fn replay_target(&mut self, entry: &JournalEntry) -> Result<Page> {
        let image = self.data.read_page(entry.page_id)?;
        let page = Page::from_bytes(entry.page_id, image);
        let record = page.read_record()?;
        if record.key() != entry.key {
            return Err(KestrelError::RecoveryFailed(format!(
                "journal entry for key {:?} targets page {} holding key {:?}",
                entry.key,
                entry.page_id,
                record.key()
            )));
        }
        Ok(page)
    }
}

impl Drop for StorageEngine {
    fn drop(&mut self) {
        if let Err(err) = self.flush_all() {
            tracing::error!(%err, "checkpoint on close failed");
        }
    }
}
