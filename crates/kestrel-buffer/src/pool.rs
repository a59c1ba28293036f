//! LRU buffer pool.

use kestrel_common::{Page, PageId, CACHE_SIZE};
use std::collections::HashMap;

/// A dirty page that was evicted from the buffer pool.
/// Eviction never performs I/O; the caller must write this page to disk.
#[derive(Debug)]
pub struct EvictedPage {
    pub page_id: PageId,
    pub page: Page,
}

/// Configuration for the buffer pool.
#[derive(Debug, Clone)]
pub struct BufferPoolConfig {
    /// Number of pages the pool may hold.
    pub capacity: usize,
}

impl Default for BufferPoolConfig {
    fn default() -> Self {
        Self {
            capacity: CACHE_SIZE,
        }
    }
}

struct CacheEntry {
    page: Page,
    /// Logical-clock timestamp of the last hit or insert.
    last_access: u64,
}

/// Bounded in-memory cache of data-file pages.
///
/// A monotonic logical clock advances on every hit and every insert; when
/// the pool is full, the entry with the smallest access time is evicted.
/// Eviction itself never flushes — a dirty evictee is handed back to the
/// caller instead.
pub struct BufferPool {
    capacity: usize,
    clock: u64,
    entries: HashMap<PageId, CacheEntry>,
}

impl BufferPool {
    /// Creates a new buffer pool. Capacity is clamped to at least one page.
    pub fn new(config: BufferPoolConfig) -> Self {
        let capacity = config.capacity.max(1);
        Self {
            capacity,
            clock: 0,
            entries: HashMap::with_capacity(capacity),
        }
    }

    /// Returns the pool capacity in pages.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of cached pages.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns true if the page is cached, without touching its recency.
    pub fn contains(&self, page_id: PageId) -> bool {
        self.entries.contains_key(&page_id)
    }

    /// Fetches a cached page, bumping its access time on a hit.
    pub fn get(&mut self, page_id: PageId) -> Option<&Page> {
        self.clock += 1;
        let clock = self.clock;
        self.entries.get_mut(&page_id).map(|entry| {
            entry.last_access = clock;
            &entry.page
        })
    }

    /// Fetches a cached page mutably, bumping its access time on a hit.
    pub fn get_mut(&mut self, page_id: PageId) -> Option<&mut Page> {
        self.clock += 1;
        let clock = self.clock;
        self.entries.get_mut(&page_id).map(|entry| {
            entry.last_access = clock;
            &mut entry.page
        })
    }

    /// Inserts a page, evicting the least-recently-used entry first when the
    /// pool is at capacity. Returns the evictee if it was dirty.
    pub fn put(&mut self, page_id: PageId, page: Page) -> Option<EvictedPage> {
        self.clock += 1;
        let clock = self.clock;

        if let Some(entry) = self.entries.get_mut(&page_id) {
            entry.page = page;
            entry.last_access = clock;
            return None;
        }

        let evicted = if self.entries.len() >= self.capacity {
            self.evict_lru()
        } else {
            None
        };

        self.entries.insert(
            page_id,
            CacheEntry {
                page,
                last_access: clock,
            },
        );
        evicted
    }

    /// Removes the entry with the smallest access time. Ties (which the
    /// strictly monotonic clock never produces) break on the smaller page id.
    fn evict_lru(&mut self) -> Option<EvictedPage> {
        let victim = self
            .entries
            .iter()
            .min_by_key(|(id, entry)| (entry.last_access, **id))
            .map(|(id, _)| *id)?;

        let entry = self.entries.remove(&victim)?;
        if entry.page.is_dirty() {
            tracing::debug!(page_id = victim.as_u64(), "evicting dirty page");
            Some(EvictedPage {
                page_id: victim,
                page: entry.page,
            })
        } else {
            None
        }
    }

    /// Returns the ids of all cached pages whose dirty flag is set.
    pub fn dirty_page_ids(&self) -> Vec<PageId> {
        let mut ids: Vec<PageId> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.page.is_dirty())
            .map(|(id, _)| *id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Drops all cached pages without flushing.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
