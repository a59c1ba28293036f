//! Page structures for Kestrel storage.

use crate::config::PAGE_SIZE;
use crate::error::Result;
use crate::record::{Record, RECORD_SIZE};
use serde::{Deserialize, Serialize};

/// Identifier of a page within the data file.
///
/// Page ids are nonzero; a page's file offset is `id * PAGE_SIZE`. Id 0 is
/// the sentinel for "no page" and offset 0 never holds a valid page.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct PageId(u64);

impl PageId {
    /// Sentinel for "no page".
    pub const INVALID: PageId = PageId(0);

    /// Creates a PageId from its numeric form.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the numeric form of this id.
    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// Returns true unless this is the "no page" sentinel.
    pub fn is_valid(&self) -> bool {
        self.0 != 0
    }

    /// Returns this page's byte offset within the data file.
    pub fn offset(&self) -> u64 {
        self.0 * PAGE_SIZE as u64
    }
}

impl std::fmt::Display for PageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One 4 KB block of the data file, holding at most one record.
///
/// The dirty flag tracks whether the in-memory contents diverge from the
/// last write to the backing file; it is never persisted.
#[derive(Debug, Clone)]
pub struct Page {
    id: PageId,
    data: Box<[u8; PAGE_SIZE]>,
    dirty: bool,
}

impl Page {
    /// Creates a zero-initialized page with the given id.
    pub fn new(id: PageId) -> Self {
        Self {
            id,
            data: Box::new([0u8; PAGE_SIZE]),
            dirty: false,
        }
    }

    /// Wraps a page image read from disk. The page starts clean.
    pub fn from_bytes(id: PageId, data: Box<[u8; PAGE_SIZE]>) -> Self {
        Self {
            id,
            data,
            dirty: false,
        }
    }

    /// Returns this page's id.
    pub fn id(&self) -> PageId {
        self.id
    }

    /// Returns true if the page has unflushed modifications.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Sets or clears the dirty flag.
    pub fn set_dirty(&mut self, dirty: bool) {
        self.dirty = dirty;
    }

    /// Returns the raw page image.
    pub fn bytes(&self) -> &[u8; PAGE_SIZE] {
        &self.data
    }

    /// Copies the record image into the start of the page and marks it dirty.
    pub fn write_record(&mut self, record: &Record) {
        self.data[..RECORD_SIZE].copy_from_slice(&record.to_bytes());
        self.dirty = true;
    }

    /// Decodes the record stored at the start of the page.
    pub fn read_record(&self) -> Result<Record> {
        Record::from_bytes(&self.data[..RECORD_SIZE])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_id_sentinel() {
        assert!(!PageId::INVALID.is_valid());
        assert_eq!(PageId::INVALID.as_u64(), 0);
        assert!(PageId::new(1).is_valid());
        assert_eq!(PageId::default(), PageId::INVALID);
    }

    #[test]
    fn test_page_id_offset() {
        assert_eq!(PageId::new(1).offset(), 4096);
        assert_eq!(PageId::new(10).offset(), 40960);
    }

    #[test]
    fn test_page_id_display() {
        assert_eq!(PageId::new(42).to_string(), "42");
    }

    #[test]
    fn test_page_id_ordering() {
        assert!(PageId::new(1) < PageId::new(2));
        assert!(PageId::INVALID < PageId::new(1));
    }

    #[test]
    fn test_page_id_serde_roundtrip() {
        let original = PageId::new(500);
        let serialized = serde_json::to_string(&original).unwrap();
        let deserialized: PageId = serde_json::from_str(&serialized).unwrap();
        assert_eq!(original, deserialized);
    }

    #[test]
    fn test_page_new_is_zeroed_and_clean() {
        let page = Page::new(PageId::new(3));
        assert_eq!(page.id(), PageId::new(3));
        assert!(!page.is_dirty());
        assert!(page.bytes().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_page_write_record_sets_dirty() {
        let record = Record::new("k", "v", PageId::new(5)).unwrap();
        let mut page = Page::new(PageId::new(5));
        page.write_record(&record);
        assert!(page.is_dirty());

        let decoded = page.read_record().unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn test_page_tail_stays_zero() {
        let record = Record::new("key", "value", PageId::new(2)).unwrap();
        let mut page = Page::new(PageId::new(2));
        page.write_record(&record);
        assert!(page.bytes()[RECORD_SIZE..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_page_from_bytes_is_clean() {
        let record = Record::new("a", "b", PageId::new(8)).unwrap();
        let mut source = Page::new(PageId::new(8));
        source.write_record(&record);

        let page = Page::from_bytes(PageId::new(8), Box::new(*source.bytes()));
        assert!(!page.is_dirty());
        assert_eq!(page.read_record().unwrap(), record);
    }

    #[test]
    fn test_page_clear_dirty() {
        let record = Record::new("k", "v", PageId::new(1)).unwrap();
        let mut page = Page::new(PageId::new(1));
        page.write_record(&record);
        page.set_dirty(false);
        assert!(!page.is_dirty());
    }
}
