//! Page-level I/O on the data file.

use kestrel_common::{KestrelError, PageId, Result, PAGE_SIZE};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// The paged data file.
///
/// Page `id` occupies bytes `id * PAGE_SIZE .. (id + 1) * PAGE_SIZE`.
/// Id 0 is reserved, so offset 0 never holds a page; the block there is
/// zero-filled the first time page 1 is written.
pub struct DataFile {
    path: PathBuf,
    file: File,
    fsync_enabled: bool,
}

impl DataFile {
    /// Opens (or creates) the data file for read+write.
    pub fn open(path: impl Into<PathBuf>, fsync_enabled: bool) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)?;
        Ok(Self {
            path,
            file,
            fsync_enabled,
        })
    }

    /// Returns the data file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the file length in bytes.
    pub fn len(&self) -> Result<u64> {
        Ok(self.file.metadata()?.len())
    }

    /// Returns true if the file is empty.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Returns the number of complete pages the file spans, counting the
    /// reserved page 0. Valid page ids are `1..page_count()`.
    pub fn page_count(&self) -> Result<u64> {
        Ok(self.len()? / PAGE_SIZE as u64)
    }

    /// Reads one page image from disk.
    pub fn read_page(&mut self, page_id: PageId) -> Result<Box<[u8; PAGE_SIZE]>> {
        if !page_id.is_valid() || page_id.offset() + PAGE_SIZE as u64 > self.len()? {
            return Err(KestrelError::PageNotFound {
                page_id: page_id.as_u64(),
            });
        }

        self.file.seek(SeekFrom::Start(page_id.offset()))?;
        let mut buffer = Box::new([0u8; PAGE_SIZE]);
        self.file.read_exact(&mut buffer[..])?;
        Ok(buffer)
    }

    /// Writes one page image at its offset and, when fsync is enabled,
    /// forces it to the device. Writing past the current end extends the
    /// file (the gap below page 1 is zero-filled by the filesystem).
    pub fn write_page(&mut self, page_id: PageId, data: &[u8; PAGE_SIZE]) -> Result<()> {
        debug_assert!(page_id.is_valid(), "page 0 is reserved");
        self.file.seek(SeekFrom::Start(page_id.offset()))?;
        self.file.write_all(data)?;
        if self.fsync_enabled {
            self.file.sync_data()?;
        }
        Ok(())
    }

    /// Forces all file contents and metadata to the device.
    pub fn sync(&mut self) -> Result<()> {
        self.file.sync_all()?;
        Ok(())
    }
}
