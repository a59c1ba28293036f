//! Append-only journal file with forced durability.

use crate::entry::{JournalEntry, JournalOp, ENTRY_SIZE};
use kestrel_common::{PageId, Result};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// The write-ahead journal.
///
/// Entries are appended in total order; with fsync enabled every append is
/// forced to the device before it returns, so a successful append is a
/// durable intent and a successful [`Journal::commit`] seals it.
pub struct Journal {
    path: PathBuf,
    file: File,
    fsync_enabled: bool,
}

impl Journal {
    /// Opens (or creates) the journal file.
    pub fn open(path: impl Into<PathBuf>, fsync_enabled: bool) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = Self::open_file(&path)?;
        Ok(Self {
            path,
            file,
            fsync_enabled,
        })
    }

    fn open_file(path: &Path) -> Result<File> {
        Ok(OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)?)
    }

    /// Returns the journal file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the journal file length in bytes.
    pub fn len(&self) -> Result<u64> {
        Ok(self.file.metadata()?.len())
    }

    /// Returns true if the journal holds no entries.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Appends one entry and forces it to stable storage.
    ///
    /// A failed write or flush surfaces as an error; the caller must abort
    /// the operation it was journaling.
    pub fn append(&mut self, op: JournalOp, key: &str, value: &str, page_id: PageId) -> Result<()> {
        let entry = JournalEntry::new(op, key, value, page_id)?;
        self.append_entry(&entry)
    }

    /// Appends a pre-built entry and forces it to stable storage.
    pub fn append_entry(&mut self, entry: &JournalEntry) -> Result<()> {
        let image = entry.serialize();
        self.file.seek(SeekFrom::End(0))?;
        self.file.write_all(&image)?;
        if self.fsync_enabled {
            self.file.sync_data()?;
        }
        Ok(())
    }

    /// Appends a COMMIT entry, sealing everything journaled before it.
    pub fn commit(&mut self) -> Result<()> {
        self.append_entry(&JournalEntry::commit())
    }

    /// Closes, deletes, and recreates the journal as an empty file.
    pub fn truncate(&mut self) -> Result<()> {
        std::fs::remove_file(&self.path)?;
        self.file = Self::open_file(&self.path)?;
        Ok(())
    }

    /// Reads every decodable entry from the start of the journal.
    ///
    /// A short or corrupt tail ends the scan: the trailing bytes are
    /// discarded (with a warning), not surfaced as an error, since a crash
    /// mid-append legitimately leaves a torn final entry.
    pub fn read_entries(&mut self) -> Result<Vec<JournalEntry>> {
        let len = self.len()?;
        self.file.seek(SeekFrom::Start(0))?;

        let mut entries = Vec::with_capacity((len / ENTRY_SIZE as u64) as usize);
        let mut buf = vec![0u8; ENTRY_SIZE];
        let mut offset = 0u64;

        while offset + ENTRY_SIZE as u64 <= len {
            self.file.read_exact(&mut buf)?;
            match JournalEntry::deserialize(&buf) {
                Ok(entry) => entries.push(entry),
                Err(err) => {
                    tracing::warn!(offset, %err, "discarding corrupt journal tail");
                    return Ok(entries);
                }
            }
            offset += ENTRY_SIZE as u64;
        }

        if offset < len {
            tracing::warn!(
                offset,
                trailing = len - offset,
                "discarding torn journal entry"
            );
        }
        Ok(entries)
    }
}
