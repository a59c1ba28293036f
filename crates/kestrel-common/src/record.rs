//! Fixed-size record layout for data-file pages.

use crate::config::{MAX_KEY_SIZE, MAX_VALUE_SIZE};
use crate::error::{KestrelError, Result};
use crate::page::PageId;
use bytes::{Buf, BufMut};

/// On-disk size of a record image in bytes.
///
/// Layout (little-endian):
/// - key: 256 bytes, NUL-padded
/// - value: 1,024 bytes, NUL-padded
/// - page_id: 8 bytes
/// - deleted: 1 byte (0 or 1)
/// - reserved: 7 bytes, zero
pub const RECORD_SIZE: usize = MAX_KEY_SIZE + MAX_VALUE_SIZE + 8 + 1 + 7;

const OFF_VALUE: usize = MAX_KEY_SIZE;
const OFF_PAGE_ID: usize = MAX_KEY_SIZE + MAX_VALUE_SIZE;

/// A single key-value record as stored at the start of a page.
///
/// Keys and values are NUL-terminated byte strings on disk; the content of
/// each field is therefore limited to one byte less than the field size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    key: String,
    value: String,
    page_id: PageId,
    deleted: bool,
}

impl Default for Record {
    /// An empty record: the image a freshly zeroed page decodes to.
    fn default() -> Self {
        Self {
            key: String::new(),
            value: String::new(),
            page_id: PageId::INVALID,
            deleted: false,
        }
    }
}

impl Record {
    /// Creates a record for the given key, value, and home page.
    ///
    /// Fails with [`KestrelError::KeyTooLarge`] / [`KestrelError::ValueTooLarge`]
    /// when a field would not fit its fixed slot with a terminator.
    pub fn new(key: &str, value: &str, page_id: PageId) -> Result<Self> {
        check_key(key)?;
        check_value(value)?;
        Ok(Self {
            key: key.to_string(),
            value: value.to_string(),
            page_id,
            deleted: false,
        })
    }

    /// Returns the record key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns the record value.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Returns the page this record lives on.
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    /// Returns true if the record carries the soft-delete tombstone.
    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    /// Replaces the record value.
    pub fn set_value(&mut self, value: &str) -> Result<()> {
        check_value(value)?;
        self.value = value.to_string();
        Ok(())
    }

    /// Marks the record as logically deleted.
    pub fn mark_deleted(&mut self) {
        self.deleted = true;
    }

    /// Serializes the record to its fixed on-disk image.
    pub fn to_bytes(&self) -> [u8; RECORD_SIZE] {
        let mut buf = [0u8; RECORD_SIZE];
        buf[..self.key.len()].copy_from_slice(self.key.as_bytes());
        buf[OFF_VALUE..OFF_VALUE + self.value.len()].copy_from_slice(self.value.as_bytes());
        let mut tail = &mut buf[OFF_PAGE_ID..];
        tail.put_u64_le(self.page_id.as_u64());
        tail.put_u8(self.deleted as u8);
        buf
    }

    /// Deserializes a record from an on-disk image.
    ///
    /// Validates NUL termination of both string fields and the deletion
    /// flag byte; violations surface as [`KestrelError::PageCorrupted`].
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < RECORD_SIZE {
            return Err(KestrelError::PageCorrupted {
                page_id: 0,
                reason: format!("record image too short: {} bytes", data.len()),
            });
        }

        let mut tail = &data[OFF_PAGE_ID..];
        let page_id = PageId::new(tail.get_u64_le());
        let deleted_byte = tail.get_u8();

        let key = padded_str(&data[..MAX_KEY_SIZE], page_id, "key")?;
        let value = padded_str(&data[OFF_VALUE..OFF_VALUE + MAX_VALUE_SIZE], page_id, "value")?;

        let deleted = match deleted_byte {
            0 => false,
            1 => true,
            other => {
                return Err(KestrelError::PageCorrupted {
                    page_id: page_id.as_u64(),
                    reason: format!("invalid deletion flag: {}", other),
                })
            }
        };

        Ok(Self {
            key: key.to_string(),
            value: value.to_string(),
            page_id,
            deleted,
        })
    }
}

fn check_key(key: &str) -> Result<()> {
    if key.len() > MAX_KEY_SIZE - 1 {
        return Err(KestrelError::KeyTooLarge {
            size: key.len(),
            max: MAX_KEY_SIZE - 1,
        });
    }
    Ok(())
}

fn check_value(value: &str) -> Result<()> {
    if value.len() > MAX_VALUE_SIZE - 1 {
        return Err(KestrelError::ValueTooLarge {
            size: value.len(),
            max: MAX_VALUE_SIZE - 1,
        });
    }
    Ok(())
}

/// Decodes a NUL-padded string field. The final byte must be NUL (content
/// never fills the whole slot) and the content must be valid UTF-8.
fn padded_str<'a>(field: &'a [u8], page_id: PageId, name: &str) -> Result<&'a str> {
    if field[field.len() - 1] != 0 {
        return Err(KestrelError::PageCorrupted {
            page_id: page_id.as_u64(),
            reason: format!("{} not NUL-terminated", name),
        });
    }
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    std::str::from_utf8(&field[..end]).map_err(|e| KestrelError::PageCorrupted {
        page_id: page_id.as_u64(),
        reason: format!("{} is not valid UTF-8: {}", name, e),
    })
}
