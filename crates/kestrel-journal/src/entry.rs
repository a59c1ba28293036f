//! Journal entry wire format.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use kestrel_common::{KestrelError, PageId, Result, MAX_KEY_SIZE, MAX_VALUE_SIZE};

/// On-disk size of one journal entry in bytes.
///
/// Layout (little-endian):
/// - op: 1 byte
/// - key: 256 bytes, NUL-padded
/// - value: 1,024 bytes, NUL-padded
/// - page_id: 8 bytes
/// - checksum: 4 bytes (CRC32 of everything before it)
pub const ENTRY_SIZE: usize = 1 + MAX_KEY_SIZE + MAX_VALUE_SIZE + 8 + 4;

const BODY_SIZE: usize = ENTRY_SIZE - 4;

/// Kinds of journal entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum JournalOp {
    /// A new record is about to be written.
    Insert = 1,
    /// An existing record's value is about to change.
    Update = 2,
    /// An existing record is about to be tombstoned.
    Delete = 3,
    /// The preceding entries took full effect.
    Commit = 4,
}

impl TryFrom<u8> for JournalOp {
    type Error = KestrelError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            1 => Ok(JournalOp::Insert),
            2 => Ok(JournalOp::Update),
            3 => Ok(JournalOp::Delete),
            4 => Ok(JournalOp::Commit),
            _ => Err(KestrelError::JournalCorrupted {
                offset: 0,
                reason: format!("invalid op kind: {}", value),
            }),
        }
    }
}

/// A single fixed-size entry in the journal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalEntry {
    /// Operation being journaled.
    pub op: JournalOp,
    /// Affected key.
    pub key: String,
    /// New value (INSERT/UPDATE only; empty otherwise).
    pub value: String,
    /// Affected page (UPDATE/DELETE only; invalid otherwise).
    pub page_id: PageId,
}

impl JournalEntry {
    /// Creates an entry, validating field sizes against the fixed layout.
    pub fn new(op: JournalOp, key: &str, value: &str, page_id: PageId) -> Result<Self> {
        if key.len() > MAX_KEY_SIZE - 1 {
            return Err(KestrelError::KeyTooLarge {
                size: key.len(),
                max: MAX_KEY_SIZE - 1,
            });
        }
        if value.len() > MAX_VALUE_SIZE - 1 {
            return Err(KestrelError::ValueTooLarge {
                size: value.len(),
                max: MAX_VALUE_SIZE - 1,
            });
        }
        Ok(Self {
            op,
            key: key.to_string(),
            value: value.to_string(),
            page_id,
        })
    }

    /// Creates a COMMIT entry.
    pub fn commit() -> Self {
        Self {
            op: JournalOp::Commit,
            key: String::new(),
            value: String::new(),
            page_id: PageId::INVALID,
        }
    }

    /// Serializes this entry to its fixed on-disk image.
    pub fn serialize(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(ENTRY_SIZE);
        buf.put_u8(self.op as u8);
        buf.put_slice(self.key.as_bytes());
        buf.put_bytes(0, MAX_KEY_SIZE - self.key.len());
        buf.put_slice(self.value.as_bytes());
        buf.put_bytes(0, MAX_VALUE_SIZE - self.value.len());
        buf.put_u64_le(self.page_id.as_u64());

        let checksum = crc32fast::hash(&buf);
        buf.put_u32_le(checksum);
        buf.freeze()
    }

    /// Deserializes an entry, verifying length and checksum.
    pub fn deserialize(data: &[u8]) -> Result<Self> {
        if data.len() < ENTRY_SIZE {
            return Err(KestrelError::JournalCorrupted {
                offset: 0,
                reason: format!("entry too short: {} bytes", data.len()),
            });
        }

        let stored_checksum = (&data[BODY_SIZE..ENTRY_SIZE]).get_u32_le();
        let computed_checksum = crc32fast::hash(&data[..BODY_SIZE]);
        if stored_checksum != computed_checksum {
            return Err(KestrelError::JournalCorrupted {
                offset: 0,
                reason: format!(
                    "checksum mismatch: stored={}, computed={}",
                    stored_checksum, computed_checksum
                ),
            });
        }

        let op = JournalOp::try_from(data[0])?;
        let key = padded_str(&data[1..1 + MAX_KEY_SIZE], "key")?;
        let value = padded_str(&data[1 + MAX_KEY_SIZE..1 + MAX_KEY_SIZE + MAX_VALUE_SIZE], "value")?;
        let page_id = PageId::new((&data[BODY_SIZE - 8..BODY_SIZE]).get_u64_le());

        Ok(Self {
            op,
            key: key.to_string(),
            value: value.to_string(),
            page_id,
        })
    }
}

/// Decodes a NUL-padded string field of a journal entry.
fn padded_str<'a>(field: &'a [u8], name: &str) -> Result<&'a str> {
    if field[field.len() - 1] != 0 {
        return Err(KestrelError::JournalCorrupted {
            offset: 0,
            reason: format!("{} not NUL-terminated", name),
        });
    }
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    std::str::from_utf8(&field[..end]).map_err(|e| KestrelError::JournalCorrupted {
        offset: 0,
        reason: format!("{} is not valid UTF-8: {}", name, e),
    })
}
