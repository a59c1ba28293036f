//! Error types for Kestrel.

use thiserror::Error;

/// Result type alias using KestrelError.
pub type Result<T> = std::result::Result<T, KestrelError>;

/// Errors that can occur in Kestrel operations.
///
/// "Key not found" and "duplicate key" are deliberately absent: the engine
/// reports those as ordinary return values, never as errors.
#[derive(Debug, Error)]
pub enum KestrelError {
    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Page errors
    #[error("Page not found: {page_id}")]
    PageNotFound { page_id: u64 },

    #[error("Page corrupted: {page_id}, reason: {reason}")]
    PageCorrupted { page_id: u64, reason: String },

    // Record errors
    #[error("Key too large: {size} bytes (max {max})")]
    KeyTooLarge { size: usize, max: usize },

    #[error("Value too large: {size} bytes (max {max})")]
    ValueTooLarge { size: usize, max: usize },

    // Journal errors
    #[error("Journal corrupted at offset {offset}: {reason}")]
    JournalCorrupted { offset: u64, reason: String },

    #[error("Recovery failed: {0}")]
    RecoveryFailed(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),
}
