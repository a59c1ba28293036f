//! Write-ahead journal for Kestrel.
//!
//! Every mutation is appended here and forced to stable storage before the
//! corresponding data-file change is applied. A COMMIT entry seals each
//! operation; on open, the engine replays the committed prefix and discards
//! anything after the last COMMIT.

pub mod entry;
pub mod journal;
pub mod recovery;

pub use entry::{JournalEntry, JournalOp, ENTRY_SIZE};
pub use journal::Journal;
pub use recovery::RecoveryPlan;
