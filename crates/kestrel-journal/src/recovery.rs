//! Recovery planning over a scanned journal.

use crate::entry::{JournalEntry, JournalOp};

/// The committed portion of a journal, ready for replay.
///
/// Every maximal entry prefix terminated by a COMMIT is a committed
/// operation; anything after the last COMMIT never took effect and is
/// discarded.
#[derive(Debug)]
pub struct RecoveryPlan {
    /// Entries to replay, in journal order. COMMIT markers are excluded.
    pub committed: Vec<JournalEntry>,
    /// Trailing entries past the last COMMIT that were dropped.
    pub discarded: usize,
}

impl RecoveryPlan {
    /// Splits scanned entries into the committed prefix and the discarded
    /// tail.
    pub fn from_entries(entries: Vec<JournalEntry>) -> Self {
        match entries.iter().rposition(|e| e.op == JournalOp::Commit) {
            None => Self {
                discarded: entries.len(),
                committed: Vec::new(),
            },
            Some(last_commit) => {
                let discarded = entries.len() - last_commit - 1;
                let committed = entries
                    .into_iter()
                    .take(last_commit + 1)
                    .filter(|e| e.op != JournalOp::Commit)
                    .collect();
                Self {
                    committed,
                    discarded,
                }
            }
        }
    }

    /// Returns true if there is nothing to replay.
    pub fn is_empty(&self) -> bool {
        self.committed.is_empty()
    }
}
