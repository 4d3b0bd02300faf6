// Snapshot Log
//
// Append-only history of current-pointer moves. Every commit and every
// rollback that changes the pointer leaves one entry, so the log answers
// "what was current when" even after rollbacks abandon branches.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::snapshot::SnapshotId;

/// Why the pointer moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerChange {
    Commit,
    Rollback,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SnapshotLogEntry {
    pub sequence: u64,
    pub snapshot_id: SnapshotId,
    pub changed_at: DateTime<Utc>,
    pub change: PointerChange,
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum LogError {
    #[error("sequence conflict at snapshot {snapshot_id}: expected {expected}, got {actual}")]
    SequenceConflict {
        snapshot_id: SnapshotId,
        expected: u64,
        actual: u64,
    },
}

#[derive(Debug, Default)]
pub struct SnapshotLog {
    entries: Vec<SnapshotLogEntry>,
}

impl SnapshotLog {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Append an entry. Sequence numbers start at 1 and have no gaps.
    pub fn append(&mut self, entry: SnapshotLogEntry) -> Result<(), LogError> {
        let expected = self.last_sequence() + 1;

        if entry.sequence != expected {
            return Err(LogError::SequenceConflict {
                snapshot_id: entry.snapshot_id,
                expected,
                actual: entry.sequence,
            });
        }

        self.entries.push(entry);
        Ok(())
    }

    /// Record a pointer move with the next sequence number.
    pub fn record(
        &mut self,
        snapshot_id: SnapshotId,
        change: PointerChange,
    ) -> Result<&SnapshotLogEntry, LogError> {
        self.append(SnapshotLogEntry {
            sequence: self.last_sequence() + 1,
            snapshot_id,
            changed_at: Utc::now(),
            change,
        })?;
        Ok(&self.entries[self.entries.len() - 1])
    }

    pub fn entries(&self) -> &[SnapshotLogEntry] {
        &self.entries
    }

    pub fn last_sequence(&self) -> u64 {
        self.entries.last().map(|e| e.sequence).unwrap_or(0)
    }
}
