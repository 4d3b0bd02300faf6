// Table Errors
//
// The caller-facing error taxonomy. Module-local errors (pointer store,
// snapshot log, validators) convert into `TableError`.

use chrono::{DateTime, Utc};

use crate::invariants::InvariantViolation;
use crate::log::LogError;
use crate::pointer::PointerError;
use crate::snapshot::{Operation, SnapshotId};

/// Every error a table operation can report.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum TableError {
    #[error("snapshot {0} not found")]
    SnapshotNotFound(SnapshotId),

    #[error("invalid snapshot range: {0}")]
    InvalidRange(String),

    #[error("snapshot {from} is not an ancestor of snapshot {to}")]
    UnreachableAncestor { from: SnapshotId, to: SnapshotId },

    #[error(
        "found {operation} operation in snapshot {snapshot_id}, cannot support incremental data in snapshots ({from}, {to}]"
    )]
    UnsupportedIncrementalOperation {
        snapshot_id: SnapshotId,
        operation: Operation,
        from: SnapshotId,
        to: SnapshotId,
    },

    #[error(
        "commit conflict: expected current snapshot {}, found {}",
        display_pointer(.expected),
        display_pointer(.actual)
    )]
    CommitConflict {
        expected: Option<SnapshotId>,
        actual: Option<SnapshotId>,
    },

    #[error("commit validation failed: {0}")]
    Validation(#[from] InvariantViolation),

    #[error("no snapshot in the current lineage is older than {0}")]
    NoSnapshotBeforeTime(DateTime<Utc>),

    #[error("invalid lineage at snapshot {snapshot_id}: {reason}")]
    InvalidLineage {
        snapshot_id: SnapshotId,
        reason: String,
    },

    #[error("invalid table configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    #[error("pointer store error: {0}")]
    PointerStore(String),

    #[error("table state lock poisoned")]
    LockPoisoned,
}

impl TableError {
    /// Only a lost pointer race is worth retrying; everything else is a
    /// usage error or a broken environment.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TableError::CommitConflict { .. })
    }
}

impl From<PointerError> for TableError {
    fn from(err: PointerError) -> Self {
        match err {
            PointerError::Conflict { expected, actual } => {
                TableError::CommitConflict { expected, actual }
            }
            PointerError::Unavailable(reason) => TableError::PointerStore(reason),
        }
    }
}

impl From<LogError> for TableError {
    fn from(err: LogError) -> Self {
        match err {
            LogError::SequenceConflict { snapshot_id, .. } => TableError::InvalidLineage {
                snapshot_id,
                reason: err.to_string(),
            },
        }
    }
}

fn display_pointer(pointer: &Option<SnapshotId>) -> String {
    match pointer {
        Some(id) => id.to_string(),
        None => "<none>".to_string(),
    }
}
