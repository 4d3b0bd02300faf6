// Snapshots
//
// A snapshot is an immutable, fully-resolved view of table state: the
// complete manifest list at one point of commit history plus a pointer
// to its parent. Snapshots are created once and shared via `Arc`.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::file::DataFile;
use crate::manifest::{EntryStatus, Manifest};

pub mod graph;

pub use graph::{Ancestors, SnapshotGraph};

/// Globally unique, monotonically increasing snapshot identifier.
///
/// Ids follow commit order, not lineage depth: after a rollback the
/// next snapshot still gets a fresh, larger id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SnapshotId(u64);

impl SnapshotId {
    pub const FIRST: SnapshotId = SnapshotId(1);

    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn get(&self) -> u64 {
        self.0
    }

    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for SnapshotId {
    fn from(value: u64) -> Self {
        SnapshotId(value)
    }
}

/// What kind of change produced a snapshot.
///
/// The set is closed; planners match on it exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// Only new data files were added.
    Append,

    /// Files were rewritten without changing the logical rows.
    Replace,

    /// Logical rows were added and removed.
    Overwrite,

    /// Files were removed.
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Append => "append",
            Operation::Replace => "replace",
            Operation::Overwrite => "overwrite",
            Operation::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// Summary metrics recorded with each snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SnapshotSummary {
    pub added_files: u64,
    pub deleted_files: u64,
    pub added_records: u64,
    pub deleted_records: u64,
    pub total_files: u64,
    pub total_records: u64,
    pub total_size_bytes: u64,
}

#[derive(Debug, Clone)]
pub struct Snapshot {
    id: SnapshotId,
    parent_id: Option<SnapshotId>,
    timestamp: DateTime<Utc>,
    operation: Operation,
    manifests: Vec<Arc<Manifest>>,
    summary: SnapshotSummary,
}

impl Snapshot {
    pub fn new(
        id: SnapshotId,
        parent_id: Option<SnapshotId>,
        timestamp: DateTime<Utc>,
        operation: Operation,
        manifests: Vec<Arc<Manifest>>,
        summary: SnapshotSummary,
    ) -> Self {
        Self {
            id,
            parent_id,
            timestamp,
            operation,
            manifests,
            summary,
        }
    }

    pub fn id(&self) -> SnapshotId {
        self.id
    }

    pub fn parent_id(&self) -> Option<SnapshotId> {
        self.parent_id
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn manifests(&self) -> &[Arc<Manifest>] {
        &self.manifests
    }

    pub fn summary(&self) -> &SnapshotSummary {
        &self.summary
    }

    /// Files that are part of the table as of this snapshot.
    pub fn live_files(&self) -> impl Iterator<Item = &DataFile> {
        self.manifests
            .iter()
            .flat_map(|manifest| manifest.live_entries())
            .map(|entry| entry.file())
    }

    /// Files this snapshot itself added.
    pub fn added_files(&self) -> impl Iterator<Item = &DataFile> {
        self.authored_files(EntryStatus::Added)
    }

    /// Files this snapshot itself removed.
    pub fn deleted_files(&self) -> impl Iterator<Item = &DataFile> {
        self.authored_files(EntryStatus::Deleted)
    }

    fn authored_files(&self, status: EntryStatus) -> impl Iterator<Item = &DataFile> {
        let id = self.id;
        self.manifests
            .iter()
            .filter(move |manifest| manifest.added_snapshot_id() == id)
            .flat_map(|manifest| manifest.entries())
            .filter(move |entry| entry.status() == status && entry.snapshot_id() == id)
            .map(|entry| entry.file())
    }
}
