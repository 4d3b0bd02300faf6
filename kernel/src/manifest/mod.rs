// Manifests
//
// A manifest is an immutable group of file-status entries. Each entry
// records which snapshot authored it. Manifests are shared by reference
// between snapshots whenever a commit leaves them untouched.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::file::DataFile;
use crate::snapshot::SnapshotId;

pub mod merge;

pub use merge::ManifestMerger;

/// Status of a file as of the snapshot that authored the entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntryStatus {
    Existing,
    Added,
    Deleted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    status: EntryStatus,
    snapshot_id: SnapshotId,
    file: DataFile,
}

impl ManifestEntry {
    pub fn new(status: EntryStatus, snapshot_id: SnapshotId, file: DataFile) -> Self {
        Self {
            status,
            snapshot_id,
            file,
        }
    }

    pub fn added(snapshot_id: SnapshotId, file: DataFile) -> Self {
        Self::new(EntryStatus::Added, snapshot_id, file)
    }

    pub fn existing(snapshot_id: SnapshotId, file: DataFile) -> Self {
        Self::new(EntryStatus::Existing, snapshot_id, file)
    }

    pub fn deleted(snapshot_id: SnapshotId, file: DataFile) -> Self {
        Self::new(EntryStatus::Deleted, snapshot_id, file)
    }

    pub fn status(&self) -> EntryStatus {
        self.status
    }

    /// The snapshot that added the file (for ADDED and EXISTING entries)
    /// or removed it (for DELETED entries).
    pub fn snapshot_id(&self) -> SnapshotId {
        self.snapshot_id
    }

    pub fn file(&self) -> &DataFile {
        &self.file
    }

    /// Whether the file is part of the table state this entry describes.
    pub fn is_live(&self) -> bool {
        self.status != EntryStatus::Deleted
    }
}

/// Per-status entry counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ManifestCounts {
    pub added: usize,
    pub existing: usize,
    pub deleted: usize,
}

impl ManifestCounts {
    pub fn live(&self) -> usize {
        self.added + self.existing
    }

    pub fn total(&self) -> usize {
        self.added + self.existing + self.deleted
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ManifestId(pub Uuid);

#[derive(Debug, Clone)]
pub struct Manifest {
    id: ManifestId,
    added_snapshot_id: SnapshotId,
    entries: Vec<ManifestEntry>,
    counts: ManifestCounts,
}

impl Manifest {
    /// Build a manifest written by `added_snapshot_id`.
    pub fn new(added_snapshot_id: SnapshotId, entries: Vec<ManifestEntry>) -> Self {
        let mut counts = ManifestCounts::default();
        for entry in &entries {
            match entry.status() {
                EntryStatus::Added => counts.added += 1,
                EntryStatus::Existing => counts.existing += 1,
                EntryStatus::Deleted => counts.deleted += 1,
            }
        }

        Self {
            id: ManifestId(Uuid::new_v4()),
            added_snapshot_id,
            entries,
            counts,
        }
    }

    pub fn id(&self) -> ManifestId {
        self.id
    }

    /// The snapshot that wrote this manifest.
    pub fn added_snapshot_id(&self) -> SnapshotId {
        self.added_snapshot_id
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    pub fn counts(&self) -> ManifestCounts {
        self.counts
    }

    pub fn live_entries(&self) -> impl Iterator<Item = &ManifestEntry> {
        self.entries.iter().filter(|entry| entry.is_live())
    }

    /// Whether any live entry's path matches `contains`.
    pub fn has_live_path(&self, mut contains: impl FnMut(&str) -> bool) -> bool {
        self.live_entries().any(|entry| contains(entry.file().path()))
    }

    /// Small manifests are candidates for merging.
    pub fn is_small(&self, target_entries: usize) -> bool {
        self.counts.total() < target_entries
    }
}

impl PartialEq for Manifest {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Manifest {}
