// Live File Index
//
// The set of files that make up a table at one snapshot, keyed by path.
// Derived on demand from a snapshot's manifest list; never stored.

use std::collections::HashMap;

use crate::file::DataFile;
use crate::snapshot::Snapshot;

#[derive(Debug, Clone, Default)]
pub struct TableFiles {
    files: HashMap<String, DataFile>,
}

impl TableFiles {
    /// Index the live files of `snapshot`. An absent snapshot is an empty table.
    pub fn of(snapshot: Option<&Snapshot>) -> Self {
        let files = snapshot
            .into_iter()
            .flat_map(|s| s.live_files())
            .map(|file| (file.path().to_string(), file.clone()))
            .collect();
        Self { files }
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    pub fn get(&self, path: &str) -> Option<&DataFile> {
        self.files.get(path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn total_records(&self) -> u64 {
        saturating_total(self.files.values().map(DataFile::record_count))
    }

    pub fn total_size_bytes(&self) -> u64 {
        saturating_total(self.files.values().map(DataFile::size_bytes))
    }
}

/// Sum that clamps at `u64::MAX`.
pub fn saturating_total(values: impl IntoIterator<Item = u64>) -> u64 {
    values.into_iter().fold(0, u64::saturating_add)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::{Manifest, ManifestEntry};
    use crate::snapshot::{Operation, SnapshotId, SnapshotSummary};
    use chrono::Utc;
    use std::sync::Arc;

    #[test]
    fn empty_table_has_no_files() {
        let files = TableFiles::of(None);
        assert!(files.is_empty());
        assert_eq!(files.total_records(), 0);
    }

    #[test]
    fn deleted_entries_are_not_live() {
        let id = SnapshotId::new(3);
        let a = DataFile::builder("a")
            .with_record_count(5)
            .with_size_bytes(50)
            .build();
        let b = DataFile::builder("b")
            .with_record_count(7)
            .with_size_bytes(70)
            .build();
        let gone = DataFile::builder("gone").with_record_count(100).build();

        let manifest = Manifest::new(
            id,
            vec![
                ManifestEntry::added(id, a),
                ManifestEntry::existing(SnapshotId::new(1), b),
                ManifestEntry::deleted(id, gone),
            ],
        );
        let snapshot = Snapshot::new(
            id,
            None,
            Utc::now(),
            Operation::Overwrite,
            vec![Arc::new(manifest)],
            SnapshotSummary::default(),
        );

        let files = TableFiles::of(Some(&snapshot));
        assert_eq!(files.len(), 2);
        assert!(files.contains("a"));
        assert!(!files.contains("gone"));
        assert_eq!(files.total_records(), 12);
        assert_eq!(files.total_size_bytes(), 120);
    }

    #[test]
    fn totals_clamp_at_max() {
        assert_eq!(saturating_total([u64::MAX, 1, 5]), u64::MAX);
        assert_eq!(saturating_total([2, 3]), 5);
    }
}
