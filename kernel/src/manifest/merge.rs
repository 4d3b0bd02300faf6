// Manifest Merging
//
// Consolidates small manifests during a commit so that manifest lists
// do not grow by one entry per commit forever. Merging only reshapes the
// manifest list; the set of live files and each file's authoring
// snapshot are unchanged.

use std::sync::Arc;

use crate::config::TableConfig;
use crate::manifest::{EntryStatus, Manifest, ManifestEntry};
use crate::snapshot::SnapshotId;

#[derive(Debug, Clone, Copy)]
pub struct ManifestMerger {
    enabled: bool,
    min_merge_count: usize,
    target_entries: usize,
}

impl ManifestMerger {
    pub fn new(config: &TableConfig) -> Self {
        Self {
            enabled: config.manifest_merge_enabled,
            min_merge_count: config.manifest_min_merge_count,
            target_entries: config.manifest_target_entries,
        }
    }

    /// Merge the small manifests of a new manifest list written by `snapshot_id`.
    ///
    /// The merged manifest goes first, followed by the untouched manifests in
    /// their original order.
    pub fn merge(
        &self,
        snapshot_id: SnapshotId,
        manifests: Vec<Arc<Manifest>>,
    ) -> Vec<Arc<Manifest>> {
        if !self.enabled {
            return manifests;
        }

        let (small, large): (Vec<_>, Vec<_>) = manifests
            .into_iter()
            .partition(|manifest| manifest.is_small(self.target_entries));

        if small.len() < self.min_merge_count.max(2) {
            let mut unchanged = small;
            unchanged.extend(large);
            return unchanged;
        }

        let entries = small
            .iter()
            .flat_map(|manifest| manifest.entries())
            .filter_map(|entry| carry_entry(snapshot_id, entry))
            .collect();

        tracing::debug!(
            snapshot_id = %snapshot_id,
            merged = small.len(),
            kept = large.len(),
            "merged small manifests"
        );

        let mut merged = Vec::with_capacity(large.len() + 1);
        merged.push(Arc::new(Manifest::new(snapshot_id, entries)));
        merged.extend(large);
        merged
    }
}

/// How an entry survives being rewritten into a manifest owned by `snapshot_id`.
pub(crate) fn carry_entry(
    snapshot_id: SnapshotId,
    entry: &ManifestEntry,
) -> Option<ManifestEntry> {
    let own = entry.snapshot_id() == snapshot_id;
    match entry.status() {
        EntryStatus::Added if own => Some(entry.clone()),
        EntryStatus::Added | EntryStatus::Existing => Some(ManifestEntry::existing(
            entry.snapshot_id(),
            entry.file().clone(),
        )),
        EntryStatus::Deleted if own => Some(entry.clone()),
        EntryStatus::Deleted => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::DataFile;

    fn file(name: &str) -> DataFile {
        DataFile::builder(name).build()
    }

    fn manifest(id: u64, entries: Vec<ManifestEntry>) -> Arc<Manifest> {
        Arc::new(Manifest::new(SnapshotId::new(id), entries))
    }

    fn config(min_merge_count: usize) -> TableConfig {
        TableConfig {
            manifest_min_merge_count: min_merge_count,
            ..TableConfig::default()
        }
    }

    #[test]
    fn merges_once_threshold_reached() {
        let s1 = SnapshotId::new(1);
        let s2 = SnapshotId::new(2);
        let s3 = SnapshotId::new(3);

        let manifests = vec![
            manifest(3, vec![ManifestEntry::added(s3, file("c"))]),
            manifest(
                2,
                vec![
                    ManifestEntry::added(s2, file("b")),
                    ManifestEntry::deleted(s2, file("x")),
                ],
            ),
            manifest(1, vec![ManifestEntry::added(s1, file("a"))]),
        ];

        let merged = ManifestMerger::new(&config(3)).merge(s3, manifests);
        assert_eq!(merged.len(), 1);

        let entries = merged[0].entries();
        assert_eq!(merged[0].added_snapshot_id(), s3);
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].status(), EntryStatus::Added);
        assert_eq!(entries[1].status(), EntryStatus::Existing);
        assert_eq!(entries[1].snapshot_id(), s2);
        assert_eq!(entries[2].status(), EntryStatus::Existing);
        assert_eq!(entries[2].snapshot_id(), s1);
    }

    #[test]
    fn below_threshold_keeps_list() {
        let s1 = SnapshotId::new(1);
        let s2 = SnapshotId::new(2);
        let manifests = vec![
            manifest(2, vec![ManifestEntry::added(s2, file("b"))]),
            manifest(1, vec![ManifestEntry::added(s1, file("a"))]),
        ];
        let ids: Vec<_> = manifests.iter().map(|m| m.id()).collect();

        let result = ManifestMerger::new(&config(3)).merge(s2, manifests);
        let kept: Vec<_> = result.iter().map(|m| m.id()).collect();
        assert_eq!(kept, ids);
    }

    #[test]
    fn single_small_manifest_is_never_rewritten() {
        let s1 = SnapshotId::new(1);
        let only = manifest(1, vec![ManifestEntry::added(s1, file("a"))]);
        let id = only.id();

        let result = ManifestMerger::new(&config(1)).merge(s1, vec![only]);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id(), id);
    }

    #[test]
    fn large_manifests_are_carried_by_reference() {
        let s1 = SnapshotId::new(1);
        let s2 = SnapshotId::new(2);
        let s3 = SnapshotId::new(3);
        let cfg = TableConfig {
            manifest_min_merge_count: 2,
            manifest_target_entries: 2,
            ..TableConfig::default()
        };

        let big = manifest(
            1,
            vec![
                ManifestEntry::added(s1, file("a")),
                ManifestEntry::added(s1, file("b")),
            ],
        );
        let big_id = big.id();
        let manifests = vec![
            manifest(3, vec![ManifestEntry::added(s3, file("d"))]),
            manifest(2, vec![ManifestEntry::added(s2, file("c"))]),
            big,
        ];

        let result = ManifestMerger::new(&cfg).merge(s3, manifests);
        assert_eq!(result.len(), 2);
        assert_eq!(result[1].id(), big_id);
        assert_eq!(result[0].counts().total(), 2);
    }

    #[test]
    fn disabled_merging_is_a_no_op() {
        let s1 = SnapshotId::new(1);
        let s2 = SnapshotId::new(2);
        let cfg = TableConfig {
            manifest_merge_enabled: false,
            manifest_min_merge_count: 1,
            ..TableConfig::default()
        };
        let manifests = vec![
            manifest(2, vec![ManifestEntry::added(s2, file("b"))]),
            manifest(1, vec![ManifestEntry::added(s1, file("a"))]),
        ];

        assert_eq!(ManifestMerger::new(&cfg).merge(s2, manifests).len(), 2);
    }
}
