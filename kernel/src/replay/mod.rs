// Snapshot Production
//
// Turns staged changes into new snapshots. A change is validated against
// the live files of the snapshot it applies to, then written as a fresh
// manifest of added files plus rewritten copies of every manifest that
// lost a file. Manifests that did not change are shared with the parent.
//
// Replaying a sequence of changes produces a chain where each snapshot is
// the parent of the next. Nothing here touches the table; publishing the
// chain is the caller's job.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{Duration, Utc};

use crate::config::TableConfig;
use crate::error::TableError;
use crate::invariants::ValidatorSet;
use crate::manifest::merge::carry_entry;
use crate::manifest::{Manifest, ManifestEntry, ManifestMerger};
use crate::ops::PendingChange;
use crate::snapshot::{Snapshot, SnapshotId, SnapshotSummary};
use crate::state::{saturating_total, TableFiles};

#[derive(Debug)]
pub struct SnapshotProducer<'a> {
    merger: ManifestMerger,
    validators: &'a ValidatorSet,
}

impl<'a> SnapshotProducer<'a> {
    pub fn new(config: &TableConfig, validators: &'a ValidatorSet) -> Self {
        Self {
            merger: ManifestMerger::new(config),
            validators,
        }
    }

    /// Apply `change` on top of `parent`, producing snapshot `id`.
    pub fn produce(
        &self,
        parent: Option<&Snapshot>,
        id: SnapshotId,
        change: &PendingChange,
    ) -> Result<Snapshot, TableError> {
        let base = TableFiles::of(parent);
        self.validators.evaluate(&base, change)?;

        let removed: BTreeSet<&str> = change
            .removed()
            .iter()
            .map(String::as_str)
            .filter(|path| base.contains(path))
            .collect();

        let mut manifests = Vec::new();
        if change.added_count() > 0 {
            let entries = change
                .added()
                .map(|file| ManifestEntry::added(id, file.clone()))
                .collect();
            manifests.push(Arc::new(Manifest::new(id, entries)));
        }

        for manifest in parent.map(Snapshot::manifests).unwrap_or_default() {
            if manifest.counts().live() == 0 {
                continue;
            }
            if manifest.has_live_path(|path| removed.contains(path)) {
                manifests.push(Arc::new(remove_from(manifest, id, &removed)));
            } else {
                manifests.push(Arc::clone(manifest));
            }
        }

        let manifests = self.merger.merge(id, manifests);

        let removed_files: Vec<_> = removed.iter().filter_map(|path| base.get(path)).collect();
        let deleted_records = saturating_total(removed_files.iter().map(|f| f.record_count()));
        let deleted_size = saturating_total(removed_files.iter().map(|f| f.size_bytes()));
        let added_records = saturating_total(change.added().map(|f| f.record_count()));
        let added_size = saturating_total(change.added().map(|f| f.size_bytes()));

        let summary = SnapshotSummary {
            added_files: change.added_count() as u64,
            deleted_files: removed.len() as u64,
            added_records,
            deleted_records,
            total_files: (base.len() + change.added_count() - removed.len()) as u64,
            total_records: base
                .total_records()
                .saturating_add(added_records)
                .saturating_sub(deleted_records),
            total_size_bytes: base
                .total_size_bytes()
                .saturating_add(added_size)
                .saturating_sub(deleted_size),
        };

        let now = Utc::now();
        let timestamp = match parent {
            Some(parent) => now.max(parent.timestamp() + Duration::milliseconds(1)),
            None => now,
        };

        tracing::debug!(
            snapshot_id = %id,
            operation = %change.operation(),
            added = summary.added_files,
            deleted = summary.deleted_files,
            manifests = manifests.len(),
            "produced snapshot"
        );

        Ok(Snapshot::new(
            id,
            parent.map(Snapshot::id),
            timestamp,
            change.operation(),
            manifests,
            summary,
        ))
    }

    /// Produce one snapshot per change, each on top of the previous one.
    ///
    /// Ids are assigned consecutively from `first_id`. Fails without
    /// producing anything if any change is rejected.
    pub fn replay_changes(
        &self,
        base: Option<&Snapshot>,
        first_id: SnapshotId,
        changes: &[PendingChange],
    ) -> Result<Vec<Snapshot>, TableError> {
        let mut chain: Vec<Snapshot> = Vec::with_capacity(changes.len());
        let mut id = first_id;

        for change in changes {
            let parent = chain.last().or(base);
            let snapshot = self.produce(parent, id, change)?;
            chain.push(snapshot);
            id = id.next();
        }

        Ok(chain)
    }
}

/// Rewrite `manifest` for snapshot `id`, marking `removed` paths deleted.
fn remove_from(manifest: &Manifest, id: SnapshotId, removed: &BTreeSet<&str>) -> Manifest {
    let entries = manifest
        .entries()
        .iter()
        .filter_map(|entry| {
            if entry.is_live() && removed.contains(entry.file().path()) {
                Some(ManifestEntry::deleted(id, entry.file().clone()))
            } else {
                carry_entry(id, entry)
            }
        })
        .collect();
    Manifest::new(id, entries)
}
