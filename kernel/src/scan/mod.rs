// Table Scans
//
// `TableScan` plans the live files of one snapshot (the current one
// unless time-travelling). Incremental scans are built from it with
// `appends_between` and `appends_after`.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::error::TableError;
use crate::file::DataFile;
use crate::snapshot::{Snapshot, SnapshotId};
use crate::table::Table;

pub mod incremental;

pub use incremental::{plan_appends, FileScanTask, IncrementalScan};

#[derive(Debug, Clone, Copy)]
pub struct TableScan<'a> {
    table: &'a Table,
    snapshot_id: Option<SnapshotId>,
}

impl<'a> TableScan<'a> {
    pub(crate) fn new(table: &'a Table) -> Self {
        Self {
            table,
            snapshot_id: None,
        }
    }

    /// Scan `id` instead of the current snapshot.
    pub fn use_snapshot(mut self, id: SnapshotId) -> Self {
        self.snapshot_id = Some(id);
        self
    }

    /// The snapshot this scan reads, or `None` for an empty table.
    pub fn snapshot(&self) -> Result<Option<Arc<Snapshot>>, TableError> {
        match self.snapshot_id {
            Some(id) => self.table.snapshot(id).map(Some),
            None => self.table.current_snapshot(),
        }
    }

    /// Live files of the scanned snapshot.
    pub fn plan_files(&self) -> Result<BTreeSet<DataFile>, TableError> {
        Ok(self
            .snapshot()?
            .map(|snapshot| snapshot.live_files().cloned().collect())
            .unwrap_or_default())
    }

    /// Files appended after `from` (exclusive) up to `to` (inclusive).
    pub fn appends_between(self, from: SnapshotId, to: SnapshotId) -> IncrementalScan<'a> {
        IncrementalScan::new(self.table, from, Ok(to))
    }

    /// Files appended after `from`, up to the snapshot current right now.
    ///
    /// The upper bound is fixed by this call; later commits do not widen it.
    pub fn appends_after(self, from: SnapshotId) -> IncrementalScan<'a> {
        let to = match self.table.current_snapshot_id() {
            Ok(Some(current)) => Ok(current),
            Ok(None) => Err(TableError::SnapshotNotFound(from)),
            Err(err) => Err(err),
        };
        IncrementalScan::new(self.table, from, to)
    }
}
