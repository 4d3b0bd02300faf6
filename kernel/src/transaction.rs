// Transactions
//
// A transaction stages an ordered list of changes against the snapshot
// that was current when it started. Builders obtained from a transaction
// commit into the staged list instead of the table. `commit_transaction`
// validates the whole list, then publishes it as one chain and moves the
// pointer once; on failure nothing becomes visible.

use std::sync::Arc;

use crate::error::TableError;
use crate::ops::{
    AppendFiles, CommitTarget, DeleteFiles, OverwriteFiles, PendingChange, RewriteFiles,
};
use crate::snapshot::{Snapshot, SnapshotId};
use crate::table::Table;

#[derive(Debug)]
pub struct Transaction<'a> {
    table: &'a Table,
    base: Option<SnapshotId>,
    staged: Vec<PendingChange>,
}

impl<'a> Transaction<'a> {
    pub(crate) fn new(table: &'a Table) -> Result<Self, TableError> {
        Ok(Self {
            table,
            base: table.current_snapshot_id()?,
            staged: Vec::new(),
        })
    }

    /// The snapshot the first staged change applies to.
    pub fn base(&self) -> Option<SnapshotId> {
        self.base
    }

    pub fn staged(&self) -> &[PendingChange] {
        &self.staged
    }

    pub fn new_append(&mut self) -> AppendFiles<&mut Self> {
        AppendFiles::new(self)
    }

    pub fn new_delete(&mut self) -> DeleteFiles<&mut Self> {
        DeleteFiles::new(self)
    }

    pub fn new_rewrite(&mut self) -> RewriteFiles<&mut Self> {
        RewriteFiles::new(self)
    }

    pub fn new_overwrite(&mut self) -> OverwriteFiles<&mut Self> {
        OverwriteFiles::new(self)
    }

    /// Publish every staged change as a chain of snapshots.
    ///
    /// Returns the new snapshots in commit order; an empty transaction
    /// returns an empty list and leaves the table untouched.
    pub fn commit_transaction(self) -> Result<Vec<Arc<Snapshot>>, TableError> {
        if self.staged.is_empty() {
            return Ok(Vec::new());
        }

        let published = self.table.publish(self.base, &self.staged)?;

        tracing::info!(
            base = ?self.base.map(|id| id.get()),
            operations = published.len(),
            current = ?published.last().map(|s| s.id().get()),
            "committed transaction"
        );

        Ok(published)
    }
}

impl CommitTarget for &mut Transaction<'_> {
    type Output = ();

    fn commit(self, change: PendingChange) -> Result<(), TableError> {
        self.staged.push(change);
        Ok(())
    }
}
