// Commit Operations
//
// Append, Delete, Rewrite and Overwrite stage a change set and finish
// with exactly one `commit()`. The operation kind is data on the staged
// change; where the commit goes (straight to the table, or into a
// transaction) is decided by the builder's `CommitTarget`.

use std::collections::{BTreeMap, BTreeSet};
use std::slice;
use std::sync::Arc;

use crate::error::TableError;
use crate::file::DataFile;
use crate::snapshot::{Operation, Snapshot, SnapshotId};
use crate::table::Table;

pub mod append;
pub mod delete;
pub mod overwrite;
pub mod rewrite;

pub use append::AppendFiles;
pub use delete::DeleteFiles;
pub use overwrite::OverwriteFiles;
pub use rewrite::RewriteFiles;

/// A staged, not yet committed change.
///
/// Files are keyed by path, so staging the same path twice keeps one copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingChange {
    operation: Operation,
    added: BTreeMap<String, DataFile>,
    removed: BTreeSet<String>,
    validate_removals: bool,
}

impl PendingChange {
    pub fn new(operation: Operation) -> Self {
        Self {
            operation,
            added: BTreeMap::new(),
            removed: BTreeSet::new(),
            validate_removals: false,
        }
    }

    pub fn add(&mut self, file: DataFile) {
        self.added.insert(file.path().to_string(), file);
    }

    pub fn remove_path(&mut self, path: impl Into<String>) {
        self.removed.insert(path.into());
    }

    /// Make removing a file that is not live a validation failure.
    pub fn require_removals_exist(&mut self) {
        self.validate_removals = true;
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    /// Staged additions in path order.
    pub fn added(&self) -> impl Iterator<Item = &DataFile> {
        self.added.values()
    }

    pub fn added_count(&self) -> usize {
        self.added.len()
    }

    pub fn removed(&self) -> &BTreeSet<String> {
        &self.removed
    }

    pub fn validates_removals(&self) -> bool {
        self.validate_removals
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Where a builder's `commit()` sends its staged change.
pub trait CommitTarget {
    type Output;

    fn commit(self, change: PendingChange) -> Result<Self::Output, TableError>;
}

/// Commits directly to a table, producing one snapshot.
///
/// The base snapshot is captured when the builder is created; the commit
/// only succeeds if the table is still at that snapshot.
#[derive(Debug)]
pub struct TableCommit<'a> {
    table: &'a Table,
    base: Result<Option<SnapshotId>, TableError>,
}

impl<'a> TableCommit<'a> {
    pub(crate) fn new(table: &'a Table) -> Self {
        Self {
            table,
            base: table.current_snapshot_id(),
        }
    }

    /// The snapshot this commit was staged against.
    pub fn base(&self) -> Result<Option<SnapshotId>, TableError> {
        self.base.clone()
    }
}

impl CommitTarget for TableCommit<'_> {
    type Output = Arc<Snapshot>;

    fn commit(self, change: PendingChange) -> Result<Arc<Snapshot>, TableError> {
        let mut base = self.base?;
        let max_retries = self.table.config().commit_num_retries;
        let mut attempt = 0;

        loop {
            match self.table.publish(base, slice::from_ref(&change)) {
                Ok(published) => {
                    return published.into_iter().next().ok_or_else(|| {
                        TableError::InvalidOperation("commit produced no snapshot".into())
                    })
                }
                Err(err) if err.is_retryable() && attempt < max_retries => {
                    attempt += 1;
                    base = self.table.current_snapshot_id()?;
                    tracing::warn!(
                        attempt,
                        max_retries,
                        operation = %change.operation(),
                        error = %err,
                        "re-staging commit against new current snapshot"
                    );
                }
                Err(err) => return Err(err),
            }
        }
    }
}
