// Table
//
// Owns the snapshot arena, the snapshot log and the current-pointer
// store. Published snapshots are immutable and handed out as `Arc`s; the
// pointer is the only state that moves, and it only moves through a
// compare-and-swap from the base a commit was staged against.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use uuid::Uuid;

use crate::config::TableConfig;
use crate::error::TableError;
use crate::invariants::ValidatorSet;
use crate::log::{PointerChange, SnapshotLog, SnapshotLogEntry};
use crate::ops::{
    AppendFiles, DeleteFiles, OverwriteFiles, PendingChange, RewriteFiles, TableCommit,
};
use crate::pointer::{InMemoryPointerStore, PointerStore};
use crate::replay::SnapshotProducer;
use crate::rollback::Rollback;
use crate::scan::TableScan;
use crate::snapshot::{Snapshot, SnapshotGraph, SnapshotId};
use crate::transaction::Transaction;

#[derive(Debug, Default)]
struct TableInner {
    graph: SnapshotGraph,
    log: SnapshotLog,
}

#[derive(Debug)]
pub struct Table {
    uuid: Uuid,
    config: TableConfig,
    validators: ValidatorSet,
    inner: RwLock<TableInner>,
    pointer: Box<dyn PointerStore>,
}

impl Table {
    /// Create an empty table backed by an in-memory pointer store.
    pub fn new(config: TableConfig) -> Result<Self, TableError> {
        config.validate()?;
        Ok(Self {
            uuid: Uuid::new_v4(),
            config,
            validators: ValidatorSet::with_defaults(),
            inner: RwLock::new(TableInner::default()),
            pointer: Box::new(InMemoryPointerStore::new()),
        })
    }

    /// Use a caller-supplied pointer store. The store must not point at a
    /// snapshot yet.
    pub fn with_pointer_store(
        mut self,
        pointer: impl PointerStore + 'static,
    ) -> Result<Self, TableError> {
        if let Some(id) = pointer.current()? {
            return Err(TableError::InvalidOperation(format!(
                "pointer store already points at snapshot {id}"
            )));
        }
        self.pointer = Box::new(pointer);
        Ok(self)
    }

    pub fn with_validators(mut self, validators: ValidatorSet) -> Self {
        self.validators = validators;
        self
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    pub fn snapshot(&self, id: SnapshotId) -> Result<Arc<Snapshot>, TableError> {
        self.read()?.graph.get(id).cloned()
    }

    pub fn current_snapshot_id(&self) -> Result<Option<SnapshotId>, TableError> {
        Ok(self.pointer.current()?)
    }

    /// The snapshot the table is at now, or `None` before the first commit.
    pub fn current_snapshot(&self) -> Result<Option<Arc<Snapshot>>, TableError> {
        let inner = self.read()?;
        let current = self.pointer.current()?;
        let snapshot = current.map(|id| inner.graph.get(id).cloned()).transpose();
        snapshot
    }

    /// Every snapshot ever published, in id order.
    pub fn snapshots(&self) -> Result<Vec<Arc<Snapshot>>, TableError> {
        Ok(self.read()?.graph.iter().cloned().collect())
    }

    /// Pointer moves, oldest first.
    pub fn history(&self) -> Result<Vec<SnapshotLogEntry>, TableError> {
        Ok(self.read()?.log.entries().to_vec())
    }

    /// `to` and its ancestors, newest first, stopping before `from`.
    pub fn ancestors(
        &self,
        from: Option<SnapshotId>,
        to: SnapshotId,
    ) -> Result<Vec<Arc<Snapshot>>, TableError> {
        let inner = self.read()?;
        let chain = inner
            .graph
            .ancestors(from, to)?
            .map(|snapshot| snapshot.cloned())
            .collect();
        chain
    }

    pub fn new_append(&self) -> AppendFiles<TableCommit<'_>> {
        AppendFiles::new(TableCommit::new(self))
    }

    pub fn new_delete(&self) -> DeleteFiles<TableCommit<'_>> {
        DeleteFiles::new(TableCommit::new(self))
    }

    pub fn new_rewrite(&self) -> RewriteFiles<TableCommit<'_>> {
        RewriteFiles::new(TableCommit::new(self))
    }

    pub fn new_overwrite(&self) -> OverwriteFiles<TableCommit<'_>> {
        OverwriteFiles::new(TableCommit::new(self))
    }

    pub fn new_transaction(&self) -> Result<Transaction<'_>, TableError> {
        Transaction::new(self)
    }

    pub fn rollback(&self) -> Result<Rollback<'_>, TableError> {
        Rollback::new(self)
    }

    /// Move the current pointer to `target`.
    pub fn rollback_to(&self, target: SnapshotId) -> Result<Arc<Snapshot>, TableError> {
        self.rollback()?.to_snapshot_id(target).commit()
    }

    pub fn new_scan(&self) -> TableScan<'_> {
        TableScan::new(self)
    }

    /// Run `f` against the snapshot graph under a read lock.
    pub(crate) fn with_graph<R>(
        &self,
        f: impl FnOnce(&SnapshotGraph) -> Result<R, TableError>,
    ) -> Result<R, TableError> {
        f(&self.read()?.graph)
    }

    /// Produce and publish one snapshot per change as a single chain on top
    /// of `base`, then move the pointer to the last one.
    pub(crate) fn publish(
        &self,
        base: Option<SnapshotId>,
        changes: &[PendingChange],
    ) -> Result<Vec<Arc<Snapshot>>, TableError> {
        let mut inner = self.write()?;

        let actual = self.pointer.current()?;
        if actual != base {
            tracing::warn!(
                expected = ?base.map(|id| id.get()),
                actual = ?actual.map(|id| id.get()),
                "commit base is stale"
            );
            return Err(TableError::CommitConflict {
                expected: base,
                actual,
            });
        }

        let parent = base.map(|id| inner.graph.get(id).cloned()).transpose()?;
        let producer = SnapshotProducer::new(&self.config, &self.validators);
        let chain = producer.replay_changes(parent.as_deref(), inner.graph.next_id(), changes)?;

        let Some(last) = chain.last().map(Snapshot::id) else {
            return Ok(Vec::new());
        };

        inner.graph.validate_chain(&chain)?;
        self.pointer.compare_and_swap(base, last)?;
        let published = inner.graph.extend(chain);
        inner.log.record(last, PointerChange::Commit)?;

        for snapshot in &published {
            tracing::info!(
                snapshot_id = snapshot.id().get(),
                parent_id = ?snapshot.parent_id().map(|id| id.get()),
                operation = %snapshot.operation(),
                added_files = snapshot.summary().added_files,
                deleted_files = snapshot.summary().deleted_files,
                "published snapshot"
            );
        }

        Ok(published)
    }

    /// Point the table at an existing snapshot, expecting it to be at `base`.
    pub(crate) fn move_pointer(
        &self,
        base: Option<SnapshotId>,
        target: SnapshotId,
    ) -> Result<Arc<Snapshot>, TableError> {
        let mut inner = self.write()?;
        let snapshot = inner.graph.get(target).cloned()?;

        if base == Some(target) && self.pointer.current()? == base {
            return Ok(snapshot);
        }

        self.pointer.compare_and_swap(base, target)?;
        inner.log.record(target, PointerChange::Rollback)?;

        tracing::info!(
            from = ?base.map(|id| id.get()),
            to = target.get(),
            "rolled back current snapshot"
        );

        Ok(snapshot)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, TableInner>, TableError> {
        self.inner.read().map_err(|_| TableError::LockPoisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, TableInner>, TableError> {
        self.inner.write().map_err(|_| TableError::LockPoisoned)
    }
}
