// Incremental Scan Planning
//
// Answers "which files were appended in (from, to]". The range is the
// lineage of `to` back to, but excluding, `from`. Only APPEND snapshots
// contribute, and only the files they authored themselves; REPLACE and
// DELETE contribute nothing; a single OVERWRITE fails the whole plan.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::error::TableError;
use crate::file::DataFile;
use crate::snapshot::{Operation, Snapshot, SnapshotGraph, SnapshotId};
use crate::table::Table;

/// A file to read together with the snapshot that appended it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileScanTask {
    pub file: DataFile,
    pub snapshot_id: SnapshotId,
}

#[derive(Debug)]
pub struct IncrementalScan<'a> {
    table: &'a Table,
    from: SnapshotId,
    to: Result<SnapshotId, TableError>,
}

impl<'a> IncrementalScan<'a> {
    pub(crate) fn new(
        table: &'a Table,
        from: SnapshotId,
        to: Result<SnapshotId, TableError>,
    ) -> Self {
        Self { table, from, to }
    }

    /// Inclusive upper bound.
    pub fn to_snapshot_id(&self) -> Result<SnapshotId, TableError> {
        self.to.clone()
    }

    /// Snapshots in range, newest first.
    pub fn snapshots(&self) -> Result<Vec<Arc<Snapshot>>, TableError> {
        let to = self.to.clone()?;
        let from = self.from;
        self.table.with_graph(|graph| {
            range_chain(graph, from, to)
                .map(|chain| chain.into_iter().cloned().collect())
        })
    }

    pub fn plan_tasks(&self) -> Result<Vec<FileScanTask>, TableError> {
        let to = self.to.clone()?;
        let from = self.from;
        self.table.with_graph(|graph| plan_appends(graph, from, to))
    }

    pub fn plan_files(&self) -> Result<BTreeSet<DataFile>, TableError> {
        Ok(self
            .plan_tasks()?
            .into_iter()
            .map(|task| task.file)
            .collect())
    }
}

/// Plan the files appended in `(from, to]` of `graph`.
///
/// Tasks are ordered oldest snapshot first, then by path.
pub fn plan_appends(
    graph: &SnapshotGraph,
    from: SnapshotId,
    to: SnapshotId,
) -> Result<Vec<FileScanTask>, TableError> {
    let chain = range_chain(graph, from, to)?;

    let mut tasks = Vec::new();
    for snapshot in chain.iter().rev() {
        match snapshot.operation() {
            Operation::Append => {
                let mut added: Vec<_> = snapshot
                    .added_files()
                    .map(|file| FileScanTask {
                        file: file.clone(),
                        snapshot_id: snapshot.id(),
                    })
                    .collect();
                added.sort_by(|a, b| a.file.cmp(&b.file));
                tasks.extend(added);
            }
            Operation::Replace | Operation::Delete => {}
            Operation::Overwrite => {
                return Err(TableError::UnsupportedIncrementalOperation {
                    snapshot_id: snapshot.id(),
                    operation: snapshot.operation(),
                    from,
                    to,
                })
            }
        }
    }

    tracing::debug!(
        from = from.get(),
        to = to.get(),
        snapshots = chain.len(),
        files = tasks.len(),
        "planned incremental scan"
    );

    Ok(tasks)
}

/// Resolve and validate `(from, to]` into the full ancestor chain.
fn range_chain(
    graph: &SnapshotGraph,
    from: SnapshotId,
    to: SnapshotId,
) -> Result<Vec<&Arc<Snapshot>>, TableError> {
    if from == to {
        return Err(TableError::InvalidRange(format!(
            "from and to snapshots cannot be the same, but both are {from}"
        )));
    }
    graph.get(to)?;
    graph.get(from)?;
    graph.ancestors(Some(from), to)?.collect()
}
