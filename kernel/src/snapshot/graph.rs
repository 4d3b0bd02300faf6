// Snapshot Graph
//
// Append-only arena of published snapshots indexed by id. Parents are
// stored as ids, never as references, so the lineage is a tree with
// dead branches after rollbacks and can never form a cycle.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::TableError;
use crate::snapshot::{Snapshot, SnapshotId};

#[derive(Debug, Default)]
pub struct SnapshotGraph {
    snapshots: BTreeMap<SnapshotId, Arc<Snapshot>>,
}

impl SnapshotGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: SnapshotId) -> Result<&Arc<Snapshot>, TableError> {
        self.snapshots
            .get(&id)
            .ok_or(TableError::SnapshotNotFound(id))
    }

    pub fn contains(&self, id: SnapshotId) -> bool {
        self.snapshots.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Highest id ever published.
    pub fn last_id(&self) -> Option<SnapshotId> {
        self.snapshots.keys().next_back().copied()
    }

    /// Id the next published snapshot will receive.
    pub fn next_id(&self) -> SnapshotId {
        self.last_id()
            .map(|id| id.next())
            .unwrap_or(SnapshotId::FIRST)
    }

    /// All snapshots in id order, including abandoned branches.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Snapshot>> {
        self.snapshots.values()
    }

    /// Check that `chain` can be appended: ids strictly increase past the
    /// last published id and every parent is either published or earlier
    /// in the chain.
    pub fn validate_chain(&self, chain: &[Snapshot]) -> Result<(), TableError> {
        let mut last = self.last_id();
        for (idx, snapshot) in chain.iter().enumerate() {
            if last.is_some_and(|last| snapshot.id() <= last) {
                return Err(TableError::InvalidLineage {
                    snapshot_id: snapshot.id(),
                    reason: "snapshot ids must strictly increase".into(),
                });
            }

            if let Some(parent) = snapshot.parent_id() {
                let staged_parent = chain[..idx].iter().any(|s| s.id() == parent);
                if !staged_parent && !self.contains(parent) {
                    return Err(TableError::InvalidLineage {
                        snapshot_id: snapshot.id(),
                        reason: format!("parent snapshot {parent} does not exist"),
                    });
                }
            }

            last = Some(snapshot.id());
        }
        Ok(())
    }

    /// Publish a chain that passed [`SnapshotGraph::validate_chain`].
    pub fn extend(&mut self, chain: Vec<Snapshot>) -> Vec<Arc<Snapshot>> {
        chain
            .into_iter()
            .map(|snapshot| {
                let snapshot = Arc::new(snapshot);
                self.snapshots.insert(snapshot.id(), Arc::clone(&snapshot));
                snapshot
            })
            .collect()
    }

    /// Validate and publish a single snapshot.
    pub fn insert(&mut self, snapshot: Snapshot) -> Result<Arc<Snapshot>, TableError> {
        let chain = vec![snapshot];
        self.validate_chain(&chain)?;
        Ok(self.extend(chain).remove(0))
    }

    /// Walk `to`'s parent chain backwards.
    ///
    /// With `from` set, the walk stops before yielding `from` and yields an
    /// `UnreachableAncestor` error if it reaches the root without meeting it.
    /// Without `from`, it runs to the root.
    pub fn ancestors(
        &self,
        from: Option<SnapshotId>,
        to: SnapshotId,
    ) -> Result<Ancestors<'_>, TableError> {
        self.get(to)?;
        Ok(Ancestors {
            graph: self,
            next: Some(to),
            stop_at: from,
            to,
            done: false,
        })
    }
}

/// Lazy backward walk over a snapshot's lineage.
#[derive(Debug)]
pub struct Ancestors<'g> {
    graph: &'g SnapshotGraph,
    next: Option<SnapshotId>,
    stop_at: Option<SnapshotId>,
    to: SnapshotId,
    done: bool,
}

impl<'g> Iterator for Ancestors<'g> {
    type Item = Result<&'g Arc<Snapshot>, TableError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let Some(id) = self.next else {
            self.done = true;
            return self.stop_at.map(|from| {
                Err(TableError::UnreachableAncestor { from, to: self.to })
            });
        };

        if self.stop_at == Some(id) {
            self.done = true;
            return None;
        }

        match self.graph.snapshots.get(&id) {
            Some(snapshot) => {
                self.next = snapshot.parent_id();
                Some(Ok(snapshot))
            }
            None => {
                self.done = true;
                Some(Err(TableError::InvalidLineage {
                    snapshot_id: id,
                    reason: "ancestor missing from snapshot graph".into(),
                }))
            }
        }
    }
}
