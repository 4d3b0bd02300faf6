// Rollback
//
// Moves the current pointer to a snapshot that already exists. No
// snapshot is created or removed; descendants of the old pointer stay
// addressable by id but drop out of the current lineage.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::error::TableError;
use crate::snapshot::{Snapshot, SnapshotId};
use crate::table::Table;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RollbackTarget {
    Snapshot(SnapshotId),
    OlderThan(DateTime<Utc>),
}

#[derive(Debug)]
pub struct Rollback<'a> {
    table: &'a Table,
    base: Option<SnapshotId>,
    target: Option<RollbackTarget>,
}

impl<'a> Rollback<'a> {
    pub(crate) fn new(table: &'a Table) -> Result<Self, TableError> {
        Ok(Self {
            table,
            base: table.current_snapshot_id()?,
            target: None,
        })
    }

    /// Roll back to any snapshot in the table's history.
    pub fn to_snapshot_id(mut self, id: SnapshotId) -> Self {
        self.target = Some(RollbackTarget::Snapshot(id));
        self
    }

    /// Roll back to the latest ancestor of the current snapshot committed
    /// strictly before `timestamp`.
    pub fn to_snapshot_at_time(mut self, timestamp: DateTime<Utc>) -> Self {
        self.target = Some(RollbackTarget::OlderThan(timestamp));
        self
    }

    pub fn commit(self) -> Result<Arc<Snapshot>, TableError> {
        let target = match self.target {
            Some(RollbackTarget::Snapshot(id)) => id,
            Some(RollbackTarget::OlderThan(timestamp)) => self.resolve_time(timestamp)?,
            None => {
                return Err(TableError::InvalidOperation(
                    "rollback has no target snapshot".into(),
                ))
            }
        };

        self.table.move_pointer(self.base, target)
    }

    fn resolve_time(&self, timestamp: DateTime<Utc>) -> Result<SnapshotId, TableError> {
        let Some(current) = self.base else {
            return Err(TableError::NoSnapshotBeforeTime(timestamp));
        };

        self.table
            .ancestors(None, current)?
            .iter()
            .filter(|snapshot| snapshot.timestamp() < timestamp)
            .max_by_key(|snapshot| (snapshot.timestamp(), snapshot.id()))
            .map(|snapshot| snapshot.id())
            .ok_or(TableError::NoSnapshotBeforeTime(timestamp))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TableConfig;
    use crate::file::DataFile;
    use crate::log::PointerChange;

    fn table_with(names: &[&str]) -> Table {
        let table = Table::new(TableConfig::default()).unwrap();
        for name in names {
            table
                .new_append()
                .append_file(DataFile::builder(*name).build())
                .commit()
                .unwrap();
        }
        table
    }

    #[test]
    fn rollback_moves_pointer_without_new_snapshot() {
        let table = table_with(&["a", "b", "c"]);

        let target = table.rollback_to(SnapshotId::new(1)).unwrap();
        assert_eq!(target.id(), SnapshotId::new(1));
        assert_eq!(table.current_snapshot_id().unwrap(), Some(SnapshotId::new(1)));
        assert_eq!(table.snapshots().unwrap().len(), 3);

        let last = table.history().unwrap().pop().unwrap();
        assert_eq!(last.change, PointerChange::Rollback);
    }

    #[test]
    fn rollback_to_unknown_snapshot_fails() {
        let table = table_with(&["a"]);
        let err = table.rollback_to(SnapshotId::new(9)).unwrap_err();
        assert_eq!(err, TableError::SnapshotNotFound(SnapshotId::new(9)));
        assert_eq!(table.current_snapshot_id().unwrap(), Some(SnapshotId::new(1)));
    }

    #[test]
    fn rollback_to_current_is_a_no_op() {
        let table = table_with(&["a", "b"]);
        table.rollback_to(SnapshotId::new(2)).unwrap();
        assert_eq!(table.history().unwrap().len(), 2);
    }

    #[test]
    fn rollback_requires_a_target() {
        let table = table_with(&["a"]);
        let err = table.rollback().unwrap().commit().unwrap_err();
        assert!(matches!(err, TableError::InvalidOperation(_)));
    }

    #[test]
    fn rollback_to_time_picks_latest_older_ancestor() {
        let table = table_with(&["a", "b", "c"]);
        let third = table.snapshot(SnapshotId::new(3)).unwrap();

        let target = table
            .rollback()
            .unwrap()
            .to_snapshot_at_time(third.timestamp())
            .commit()
            .unwrap();
        assert_eq!(target.id(), SnapshotId::new(2));

        let first = table.snapshot(SnapshotId::new(1)).unwrap();
        let err = table
            .rollback()
            .unwrap()
            .to_snapshot_at_time(first.timestamp())
            .commit()
            .unwrap_err();
        assert_eq!(err, TableError::NoSnapshotBeforeTime(first.timestamp()));
    }

    #[test]
    fn stale_rollback_conflicts() {
        let table = table_with(&["a", "b"]);
        let rollback = table.rollback().unwrap().to_snapshot_id(SnapshotId::new(1));

        table
            .new_append()
            .append_file(DataFile::builder("c").build())
            .commit()
            .unwrap();

        let err = rollback.commit().unwrap_err();
        assert!(err.is_retryable());
    }
}
