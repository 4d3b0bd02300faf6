use crate::error::TableError;
use crate::file::DataFile;
use crate::ops::{CommitTarget, PendingChange};
use crate::snapshot::Operation;

/// Replaces files with re-encoded copies of the same rows. Produces a
/// REPLACE snapshot, which incremental scans never report as new data.
///
/// Every file being replaced must be live in the base snapshot.
#[derive(Debug)]
pub struct RewriteFiles<T> {
    target: T,
    change: PendingChange,
}

impl<T: CommitTarget> RewriteFiles<T> {
    pub(crate) fn new(target: T) -> Self {
        let mut change = PendingChange::new(Operation::Replace);
        change.require_removals_exist();
        Self { target, change }
    }

    pub fn rewrite_files(
        mut self,
        to_delete: impl IntoIterator<Item = DataFile>,
        to_add: impl IntoIterator<Item = DataFile>,
    ) -> Self {
        for file in to_delete {
            self.change.remove_path(file.path());
        }
        for file in to_add {
            self.change.add(file);
        }
        self
    }

    pub fn delete_file(mut self, file: &DataFile) -> Self {
        self.change.remove_path(file.path());
        self
    }

    pub fn delete_path(mut self, path: impl Into<String>) -> Self {
        self.change.remove_path(path);
        self
    }

    pub fn add_file(mut self, file: DataFile) -> Self {
        self.change.add(file);
        self
    }

    pub fn staged(&self) -> &PendingChange {
        &self.change
    }

    pub fn commit(self) -> Result<T::Output, TableError> {
        self.target.commit(self.change)
    }
}
