use crate::error::TableError;
use crate::file::DataFile;
use crate::ops::{CommitTarget, PendingChange};
use crate::snapshot::Operation;

/// Removes data files from the live set. Produces a DELETE snapshot.
///
/// Paths that are not live are ignored unless
/// [`DeleteFiles::validate_files_exist`] was called.
#[derive(Debug)]
pub struct DeleteFiles<T> {
    target: T,
    change: PendingChange,
}

impl<T: CommitTarget> DeleteFiles<T> {
    pub(crate) fn new(target: T) -> Self {
        Self {
            target,
            change: PendingChange::new(Operation::Delete),
        }
    }

    pub fn delete_file(mut self, file: &DataFile) -> Self {
        self.change.remove_path(file.path());
        self
    }

    pub fn delete_path(mut self, path: impl Into<String>) -> Self {
        self.change.remove_path(path);
        self
    }

    pub fn validate_files_exist(mut self) -> Self {
        self.change.require_removals_exist();
        self
    }

    pub fn staged(&self) -> &PendingChange {
        &self.change
    }

    pub fn commit(self) -> Result<T::Output, TableError> {
        self.target.commit(self.change)
    }
}
