use crate::error::TableError;
use crate::file::DataFile;
use crate::ops::{CommitTarget, PendingChange};
use crate::snapshot::Operation;

/// Adds and removes files whose logical rows may overlap. Produces an
/// OVERWRITE snapshot; incremental scans refuse ranges containing one.
#[derive(Debug)]
pub struct OverwriteFiles<T> {
    target: T,
    change: PendingChange,
}

impl<T: CommitTarget> OverwriteFiles<T> {
    pub(crate) fn new(target: T) -> Self {
        Self {
            target,
            change: PendingChange::new(Operation::Overwrite),
        }
    }

    pub fn add_file(mut self, file: DataFile) -> Self {
        self.change.add(file);
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
