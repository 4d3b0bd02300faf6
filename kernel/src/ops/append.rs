use crate::error::TableError;
use crate::file::DataFile;
use crate::ops::{CommitTarget, PendingChange};
use crate::snapshot::Operation;

/// Adds new data files. Produces an APPEND snapshot.
#[derive(Debug)]
pub struct AppendFiles<T> {
    target: T,
    change: PendingChange,
}

impl<T: CommitTarget> AppendFiles<T> {
    pub(crate) fn new(target: T) -> Self {
        Self {
            target,
            change: PendingChange::new(Operation::Append),
        }
    }

    pub fn append_file(mut self, file: DataFile) -> Self {
        self.change.add(file);
        self
    }

    pub fn append_files(mut self, files: impl IntoIterator<Item = DataFile>) -> Self {
        for file in files {
            self.change.add(file);
        }
        self
    }

    pub fn staged(&self) -> &PendingChange {
        &self.change
    }

    pub fn commit(self) -> Result<T::Output, TableError> {
        self.target.commit(self.change)
    }
}
