// Tessera Kernel
//
// Snapshot-based table metadata: an append-only snapshot graph, commit
// operations and transactions that publish into it, rollback of the
// current pointer, and incremental scan planning over the lineage.

pub mod adapters;
pub mod config;
pub mod error;
pub mod file;
pub mod invariants;
pub mod log;
pub mod manifest;
pub mod ops;
pub mod pointer;
pub mod replay;
pub mod rollback;
pub mod scan;
pub mod simulate;
pub mod snapshot;
pub mod state;
pub mod table;
pub mod transaction;

pub use config::TableConfig;
pub use error::TableError;
pub use file::{DataFile, PartitionKey, PartitionValue};
pub use scan::{FileScanTask, IncrementalScan, TableScan};
pub use snapshot::{Operation, Snapshot, SnapshotId};
pub use table::Table;
pub use transaction::Transaction;
