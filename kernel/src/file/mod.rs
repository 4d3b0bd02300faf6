// Data File Registry
//
// Immutable descriptions of the physical files a table is made of.
// The kernel never opens these files; size and record count are
// supplied by the writer that produced them.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// A single partition column value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PartitionValue {
    Null,
    Bool(bool),
    Long(i64),
    String(String),
}

impl fmt::Display for PartitionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartitionValue::Null => write!(f, "null"),
            PartitionValue::Bool(b) => write!(f, "{b}"),
            PartitionValue::Long(v) => write!(f, "{v}"),
            PartitionValue::String(s) => write!(f, "{s}"),
        }
    }
}

impl From<i64> for PartitionValue {
    fn from(value: i64) -> Self {
        PartitionValue::Long(value)
    }
}

impl From<bool> for PartitionValue {
    fn from(value: bool) -> Self {
        PartitionValue::Bool(value)
    }
}

impl From<&str> for PartitionValue {
    fn from(value: &str) -> Self {
        PartitionValue::String(value.to_string())
    }
}

impl From<String> for PartitionValue {
    fn from(value: String) -> Self {
        PartitionValue::String(value)
    }
}

/// Ordered tuple of partition column values. Empty for unpartitioned tables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartitionKey(pub Vec<PartitionValue>);

impl PartitionKey {
    pub fn unpartitioned() -> Self {
        Self(Vec::new())
    }

    pub fn values(&self) -> &[PartitionValue] {
        &self.0
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (idx, value) in self.0.iter().enumerate() {
            if idx > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{value}")?;
        }
        write!(f, ")")
    }
}

/// An immutable data file record.
///
/// Identity is the path: two records with the same path are the same file,
/// whatever their other attributes say.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DataFile {
    path: String,

    #[serde(default)]
    partition: PartitionKey,

    #[serde(default)]
    size_bytes: u64,

    #[serde(default)]
    record_count: u64,
}

impl DataFile {
    pub fn new(
        path: impl Into<String>,
        partition: PartitionKey,
        size_bytes: u64,
        record_count: u64,
    ) -> Self {
        Self {
            path: path.into(),
            partition,
            size_bytes,
            record_count,
        }
    }

    /// Start building a file record for `path`.
    pub fn builder(path: impl Into<String>) -> DataFileBuilder {
        DataFileBuilder {
            file: DataFile::new(path, PartitionKey::unpartitioned(), 0, 0),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn partition(&self) -> &PartitionKey {
        &self.partition
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    pub fn record_count(&self) -> u64 {
        self.record_count
    }
}

impl PartialEq for DataFile {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

impl Eq for DataFile {}

impl Hash for DataFile {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.path.hash(state);
    }
}

impl PartialOrd for DataFile {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DataFile {
    fn cmp(&self, other: &Self) -> Ordering {
        self.path.cmp(&other.path)
    }
}

impl fmt::Display for DataFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path)
    }
}

/// Builder returned by [`DataFile::builder`].
#[derive(Debug, Clone)]
pub struct DataFileBuilder {
    file: DataFile,
}

impl DataFileBuilder {
    pub fn with_partition(mut self, partition: PartitionKey) -> Self {
        self.file.partition = partition;
        self
    }

    pub fn with_partition_value(mut self, value: impl Into<PartitionValue>) -> Self {
        self.file.partition.0.push(value.into());
        self
    }

    pub fn with_size_bytes(mut self, size_bytes: u64) -> Self {
        self.file.size_bytes = size_bytes;
        self
    }

    pub fn with_record_count(mut self, record_count: u64) -> Self {
        self.file.record_count = record_count;
        self
    }

    pub fn build(self) -> DataFile {
        self.file
    }
}
