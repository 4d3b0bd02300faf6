// Iceberg Metadata Export
//
// Renders a table as an Iceberg-style metadata document: identity,
// current pointer, every snapshot with its summary and manifest list,
// and the snapshot log. Manifests are described by their counts only;
// file-level entries are not exported.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::TableConfig;
use crate::error::TableError;
use crate::log::SnapshotLogEntry;
use crate::manifest::{Manifest, ManifestId};
use crate::snapshot::{Operation, Snapshot, SnapshotId, SnapshotSummary};
use crate::table::Table;

pub const FORMAT_VERSION: u8 = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableMetadata {
    #[serde(rename = "format-version")]
    pub format_version: u8,

    #[serde(rename = "table-uuid")]
    pub table_uuid: Uuid,

    #[serde(rename = "current-snapshot-id")]
    pub current_snapshot_id: Option<SnapshotId>,

    pub properties: BTreeMap<String, String>,

    pub snapshots: Vec<SnapshotMetadata>,

    #[serde(rename = "snapshot-log")]
    pub snapshot_log: Vec<SnapshotLogEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    #[serde(rename = "snapshot-id")]
    pub snapshot_id: SnapshotId,

    #[serde(rename = "parent-snapshot-id", skip_serializing_if = "Option::is_none", default)]
    pub parent_snapshot_id: Option<SnapshotId>,

    #[serde(rename = "timestamp-ms")]
    pub timestamp_ms: i64,

    pub operation: Operation,

    pub summary: SnapshotSummary,

    pub manifests: Vec<ManifestMetadata>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestMetadata {
    #[serde(rename = "manifest-id")]
    pub manifest_id: ManifestId,

    #[serde(rename = "added-snapshot-id")]
    pub added_snapshot_id: SnapshotId,

    #[serde(rename = "added-files-count")]
    pub added_files_count: usize,

    #[serde(rename = "existing-files-count")]
    pub existing_files_count: usize,

    #[serde(rename = "deleted-files-count")]
    pub deleted_files_count: usize,
}

impl TableMetadata {
    pub fn from_table(table: &Table) -> Result<Self, TableError> {
        let snapshots = table
            .snapshots()?
            .iter()
            .map(|snapshot| SnapshotMetadata::from_snapshot(snapshot))
            .collect();

        Ok(Self {
            format_version: FORMAT_VERSION,
            table_uuid: table.uuid(),
            current_snapshot_id: table.current_snapshot_id()?,
            properties: properties(table.config()),
            snapshots,
            snapshot_log: table.history()?,
        })
    }

    pub fn snapshot(&self, id: SnapshotId) -> Option<&SnapshotMetadata> {
        self.snapshots.iter().find(|s| s.snapshot_id == id)
    }
}

impl SnapshotMetadata {
    fn from_snapshot(snapshot: &Snapshot) -> Self {
        Self {
            snapshot_id: snapshot.id(),
            parent_snapshot_id: snapshot.parent_id(),
            timestamp_ms: snapshot.timestamp().timestamp_millis(),
            operation: snapshot.operation(),
            summary: snapshot.summary().clone(),
            manifests: snapshot
                .manifests()
                .iter()
                .map(|manifest| ManifestMetadata::from_manifest(manifest))
                .collect(),
        }
    }
}

impl ManifestMetadata {
    fn from_manifest(manifest: &Manifest) -> Self {
        let counts = manifest.counts();
        Self {
            manifest_id: manifest.id(),
            added_snapshot_id: manifest.added_snapshot_id(),
            added_files_count: counts.added,
            existing_files_count: counts.existing,
            deleted_files_count: counts.deleted,
        }
    }
}

fn properties(config: &TableConfig) -> BTreeMap<String, String> {
    BTreeMap::from([
        (
            "manifest-min-merge-count".to_string(),
            config.manifest_min_merge_count.to_string(),
        ),
        (
            "manifest-merge-enabled".to_string(),
            config.manifest_merge_enabled.to_string(),
        ),
        (
            "manifest-target-entries".to_string(),
            config.manifest_target_entries.to_string(),
        ),
        (
            "commit-num-retries".to_string(),
            config.commit_num_retries.to_string(),
        ),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::DataFile;

    #[test]
    fn export_describes_snapshots_and_log() {
        let table = Table::new(TableConfig::default()).unwrap();
        table
            .new_append()
            .append_file(DataFile::builder("a").with_record_count(4).build())
            .commit()
            .unwrap();
        table
            .new_delete()
            .delete_path("a")
            .commit()
            .unwrap();

        let metadata = TableMetadata::from_table(&table).unwrap();
        assert_eq!(metadata.table_uuid, table.uuid());
        assert_eq!(metadata.current_snapshot_id, Some(SnapshotId::new(2)));
        assert_eq!(metadata.snapshot_log.len(), 2);
        assert_eq!(metadata.properties["manifest-min-merge-count"], "100");

        let deleted = metadata.snapshot(SnapshotId::new(2)).unwrap();
        assert_eq!(deleted.operation, Operation::Delete);
        assert_eq!(deleted.parent_snapshot_id, Some(SnapshotId::new(1)));
        assert_eq!(deleted.summary.deleted_records, 4);
        assert_eq!(deleted.manifests[0].deleted_files_count, 1);
    }

    #[test]
    fn json_uses_iceberg_field_names() {
        let table = Table::new(TableConfig::default()).unwrap();
        table
            .new_append()
            .append_file(DataFile::builder("a").build())
            .commit()
            .unwrap();

        let metadata = TableMetadata::from_table(&table).unwrap();
        let json = serde_json::to_value(&metadata).unwrap();

        assert_eq!(json["format-version"], 2);
        assert_eq!(json["current-snapshot-id"], 1);
        assert_eq!(json["snapshots"][0]["operation"], "append");
        assert!(json["snapshots"][0].get("parent-snapshot-id").is_none());
        assert_eq!(json["snapshots"][0]["summary"]["added-files"], 1);
        assert_eq!(json["snapshot-log"][0]["change"], "commit");

        let parsed: TableMetadata = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, metadata);
    }
}
