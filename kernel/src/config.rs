// Table Configuration
//
// Tunables that shape manifest layout and commit behavior. None of
// them change what a scan returns.

use serde::{Deserialize, Serialize};

use crate::error::TableError;

/// Table configuration loaded from JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct TableConfig {
    /// Minimum number of small manifests before they are merged into one.
    pub manifest_min_merge_count: usize,

    pub manifest_merge_enabled: bool,

    /// Manifests with fewer entries than this are considered small.
    pub manifest_target_entries: usize,

    /// How many times a single-operation commit re-stages itself against
    /// the new current snapshot after losing a pointer race.
    pub commit_num_retries: u32,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            manifest_min_merge_count: 100,
            manifest_merge_enabled: true,
            manifest_target_entries: 10_000,
            commit_num_retries: 0,
        }
    }
}

impl TableConfig {
    pub fn from_json(json: &str) -> Result<Self, TableError> {
        let config: TableConfig = serde_json::from_str(json)
            .map_err(|e| TableError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_min_merge_count(mut self, count: usize) -> Self {
        self.manifest_min_merge_count = count;
        self
    }

    pub fn with_commit_retries(mut self, retries: u32) -> Self {
        self.commit_num_retries = retries;
        self
    }

    pub fn validate(&self) -> Result<(), TableError> {
        if self.manifest_min_merge_count < 1 {
            return Err(TableError::InvalidConfig(
                "manifest-min-merge-count must be at least 1".into(),
            ));
        }
        if self.manifest_target_entries < 1 {
            return Err(TableError::InvalidConfig(
                "manifest-target-entries must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
