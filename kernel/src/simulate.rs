// Script Simulation
//
// Replays a scripted sequence of commits, rollbacks and scans against a
// table and records what each step did. A failing step is recorded and
// the script carries on, so one run shows every error a script hits.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::adapters::iceberg::TableMetadata;
use crate::error::TableError;
use crate::file::DataFile;
use crate::ops::{
    AppendFiles, CommitTarget, DeleteFiles, OverwriteFiles, RewriteFiles, TableCommit,
};
use crate::snapshot::SnapshotId;
use crate::table::Table;

/// One scripted action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "kebab-case")]
pub enum Step {
    Append {
        files: Vec<DataFile>,
    },
    Delete {
        paths: Vec<String>,
        #[serde(default)]
        validate: bool,
    },
    Rewrite {
        delete: Vec<String>,
        add: Vec<DataFile>,
    },
    Overwrite {
        #[serde(default)]
        add: Vec<DataFile>,
        #[serde(default)]
        delete: Vec<String>,
    },
    /// Commit steps applied atomically. Only append, delete, rewrite and
    /// overwrite may be nested.
    Transaction {
        steps: Vec<Step>,
    },
    Rollback {
        #[serde(default)]
        snapshot: Option<SnapshotId>,
        #[serde(default)]
        before: Option<DateTime<Utc>>,
    },
    AppendsBetween {
        from: SnapshotId,
        to: SnapshotId,
    },
    AppendsAfter {
        from: SnapshotId,
    },
    Scan {
        #[serde(default)]
        snapshot: Option<SnapshotId>,
    },
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Step::Append { .. } => "append",
            Step::Delete { .. } => "delete",
            Step::Rewrite { .. } => "rewrite",
            Step::Overwrite { .. } => "overwrite",
            Step::Transaction { .. } => "transaction",
            Step::Rollback { .. } => "rollback",
            Step::AppendsBetween { .. } => "appends-between",
            Step::AppendsAfter { .. } => "appends-after",
            Step::Scan { .. } => "scan",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum StepResult {
    /// Snapshot ids the step published or moved the pointer to.
    Committed {
        #[serde(rename = "snapshot-ids")]
        snapshot_ids: Vec<SnapshotId>,
    },
    /// Paths a scan planned, in path order.
    Planned { files: Vec<String> },
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepOutcome {
    pub index: usize,
    pub op: &'static str,
    #[serde(flatten)]
    pub result: StepResult,
}

/// Result of a full simulation run.
#[derive(Debug, Serialize)]
pub struct SimulationResult {
    pub outcomes: Vec<StepOutcome>,
    pub metadata: TableMetadata,
}

impl SimulationResult {
    pub fn failures(&self) -> impl Iterator<Item = &StepOutcome> {
        self.outcomes
            .iter()
            .filter(|outcome| matches!(outcome.result, StepResult::Failed { .. }))
    }
}

/// Run `steps` in order against `table`.
///
/// Only exporting the final metadata can fail the run itself.
pub fn simulate_table(table: &Table, steps: &[Step]) -> Result<SimulationResult, TableError> {
    let outcomes = steps
        .iter()
        .enumerate()
        .map(|(index, step)| {
            let result = match run_step(table, step) {
                Ok(result) => result,
                Err(err) => {
                    tracing::warn!(index, op = step.name(), error = %err, "script step failed");
                    StepResult::Failed {
                        error: err.to_string(),
                    }
                }
            };
            StepOutcome {
                index,
                op: step.name(),
                result,
            }
        })
        .collect();

    Ok(SimulationResult {
        outcomes,
        metadata: TableMetadata::from_table(table)?,
    })
}

fn run_step(table: &Table, step: &Step) -> Result<StepResult, TableError> {
    match step {
        Step::Transaction { steps } => {
            let mut txn = table.new_transaction()?;
            for nested in steps {
                apply_commit(&mut txn, nested)?;
            }
            let published = txn.commit_transaction()?;
            Ok(StepResult::Committed {
                snapshot_ids: published.iter().map(|s| s.id()).collect(),
            })
        }
        Step::Rollback { snapshot, before } => {
            let rollback = match (snapshot, before) {
                (Some(id), None) => table.rollback()?.to_snapshot_id(*id),
                (None, Some(ts)) => table.rollback()?.to_snapshot_at_time(*ts),
                _ => {
                    return Err(TableError::InvalidOperation(
                        "rollback needs exactly one of `snapshot` or `before`".into(),
                    ))
                }
            };
            let target = rollback.commit()?;
            Ok(StepResult::Committed {
                snapshot_ids: vec![target.id()],
            })
        }
        Step::AppendsBetween { from, to } => {
            planned(table.new_scan().appends_between(*from, *to).plan_files()?)
        }
        Step::AppendsAfter { from } => {
            planned(table.new_scan().appends_after(*from).plan_files()?)
        }
        Step::Scan { snapshot } => {
            let scan = match snapshot {
                Some(id) => table.new_scan().use_snapshot(*id),
                None => table.new_scan(),
            };
            planned(scan.plan_files()?)
        }
        commit => {
            let snapshot = apply_commit(TableCommit::new(table), commit)?;
            Ok(StepResult::Committed {
                snapshot_ids: vec![snapshot.id()],
            })
        }
    }
}

fn planned(files: BTreeSet<DataFile>) -> Result<StepResult, TableError> {
    Ok(StepResult::Planned {
        files: files.iter().map(|file| file.path().to_string()).collect(),
    })
}

/// Stage a commit step on `target`, committing it there.
fn apply_commit<T: CommitTarget>(target: T, step: &Step) -> Result<T::Output, TableError> {
    match step {
        Step::Append { files } => AppendFiles::new(target)
            .append_files(files.iter().cloned())
            .commit(),
        Step::Delete { paths, validate } => {
            let mut delete = DeleteFiles::new(target);
            for path in paths {
                delete = delete.delete_path(path.as_str());
            }
            if *validate {
                delete = delete.validate_files_exist();
            }
            delete.commit()
        }
        Step::Rewrite { delete, add } => {
            let mut rewrite = RewriteFiles::new(target);
            for path in delete {
                rewrite = rewrite.delete_path(path.as_str());
            }
            for file in add {
                rewrite = rewrite.add_file(file.clone());
            }
            rewrite.commit()
        }
        Step::Overwrite { add, delete } => {
            let mut overwrite = OverwriteFiles::new(target);
            for path in delete {
                overwrite = overwrite.delete_path(path.as_str());
            }
            for file in add {
                overwrite = overwrite.add_file(file.clone());
            }
            overwrite.commit()
        }
        other => Err(TableError::InvalidOperation(format!(
            "`{}` is not a commit step",
            other.name()
        ))),
    }
}
