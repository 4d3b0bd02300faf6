// Commit Validators
//
// Validators are pure rules evaluated against the table state a change
// was staged on, before any snapshot is produced. A failing validator
// rejects the whole commit (or the whole transaction).

use std::fmt;

use crate::ops::PendingChange;
use crate::snapshot::Operation;
use crate::state::TableFiles;

/// Result of validator evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    Pass,
    Fail(String),
}

/// Trait implemented by all commit validators.
///
/// Validators must be:
/// - Pure
/// - Deterministic
/// - Side-effect free
pub trait CommitValidator: Send + Sync {
    fn name(&self) -> &'static str;

    fn validate(&self, base: &TableFiles, change: &PendingChange) -> ValidationResult;
}

/// Ordered set of validators applied to every staged change.
#[derive(Default)]
pub struct ValidatorSet {
    validators: Vec<Box<dyn CommitValidator>>,
}

impl ValidatorSet {
    /// An empty set that accepts every change.
    pub fn new() -> Self {
        Self {
            validators: Vec::new(),
        }
    }

    /// The validators every table starts with.
    pub fn with_defaults() -> Self {
        let mut set = Self::new();
        set.register(AddedFilesMustBeNew);
        set.register(RemovedFilesMustExist);
        set
    }

    pub fn register<V: CommitValidator + 'static>(&mut self, validator: V) {
        self.validators.push(Box::new(validator));
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.validators.iter().map(|v| v.name()).collect()
    }

    /// Evaluate all validators.
    ///
    /// Stops at the first failure.
    pub fn evaluate(
        &self,
        base: &TableFiles,
        change: &PendingChange,
    ) -> Result<(), InvariantViolation> {
        for validator in &self.validators {
            match validator.validate(base, change) {
                ValidationResult::Pass => continue,
                ValidationResult::Fail(reason) => {
                    return Err(InvariantViolation {
                        validator: validator.name(),
                        reason,
                    })
                }
            }
        }
        Ok(())
    }
}

impl fmt::Debug for ValidatorSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// Returned when a validator rejects a change.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("validator `{validator}` rejected change: {reason}")]
pub struct InvariantViolation {
    pub validator: &'static str,
    pub reason: String,
}

/// A path being added must not already be live.
#[derive(Debug, Clone, Copy)]
pub struct AddedFilesMustBeNew;

impl CommitValidator for AddedFilesMustBeNew {
    fn name(&self) -> &'static str {
        "added-files-must-be-new"
    }

    fn validate(&self, base: &TableFiles, change: &PendingChange) -> ValidationResult {
        let existing: Vec<_> = change
            .added()
            .map(|file| file.path())
            .filter(|path| base.contains(path))
            .collect();

        if existing.is_empty() {
            ValidationResult::Pass
        } else {
            ValidationResult::Fail(format!(
                "files already in table: {}",
                existing.join(", ")
            ))
        }
    }
}

/// Files removed by a rewrite, or by a delete/overwrite that asked for it,
/// must be live in the base snapshot.
#[derive(Debug, Clone, Copy)]
pub struct RemovedFilesMustExist;

impl CommitValidator for RemovedFilesMustExist {
    fn name(&self) -> &'static str {
        "removed-files-must-exist"
    }

    fn validate(&self, base: &TableFiles, change: &PendingChange) -> ValidationResult {
        let required = change.operation() == Operation::Replace || change.validates_removals();
        if !required {
            return ValidationResult::Pass;
        }

        let missing: Vec<_> = change
            .removed()
            .iter()
            .filter(|path| !base.contains(path))
            .map(String::as_str)
            .collect();

        if missing.is_empty() {
            ValidationResult::Pass
        } else {
            ValidationResult::Fail(format!(
                "missing required files to delete: {}",
                missing.join(", ")
            ))
        }
    }
}
