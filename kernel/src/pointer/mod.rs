// Current Snapshot Pointer
//
// Defines the compare-and-swap contract for the single mutable piece of
// table state: which snapshot is current. Durable implementations live
// in a catalog or lock service; the in-memory store backs tests and the
// CLI.

use std::fmt;
use std::sync::Mutex;

use crate::snapshot::SnapshotId;

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum PointerError {
    #[error("pointer moved: expected {expected:?}, found {actual:?}")]
    Conflict {
        expected: Option<SnapshotId>,
        actual: Option<SnapshotId>,
    },

    #[error("pointer store unavailable: {0}")]
    Unavailable(String),
}

/// Storage for the current snapshot pointer.
///
/// Properties required from implementations:
/// - `compare_and_swap` is atomic with respect to every other call
/// - a failed swap leaves the pointer untouched
/// - a conflict is reported immediately, never by blocking
///
/// Implementations MUST NOT:
/// - Move the pointer without an expected-previous value
/// - Report success for a swap whose expectation did not hold
pub trait PointerStore: Send + Sync + fmt::Debug {
    /// Read the current pointer. `None` until the first commit.
    fn current(&self) -> Result<Option<SnapshotId>, PointerError>;

    /// Move the pointer from `expected` to `new`.
    fn compare_and_swap(
        &self,
        expected: Option<SnapshotId>,
        new: SnapshotId,
    ) -> Result<(), PointerError>;
}

/// Process-local pointer store.
#[derive(Debug, Default)]
pub struct InMemoryPointerStore {
    current: Mutex<Option<SnapshotId>>,
}

impl InMemoryPointerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PointerStore for InMemoryPointerStore {
    fn current(&self) -> Result<Option<SnapshotId>, PointerError> {
        let current = self
            .current
            .lock()
            .map_err(|_| PointerError::Unavailable("lock poisoned".into()))?;
        Ok(*current)
    }

    fn compare_and_swap(
        &self,
        expected: Option<SnapshotId>,
        new: SnapshotId,
    ) -> Result<(), PointerError> {
        let mut current = self
            .current
            .lock()
            .map_err(|_| PointerError::Unavailable("lock poisoned".into()))?;

        if *current != expected {
            return Err(PointerError::Conflict {
                expected,
                actual: *current,
            });
        }

        *current = Some(new);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn swap_requires_expected_value() {
        let store = InMemoryPointerStore::new();
        assert_eq!(store.current().unwrap(), None);

        store.compare_and_swap(None, SnapshotId::new(1)).unwrap();
        assert_eq!(store.current().unwrap(), Some(SnapshotId::new(1)));

        let err = store
            .compare_and_swap(None, SnapshotId::new(2))
            .unwrap_err();
        assert_eq!(
            err,
            PointerError::Conflict {
                expected: None,
                actual: Some(SnapshotId::new(1)),
            }
        );
        assert_eq!(store.current().unwrap(), Some(SnapshotId::new(1)));
    }

    #[test]
    fn exactly_one_racer_wins() {
        let store = Arc::new(InMemoryPointerStore::new());
        store.compare_and_swap(None, SnapshotId::new(1)).unwrap();

        let handles: Vec<_> = (2..10)
            .map(|id| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    store
                        .compare_and_swap(Some(SnapshotId::new(1)), SnapshotId::new(id))
                        .is_ok()
                })
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
    }
}
