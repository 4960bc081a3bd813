// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
use crate::exec::error::BatchError;
use crate::exec::result::{ErrorDescriptor, RecordResult};
use crate::record::Record;
use crate::store::{Store, StoreError, WriteKind};

/// Records and store handle for one batch execution
pub struct BatchContext<'a> {
    pub store: &'a dyn Store,
    /// Submitted records; only identities are ever written back
    pub records: &'a mut [Record],
    pub all_or_nothing: bool,
}

impl<'a> BatchContext<'a> {
    pub fn new(store: &'a dyn Store, records: &'a mut [Record], all_or_nothing: bool) -> Self {
        Self {
            store,
            records,
            all_or_nothing,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Copy each newly assigned identity into a record that has none yet
    pub fn assign_identities(&mut self, results: &[RecordResult]) {
        for result in results {
            if let Some(id) = result.identity() {
                let record = &mut self.records[result.index()];
                if !record.has_identity() {
                    record.assign_identity(id.clone());
                }
            }
        }
    }
}

/// Base trait for all batch statement executors
pub trait BatchStatementExecutor {
    /// Apply the operation to every record of the context, returning one
    /// result per record in input order
    fn execute(&self, context: &mut BatchContext<'_>) -> Result<Vec<RecordResult>, BatchError>;

    /// Get a description of the operation for logging
    fn operation_description(&self) -> String;
}

/// Index-aligned result slots for one batch
///
/// Records rejected by executor pre-checks get their slot filled directly;
/// the rest are filled from store results, remapped to their original index.
pub struct Outcomes {
    slots: Vec<Option<RecordResult>>,
    all_or_nothing: bool,
}

impl Outcomes {
    pub fn new(len: usize, all_or_nothing: bool) -> Self {
        Self {
            slots: vec![None; len],
            all_or_nothing,
        }
    }

    /// Fail the record at `index` before it reaches the store.
    ///
    /// In all-or-nothing mode the whole batch stops here.
    pub fn reject(&mut self, index: usize, error: ErrorDescriptor) -> Result<(), BatchError> {
        if self.all_or_nothing {
            return Err(BatchError::BatchFailure { index, error });
        }
        self.slots[index] = Some(RecordResult::failure(index, error));
        Ok(())
    }

    /// Indices still waiting for an outcome
    pub fn pending(&self) -> Vec<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_none())
            .map(|(index, _)| index)
            .collect()
    }

    /// Store results for the records at `indices`; result `i` belongs to
    /// `indices[i]`
    pub fn fill(&mut self, indices: &[usize], results: Vec<RecordResult>) -> Result<(), BatchError> {
        if results.len() != indices.len() {
            return Err(BatchError::Store(format!(
                "store returned {} results for {} records",
                results.len(),
                indices.len()
            )));
        }
        for result in results {
            let index = *indices.get(result.index()).ok_or_else(|| {
                BatchError::Store(format!(
                    "store returned out-of-range result index {}",
                    result.index()
                ))
            })?;
            if self.all_or_nothing {
                if let Some(error) = result.first_error() {
                    return Err(BatchError::BatchFailure {
                        index,
                        error: error.clone(),
                    });
                }
            }
            self.slots[index] = Some(result.reindex(index));
        }
        Ok(())
    }

    pub fn finish(self) -> Result<Vec<RecordResult>, BatchError> {
        self.slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.ok_or_else(|| BatchError::Store(format!("no outcome for record {}", index)))
            })
            .collect()
    }
}

/// Apply `kind` to a subset of the batch; `indices` maps subset positions
/// back to batch positions for error reporting
pub fn apply_subset(
    store: &dyn Store,
    kind: WriteKind,
    subset: &[Record],
    indices: &[usize],
    all_or_nothing: bool,
) -> Result<Vec<RecordResult>, BatchError> {
    if subset.is_empty() {
        return Ok(Vec::new());
    }
    store
        .apply(kind, subset, all_or_nothing)
        .map_err(|error| match error {
            StoreError::BatchFailure { index, error } => BatchError::BatchFailure {
                index: indices.get(index).copied().unwrap_or(index),
                error,
            },
            other => other.into(),
        })
}

/// Run `work` under an executor-owned store savepoint, reverting everything
/// it did if it fails
///
/// When the revert itself fails the caller gets `RollbackFailed` instead of
/// the original error. Releasing the savepoint is attempted in both cases.
pub fn atomically<T, F>(store: &dyn Store, work: F) -> Result<T, BatchError>
where
    F: FnOnce() -> Result<T, BatchError>,
{
    let token = store.begin_savepoint()?;
    match work() {
        Ok(value) => {
            store.release_savepoint(token)?;
            Ok(value)
        }
        Err(error) => {
            let reverted = store.rollback(token);
            if let Err(release_error) = store.release_savepoint(token) {
                log::warn!("Failed to release savepoint {}: {}", token, release_error);
            }
            match reverted {
                Ok(()) => Err(error),
                Err(rollback_error) => {
                    log::error!(
                        "Failed to revert atomic batch at {}: {}",
                        token,
                        rollback_error
                    );
                    Err(BatchError::RollbackFailed {
                        cause: Box::new(error),
                        rollback: rollback_error.to_string(),
                    })
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::result::ErrorKind;
    use crate::record::RecordId;

    #[test]
    fn test_outcomes_remap_store_results() {
        let mut outcomes = Outcomes::new(3, false);
        outcomes
            .reject(1, ErrorDescriptor::new(ErrorKind::MissingIdentity, "none"))
            .unwrap();
        assert_eq!(outcomes.pending(), vec![0, 2]);

        outcomes
            .fill(
                &[0, 2],
                vec![
                    RecordResult::success(0, RecordId::new("a")),
                    RecordResult::success(1, RecordId::new("b")),
                ],
            )
            .unwrap();

        let results = outcomes.finish().unwrap();
        let indices: Vec<usize> = results.iter().map(RecordResult::index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert_eq!(results[2].identity(), Some(&RecordId::new("b")));
        assert!(!results[1].is_success());
    }

    #[test]
    fn test_atomic_reject_stops_batch() {
        let mut outcomes = Outcomes::new(2, true);
        let err = outcomes
            .reject(1, ErrorDescriptor::new(ErrorKind::MissingIdentity, "none"))
            .unwrap_err();
        assert!(matches!(err, BatchError::BatchFailure { index: 1, .. }));
    }

    #[test]
    fn test_result_count_mismatch_is_an_error() {
        let mut outcomes = Outcomes::new(2, false);
        let err = outcomes
            .fill(&[0, 1], vec![RecordResult::success(0, RecordId::new("a"))])
            .unwrap_err();
        assert!(matches!(err, BatchError::Store(_)));
    }
}
