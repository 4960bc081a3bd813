// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
use std::collections::BTreeSet;

use crate::exec::batch_stmt::{atomically, BatchContext, BatchStatementExecutor, Outcomes};
use crate::exec::error::BatchError;
use crate::exec::result::{ErrorDescriptor, ErrorKind, RecordResult};
use crate::record::{Record, RecordId};

/// Executor for MERGE batches
///
/// The batch records are the duplicates. The master's stored fields are left
/// as they are; callers resolve conflicting values before merging.
pub struct MergeExecutor {
    master: Record,
}

impl MergeExecutor {
    pub fn new(master: Record) -> Self {
        Self { master }
    }

    fn precheck(
        &self,
        master_id: &RecordId,
        duplicate: &Record,
        seen: &mut BTreeSet<RecordId>,
    ) -> Result<RecordId, ErrorDescriptor> {
        let id = duplicate.identity().ok_or_else(|| {
            ErrorDescriptor::new(ErrorKind::MissingIdentity, "duplicate has no identity")
        })?;
        if id == master_id {
            return Err(ErrorDescriptor::new(
                ErrorKind::ConstraintViolation,
                format!("cannot merge record {} into itself", id),
            ));
        }
        if duplicate.object_type != self.master.object_type {
            return Err(ErrorDescriptor::validation(
                format!(
                    "duplicate is a {}, master is a {}",
                    duplicate.object_type, self.master.object_type
                ),
                ["object_type"],
            ));
        }
        if !seen.insert(id.clone()) {
            return Err(ErrorDescriptor::new(
                ErrorKind::DuplicateValue,
                format!("duplicate {} listed more than once", id),
            ));
        }
        Ok(id.clone())
    }
}

impl BatchStatementExecutor for MergeExecutor {
    fn execute(&self, context: &mut BatchContext<'_>) -> Result<Vec<RecordResult>, BatchError> {
        let master_id = self.master.identity().cloned().ok_or_else(|| {
            BatchError::InvalidRequest("merge master has no identity".to_string())
        })?;
        if context.is_empty() {
            return Err(BatchError::InvalidRequest(
                "merge requires at least one duplicate".to_string(),
            ));
        }

        let mut outcomes = Outcomes::new(context.len(), context.all_or_nothing);
        let mut seen = BTreeSet::new();
        let mut indices = Vec::new();
        let mut duplicate_ids = Vec::new();
        for (index, duplicate) in context.records.iter().enumerate() {
            match self.precheck(&master_id, duplicate, &mut seen) {
                Ok(id) => {
                    indices.push(index);
                    duplicate_ids.push(id);
                }
                Err(error) => outcomes.reject(index, error)?,
            }
        }

        if !duplicate_ids.is_empty() {
            let store = context.store;
            let all_or_nothing = context.all_or_nothing;
            let merge = || -> Result<Vec<RecordResult>, BatchError> {
                let merged = store.reassign_and_delete(&master_id, &duplicate_ids)?;
                if merged.len() != duplicate_ids.len() {
                    return Err(BatchError::Store(format!(
                        "store returned {} merge outcomes for {} duplicates",
                        merged.len(),
                        duplicate_ids.len()
                    )));
                }
                let mut results = Vec::with_capacity(merged.len());
                for (position, outcome) in merged.into_iter().enumerate() {
                    match outcome {
                        Ok(()) => results.push(RecordResult::success(position, master_id.clone())),
                        Err(error) if all_or_nothing => {
                            return Err(BatchError::BatchFailure {
                                index: indices[position],
                                error,
                            })
                        }
                        Err(error) => results.push(RecordResult::failure(position, error)),
                    }
                }
                Ok(results)
            };
            let results = if all_or_nothing {
                atomically(store, merge)?
            } else {
                merge()?
            };
            outcomes.fill(&indices, results)?;
        }

        let results = outcomes.finish()?;
        log::debug!(
            "MERGE into {}: {} of {} duplicate(s) merged",
            master_id,
            results.iter().filter(|r| r.is_success()).count(),
            results.len()
        );
        Ok(results)
    }

    fn operation_description(&self) -> String {
        match self.master.identity() {
            Some(id) => format!("MERGE INTO {}", id),
            None => "MERGE".to_string(),
        }
    }
}
