// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
use std::collections::BTreeSet;

use crate::exec::batch_stmt::{
    apply_subset, atomically, BatchContext, BatchStatementExecutor, Outcomes,
};
use crate::exec::error::BatchError;
use crate::exec::result::{ErrorDescriptor, ErrorKind, RecordResult};
use crate::record::Record;
use crate::store::WriteKind;

/// Executor for UPSERT batches
///
/// Resolves every external key with one `find_by_key` call, then splits the
/// batch into an update part (key matched) and an insert part (no match).
pub struct UpsertExecutor {
    key_field: String,
}

impl UpsertExecutor {
    pub fn new(key_field: String) -> Self {
        Self { key_field }
    }
}

impl BatchStatementExecutor for UpsertExecutor {
    fn execute(&self, context: &mut BatchContext<'_>) -> Result<Vec<RecordResult>, BatchError> {
        let object_type = match context.records.first() {
            Some(record) => record.object_type.clone(),
            None => return Ok(Vec::new()),
        };
        if let Some(other) = context
            .records
            .iter()
            .find(|record| record.object_type != object_type)
        {
            return Err(BatchError::InvalidRequest(format!(
                "upsert batch mixes object types {} and {}",
                object_type, other.object_type
            )));
        }

        let mut outcomes = Outcomes::new(context.len(), context.all_or_nothing);
        let mut keys: Vec<Option<String>> = vec![None; context.len()];
        let mut distinct = BTreeSet::new();
        for (index, record) in context.records.iter().enumerate() {
            match record.external_key(&self.key_field) {
                None => outcomes.reject(
                    index,
                    ErrorDescriptor::new(
                        ErrorKind::MissingExternalKey,
                        format!("no value for external key {}", self.key_field),
                    )
                    .with_fields([self.key_field.clone()]),
                )?,
                Some(key) if distinct.contains(&key) => outcomes.reject(
                    index,
                    ErrorDescriptor::new(
                        ErrorKind::DuplicateValue,
                        format!("external key '{}' appears more than once in the batch", key),
                    )
                    .with_fields([self.key_field.clone()]),
                )?,
                Some(key) => {
                    distinct.insert(key.clone());
                    keys[index] = Some(key);
                }
            }
        }

        if distinct.is_empty() {
            return outcomes.finish();
        }

        let matches = context
            .store
            .find_by_key(&object_type, &self.key_field, &distinct)?;
        log::debug!(
            "UPSERT({}): {} of {} key(s) matched existing records",
            self.key_field,
            matches.len(),
            distinct.len()
        );

        let mut update_indices = Vec::new();
        let mut updates = Vec::new();
        let mut insert_indices = Vec::new();
        let mut inserts = Vec::new();
        for (index, key) in keys.iter().enumerate() {
            let Some(key) = key else {
                continue;
            };
            let mut record = context.records[index].clone();
            match matches.get(key) {
                Some(id) => {
                    record.assign_identity(id.clone());
                    update_indices.push(index);
                    updates.push(record);
                }
                None => {
                    record.clear_identity();
                    insert_indices.push(index);
                    inserts.push(record);
                }
            }
        }

        let store = context.store;
        let all_or_nothing = context.all_or_nothing;
        // Both subsets always run to completion so an atomic batch reports its
        // lowest failing index; the surrounding savepoint undoes the rest.
        let apply_both = || -> Result<(Vec<RecordResult>, Vec<RecordResult>), BatchError> {
            let updated =
                apply_subset(store, WriteKind::Update, &updates, &update_indices, false)?;
            let inserted =
                apply_subset(store, WriteKind::Insert, &inserts, &insert_indices, false)?;
            if all_or_nothing {
                let first_failure = updated
                    .iter()
                    .zip(&update_indices)
                    .chain(inserted.iter().zip(&insert_indices))
                    .filter_map(|(result, &index)| {
                        result.first_error().map(|error| (index, error.clone()))
                    })
                    .min_by_key(|(index, _)| *index);
                if let Some((index, error)) = first_failure {
                    return Err(BatchError::BatchFailure { index, error });
                }
            }
            Ok((updated, inserted))
        };
        let (updated, inserted) = if all_or_nothing {
            atomically(store, apply_both)?
        } else {
            apply_both()?
        };

        outcomes.fill(&update_indices, updated)?;
        outcomes.fill(
            &insert_indices,
            inserted.into_iter().map(|result| result.created(true)).collect(),
        )?;

        let results = outcomes.finish()?;
        for result in &results {
            if let Some(id) = result.identity() {
                context.records[result.index()].assign_identity(id.clone());
            }
        }
        Ok(results)
    }

    fn operation_description(&self) -> String {
        format!("UPSERT({})", self.key_field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Value;
    use crate::store::{MemoryStore, Store, StoreSchema};

    #[test]
    fn test_mixed_object_types_rejected() {
        let store = MemoryStore::new(StoreSchema::new());
        let mut records = vec![
            Record::new("Account").field("Key", "a"),
            Record::new("Contact").field("Key", "b"),
        ];
        let mut context = BatchContext::new(&store, &mut records, false);
        let err = UpsertExecutor::new("Key".to_string())
            .execute(&mut context)
            .unwrap_err();
        assert!(matches!(err, BatchError::InvalidRequest(_)));
        assert_eq!(store.key_lookup_count(), 0);
    }

    #[test]
    fn test_no_lookup_when_every_key_missing() {
        let store = MemoryStore::new(StoreSchema::new());
        let mut records = vec![Record::new("Account"), Record::new("Account")];
        let mut context = BatchContext::new(&store, &mut records, false);
        let results = UpsertExecutor::new("Key".to_string())
            .execute(&mut context)
            .unwrap();

        assert_eq!(results.len(), 2);
        assert!(results
            .iter()
            .all(|r| r.first_error().map(|e| e.kind) == Some(ErrorKind::MissingExternalKey)));
        assert_eq!(store.key_lookup_count(), 0);
        assert!(store.is_empty());
    }

    #[test]
    fn test_atomic_failure_reports_lowest_index() {
        let store = MemoryStore::new(StoreSchema::new().required("Account", "Name"));
        let existing = store
            .apply(
                WriteKind::Insert,
                &[Record::new("Account").field("Key", "k1").field("Name", "Acme")],
                false,
            )
            .unwrap()[0]
            .identity()
            .cloned()
            .unwrap();

        // Index 0 is an insert and index 1 an update; both fail
        let mut records = vec![
            Record::new("Account").field("Key", "k2"),
            Record::new("Account")
                .field("Key", "k1")
                .field("Name", Value::Null),
        ];
        let mut context = BatchContext::new(&store, &mut records, true);
        let err = UpsertExecutor::new("Key".to_string())
            .execute(&mut context)
            .unwrap_err();

        assert!(matches!(err, BatchError::BatchFailure { index: 0, .. }));
        assert_eq!(
            store.get(&existing).unwrap().get("Name"),
            Some(&Value::from("Acme"))
        );
        assert_eq!(store.len(), 1);
        assert_eq!(store.savepoint_depth(), 0);
    }
}
