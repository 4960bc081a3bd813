// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! In-memory store implementation
//!
//! Enforces a small constraint set (required fields, unique fields, parent
//! references that must exist, restrict-on-delete) and supports nested
//! savepoints through an undo log. Also lets tests simulate outages.

use super::traits::Store;
use super::types::{
    MergeOutcome, SavepointToken, StoreError, StoreResult, StoreSchema, WriteKind,
};
use crate::exec::result::{ErrorDescriptor, ErrorKind, RecordResult};
use crate::record::{Record, RecordId, Value};
use crate::txn::log::{TransactionLog, UndoOperation};
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

/// In-memory store
pub struct MemoryStore {
    schema: StoreSchema,
    state: Arc<RwLock<MemoryState>>,
}

struct MemoryState {
    records: BTreeMap<RecordId, Record>,
    undo: TransactionLog,
    /// Open savepoints with their undo log position
    savepoints: Vec<(SavepointToken, usize)>,
    next_token: u64,
    available: bool,
    /// Number of upcoming record writes that fail as transiently unavailable
    failing_writes: usize,
    key_lookups: usize,
}

impl MemoryStore {
    /// Create a new memory store enforcing `schema`
    pub fn new(schema: StoreSchema) -> Self {
        Self {
            schema,
            state: Arc::new(RwLock::new(MemoryState {
                records: BTreeMap::new(),
                undo: TransactionLog::new(),
                savepoints: Vec::new(),
                next_token: 0,
                available: true,
                failing_writes: 0,
                key_lookups: 0,
            })),
        }
    }

    pub fn schema(&self) -> &StoreSchema {
        &self.schema
    }

    /// Fetch a stored record by identity
    pub fn get(&self, id: &RecordId) -> Option<Record> {
        self.state.read().records.get(id).cloned()
    }

    pub fn contains(&self, id: &RecordId) -> bool {
        self.state.read().records.contains_key(id)
    }

    /// Copy of every stored record
    pub fn snapshot(&self) -> BTreeMap<RecordId, Record> {
        self.state.read().records.clone()
    }

    pub fn len(&self) -> usize {
        self.state.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().records.is_empty()
    }

    /// Number of stored records of `object_type`
    pub fn count(&self, object_type: &str) -> usize {
        self.state
            .read()
            .records
            .values()
            .filter(|r| r.object_type == object_type)
            .count()
    }

    /// Identities of records referencing `parent` through any field
    pub fn children_of(&self, parent: &RecordId) -> Vec<RecordId> {
        let state = self.state.read();
        let mut children: Vec<RecordId> = state
            .referencing(parent)
            .into_iter()
            .map(|(child, _)| child)
            .collect();
        children.dedup();
        children
    }

    /// How many `find_by_key` calls have been served
    pub fn key_lookup_count(&self) -> usize {
        self.state.read().key_lookups
    }

    pub fn savepoint_depth(&self) -> usize {
        self.state.read().savepoints.len()
    }

    /// Simulate total unreachability (every call fails)
    pub fn set_available(&self, available: bool) {
        self.state.write().available = available;
    }

    /// Make the next `count` record writes fail with a transient error
    pub fn fail_next_writes(&self, count: usize) {
        self.state.write().failing_writes = count;
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(StoreSchema::new())
    }
}

impl MemoryState {
    fn ensure_available(&self) -> StoreResult<()> {
        if self.available {
            Ok(())
        } else {
            Err(StoreError::Unavailable(
                "memory store is offline".to_string(),
            ))
        }
    }

    fn take_transient_failure(&mut self) -> Result<(), ErrorDescriptor> {
        if self.failing_writes > 0 {
            self.failing_writes -= 1;
            return Err(ErrorDescriptor::new(
                ErrorKind::StoreUnavailable,
                "store temporarily unavailable",
            ));
        }
        Ok(())
    }

    /// (child, field) pairs whose field references `parent`
    fn referencing(&self, parent: &RecordId) -> Vec<(RecordId, String)> {
        self.records
            .iter()
            .flat_map(|(id, record)| {
                record
                    .references()
                    .filter(|(_, target)| *target == parent)
                    .map(|(field, _)| (id.clone(), field.clone()))
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    fn check_constraints(
        &self,
        schema: &StoreSchema,
        record: &Record,
        own_id: Option<&RecordId>,
    ) -> Result<(), ErrorDescriptor> {
        if let Some(object) = schema.object(&record.object_type) {
            let missing: Vec<&String> = object
                .required
                .iter()
                .filter(|field| record.get(field).map_or(true, Value::is_null))
                .collect();
            if !missing.is_empty() {
                let names: Vec<&str> = missing.iter().map(|s| s.as_str()).collect();
                return Err(ErrorDescriptor::validation(
                    format!("Required fields are missing: [{}]", names.join(", ")),
                    missing.into_iter().cloned(),
                ));
            }

            for field in &object.unique {
                let Some(key) = record.external_key(field) else {
                    continue;
                };
                let taken = self.records.iter().any(|(id, other)| {
                    Some(id) != own_id
                        && other.object_type == record.object_type
                        && other.external_key(field).as_deref() == Some(key.as_str())
                });
                if taken {
                    return Err(ErrorDescriptor::new(
                        ErrorKind::DuplicateValue,
                        format!("duplicate value '{}' for {}.{}", key, record.object_type, field),
                    )
                    .with_fields([field.clone()]));
                }
            }
        }

        for (field, parent) in record.references() {
            if !self.records.contains_key(parent) {
                return Err(ErrorDescriptor::new(
                    ErrorKind::ConstraintViolation,
                    format!("{} references missing record {}", field, parent),
                )
                .with_fields([field.clone()]));
            }
        }

        Ok(())
    }

    fn write_one(
        &mut self,
        schema: &StoreSchema,
        kind: WriteKind,
        record: &Record,
    ) -> Result<RecordId, ErrorDescriptor> {
        self.take_transient_failure()?;

        match kind {
            WriteKind::Insert => {
                if record.has_identity() {
                    return Err(ErrorDescriptor::validation(
                        "identity cannot be set on insert",
                        ["identity"],
                    ));
                }
                self.check_constraints(schema, record, None)?;

                let id = RecordId::generate();
                let mut stored = record.clone();
                stored.assign_identity(id.clone());
                self.records.insert(id.clone(), stored);
                self.undo.log_operation(UndoOperation::Insert { id: id.clone() });
                Ok(id)
            }
            WriteKind::Update => {
                let id = identity_of(record)?;
                let previous = self.lookup(&id)?;
                if previous.object_type != record.object_type {
                    return Err(ErrorDescriptor::validation(
                        format!(
                            "record {} is a {}, not a {}",
                            id, previous.object_type, record.object_type
                        ),
                        ["object_type"],
                    ));
                }

                let mut merged = previous.clone();
                for (name, value) in &record.fields {
                    merged.fields.insert(name.clone(), value.clone());
                }
                self.check_constraints(schema, &merged, Some(&id))?;

                self.records.insert(id.clone(), merged);
                self.undo.log_operation(UndoOperation::Update {
                    id: id.clone(),
                    previous,
                });
                Ok(id)
            }
            WriteKind::Delete => {
                let id = identity_of(record)?;
                let existing = self.lookup(&id)?;
                if let Some((child, field)) = self.referencing(&id).into_iter().next() {
                    return Err(ErrorDescriptor::new(
                        ErrorKind::ConstraintViolation,
                        format!("record {} is referenced by {} through {}", id, child, field),
                    ));
                }

                self.records.remove(&id);
                self.undo.log_operation(UndoOperation::Delete {
                    id: id.clone(),
                    deleted: existing,
                });
                Ok(id)
            }
        }
    }

    fn merge_one(
        &mut self,
        schema: &StoreSchema,
        master: &RecordId,
        duplicate: &RecordId,
    ) -> MergeOutcome {
        self.take_transient_failure()?;

        if duplicate == master {
            return Err(ErrorDescriptor::new(
                ErrorKind::ConstraintViolation,
                format!("cannot merge record {} into itself", master),
            ));
        }
        let master_type = self.lookup(master)?.object_type;
        let dup_type = self.lookup(duplicate)?.object_type;
        if dup_type != master_type {
            return Err(ErrorDescriptor::validation(
                format!(
                    "duplicate {} is a {}, master is a {}",
                    duplicate, dup_type, master_type
                ),
                ["object_type"],
            ));
        }

        let children = self.referencing(duplicate);
        for (child_id, field) in &children {
            let child_type = &self.records[child_id].object_type;
            if !schema.is_unique(child_type, field) {
                continue;
            }
            let conflict = self.records.iter().any(|(id, other)| {
                id != child_id
                    && &other.object_type == child_type
                    && other.get(field).and_then(Value::as_reference) == Some(master)
            });
            if conflict {
                return Err(ErrorDescriptor::new(
                    ErrorKind::ConstraintViolation,
                    format!(
                        "{}.{} already references master {}",
                        child_type, field, master
                    ),
                )
                .with_fields([field.clone()]));
            }
        }

        let mut operations = Vec::with_capacity(children.len() + 1);
        for (child_id, field) in children {
            if let Some(child) = self.records.get_mut(&child_id) {
                let previous = child.clone();
                child.set(field, Value::Reference(master.clone()));
                operations.push(UndoOperation::Update {
                    id: child_id,
                    previous,
                });
            }
        }
        if let Some(deleted) = self.records.remove(duplicate) {
            operations.push(UndoOperation::Delete {
                id: duplicate.clone(),
                deleted,
            });
        }
        self.undo.log_operation(UndoOperation::Batch { operations });
        Ok(())
    }

    fn lookup(&self, id: &RecordId) -> Result<Record, ErrorDescriptor> {
        self.records.get(id).cloned().ok_or_else(|| {
            ErrorDescriptor::new(ErrorKind::NotFound, format!("record {} not found", id))
        })
    }

    fn revert(&mut self, operation: UndoOperation) {
        match operation {
            UndoOperation::Insert { id } => {
                self.records.remove(&id);
            }
            UndoOperation::Update { id, previous } => {
                self.records.insert(id, previous);
            }
            UndoOperation::Delete { id, deleted } => {
                self.records.insert(id, deleted);
            }
            UndoOperation::Batch { operations } => {
                for op in operations.into_iter().rev() {
                    self.revert(op);
                }
            }
        }
    }

    fn unwind_to(&mut self, position: usize) {
        for op in self.undo.unwind_to(position) {
            self.revert(op);
        }
    }

    /// Without open savepoints nothing can be rolled back any more
    fn settle(&mut self) {
        if self.savepoints.is_empty() {
            self.undo.clear();
        }
    }

    fn savepoint_position(&self, token: SavepointToken) -> StoreResult<usize> {
        self.savepoints
            .iter()
            .position(|(open, _)| *open == token)
            .ok_or(StoreError::InvalidSavepoint(token))
    }
}

fn identity_of(record: &Record) -> Result<RecordId, ErrorDescriptor> {
    record.identity().cloned().ok_or_else(|| {
        ErrorDescriptor::new(ErrorKind::MissingIdentity, "record has no identity")
    })
}

impl Store for MemoryStore {
    fn apply(
        &self,
        kind: WriteKind,
        records: &[Record],
        all_or_nothing: bool,
    ) -> StoreResult<Vec<RecordResult>> {
        let mut state = self.state.write();
        state.ensure_available()?;

        let mark = state.undo.position();
        let mut results = Vec::with_capacity(records.len());
        for (index, record) in records.iter().enumerate() {
            match state.write_one(&self.schema, kind, record) {
                Ok(id) => results.push(RecordResult::success(index, id)),
                Err(error) if all_or_nothing => {
                    state.unwind_to(mark);
                    state.settle();
                    log::debug!(
                        "MemoryStore: atomic {} reverted at record {}: {}",
                        kind,
                        index,
                        error
                    );
                    return Err(StoreError::BatchFailure { index, error });
                }
                Err(error) => results.push(RecordResult::failure(index, error)),
            }
        }
        state.settle();
        Ok(results)
    }

    fn find_by_key(
        &self,
        object_type: &str,
        key_field: &str,
        key_values: &BTreeSet<String>,
    ) -> StoreResult<HashMap<String, RecordId>> {
        let mut state = self.state.write();
        state.ensure_available()?;
        state.key_lookups += 1;

        let found = state
            .records
            .iter()
            .filter(|(_, record)| record.object_type == object_type)
            .filter_map(|(id, record)| {
                record
                    .external_key(key_field)
                    .filter(|key| key_values.contains(key))
                    .map(|key| (key, id.clone()))
            })
            .collect();
        Ok(found)
    }

    fn begin_savepoint(&self) -> StoreResult<SavepointToken> {
        let mut state = self.state.write();
        state.ensure_available()?;

        state.next_token += 1;
        let token = SavepointToken::new(state.next_token);
        let position = state.undo.position();
        state.savepoints.push((token, position));
        Ok(token)
    }

    fn rollback(&self, token: SavepointToken) -> StoreResult<()> {
        let mut state = self.state.write();
        state.ensure_available()?;

        let index = state.savepoint_position(token)?;
        let position = state.savepoints[index].1;
        state.unwind_to(position);
        state.savepoints.truncate(index + 1);
        Ok(())
    }

    fn release_savepoint(&self, token: SavepointToken) -> StoreResult<()> {
        let mut state = self.state.write();
        state.ensure_available()?;

        let index = state.savepoint_position(token)?;
        state.savepoints.truncate(index);
        state.settle();
        Ok(())
    }

    fn commit(&self) -> StoreResult<()> {
        let mut state = self.state.write();
        state.ensure_available()?;

        state.savepoints.clear();
        state.undo.clear();
        Ok(())
    }

    fn reassign_and_delete(
        &self,
        master: &RecordId,
        duplicates: &[RecordId],
    ) -> StoreResult<Vec<MergeOutcome>> {
        let mut state = self.state.write();
        state.ensure_available()?;

        let outcomes = duplicates
            .iter()
            .map(|duplicate| state.merge_one(&self.schema, master, duplicate))
            .collect();
        state.settle();
        Ok(outcomes)
    }
}
