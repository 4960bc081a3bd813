// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Batch request definitions

use crate::record::Record;
use std::fmt;

/// Mutation applied to every record of a batch
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Insert,
    Update,
    Delete,
    /// Insert or update, matched on the value of `key_field`
    Upsert { key_field: String },
    /// Fold every record of the batch (the duplicates) into `master`
    Merge { master: Record },
}

impl Operation {
    pub fn upsert(key_field: impl Into<String>) -> Self {
        Operation::Upsert {
            key_field: key_field.into(),
        }
    }

    pub fn merge(master: Record) -> Self {
        Operation::Merge { master }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Operation::Insert => "INSERT",
            Operation::Update => "UPDATE",
            Operation::Delete => "DELETE",
            Operation::Upsert { .. } => "UPSERT",
            Operation::Merge { .. } => "MERGE",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Upsert { key_field } => write!(f, "UPSERT({})", key_field),
            other => f.write_str(other.name()),
        }
    }
}

/// One operation over an ordered list of records
#[derive(Debug, Clone)]
pub struct BatchRequest {
    pub operation: Operation,
    pub records: Vec<Record>,
    /// Revert everything if any record fails
    pub all_or_nothing: bool,
}

impl BatchRequest {
    pub fn new(operation: Operation, records: Vec<Record>) -> Self {
        Self {
            operation,
            records,
            all_or_nothing: false,
        }
    }

    pub fn insert(records: Vec<Record>) -> Self {
        Self::new(Operation::Insert, records)
    }

    pub fn update(records: Vec<Record>) -> Self {
        Self::new(Operation::Update, records)
    }

    pub fn delete(records: Vec<Record>) -> Self {
        Self::new(Operation::Delete, records)
    }

    pub fn upsert(key_field: impl Into<String>, records: Vec<Record>) -> Self {
        Self::new(Operation::upsert(key_field), records)
    }

    pub fn merge(master: Record, duplicates: Vec<Record>) -> Self {
        Self::new(Operation::merge(master), duplicates)
    }

    pub fn all_or_nothing(mut self, all_or_nothing: bool) -> Self {
        self.all_or_nothing = all_or_nothing;
        self
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
