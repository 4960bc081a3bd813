// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Store types and error handling

use crate::exec::result::ErrorDescriptor;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use thiserror::Error;

/// Primitive write applied by [`super::Store::apply`]
///
/// Upsert and merge are resolved by the executor into these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WriteKind {
    Insert,
    Update,
    Delete,
}

impl fmt::Display for WriteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WriteKind::Insert => "insert",
            WriteKind::Update => "update",
            WriteKind::Delete => "delete",
        };
        write!(f, "{}", name)
    }
}

/// Store-issued savepoint handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SavepointToken(u64);

impl SavepointToken {
    pub fn new(id: u64) -> Self {
        SavepointToken(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SavepointToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sp_{}", self.0)
    }
}

/// Error type for store operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    /// The store cannot be reached at all
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// An all-or-nothing apply was reverted because of the record at `index`
    #[error("batch reverted at record {index}: {error}")]
    BatchFailure { index: usize, error: ErrorDescriptor },

    /// The token is not on the store's savepoint stack
    #[error("unknown savepoint {0}")]
    InvalidSavepoint(SavepointToken),

    #[error("internal store error: {0}")]
    Internal(String),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Per-duplicate outcome of a merge
pub type MergeOutcome = Result<(), ErrorDescriptor>;

/// Constraints of one object type in the in-memory store
#[derive(Debug, Clone, Default)]
pub struct ObjectSchema {
    /// Fields that must be present and non-null
    pub required: BTreeSet<String>,
    /// Fields whose key value must be unique within the type
    pub unique: BTreeSet<String>,
}

/// Constraints enforced by [`super::MemoryStore`]
#[derive(Debug, Clone, Default)]
pub struct StoreSchema {
    types: HashMap<String, ObjectSchema>,
}

impl StoreSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required(mut self, object_type: &str, field: &str) -> Self {
        self.types
            .entry(object_type.to_string())
            .or_default()
            .required
            .insert(field.to_string());
        self
    }

    pub fn unique(mut self, object_type: &str, field: &str) -> Self {
        self.types
            .entry(object_type.to_string())
            .or_default()
            .unique
            .insert(field.to_string());
        self
    }

    pub fn object(&self, object_type: &str) -> Option<&ObjectSchema> {
        self.types.get(object_type)
    }

    pub fn is_unique(&self, object_type: &str, field: &str) -> bool {
        self.object(object_type)
            .map_or(false, |schema| schema.unique.contains(field))
    }
}
