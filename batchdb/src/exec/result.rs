// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Per-record outcome model
//!
//! A batch never throws for an individual record. Each submitted record gets a
//! [`RecordResult`] at the same index describing either its new identity or the
//! errors that stopped it.

use crate::record::RecordId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Classification of a per-record failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Field-level validation failed (required field missing, bad value)
    ValidationError,
    /// Update/delete/merge target has no identity
    MissingIdentity,
    /// Upsert record has no value for the key field
    MissingExternalKey,
    /// Savepoint is unknown or already superseded
    InvalidSavepoint,
    /// Referential integrity violation on merge or delete
    ConstraintViolation,
    /// Retry budget exhausted
    TerminalFailure,
    /// Store could not be reached (transient)
    StoreUnavailable,
    /// Identity does not exist in the store
    NotFound,
    /// Unique field collision or repeated external key in one batch
    DuplicateValue,
}

impl ErrorKind {
    /// Stable status code exposed to callers
    pub fn status_code(&self) -> &'static str {
        match self {
            ErrorKind::ValidationError => "VALIDATION_ERROR",
            ErrorKind::MissingIdentity => "MISSING_IDENTITY",
            ErrorKind::MissingExternalKey => "MISSING_EXTERNAL_KEY",
            ErrorKind::InvalidSavepoint => "INVALID_SAVEPOINT",
            ErrorKind::ConstraintViolation => "CONSTRAINT_VIOLATION",
            ErrorKind::TerminalFailure => "TERMINAL_FAILURE",
            ErrorKind::StoreUnavailable => "STORE_UNAVAILABLE",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::DuplicateValue => "DUPLICATE_VALUE",
        }
    }

    /// Whether a record failing with this kind may be resubmitted.
    ///
    /// Validation and missing-key kinds are only worth retrying after the
    /// caller has corrected the record.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorKind::StoreUnavailable
                | ErrorKind::ValidationError
                | ErrorKind::MissingExternalKey
                | ErrorKind::MissingIdentity
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.status_code())
    }
}

/// Structured description of one failure on one record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDescriptor {
    pub kind: ErrorKind,
    pub message: String,
    pub affected_fields: BTreeSet<String>,
}

impl ErrorDescriptor {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            affected_fields: BTreeSet::new(),
        }
    }

    /// Validation failure on the given fields
    pub fn validation<I, S>(message: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(ErrorKind::ValidationError, message).with_fields(fields)
    }

    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.affected_fields
            .extend(fields.into_iter().map(Into::into));
        self
    }

    pub fn status_code(&self) -> &'static str {
        self.kind.status_code()
    }

    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

impl fmt::Display for ErrorDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)?;
        if !self.affected_fields.is_empty() {
            let fields: Vec<&str> = self.affected_fields.iter().map(String::as_str).collect();
            write!(f, " [{}]", fields.join(", "))?;
        }
        Ok(())
    }
}

/// Outcome for the record at `index` of a submitted batch
///
/// Either succeeded with an identity, or failed with at least one error.
/// The fields are private so that no other combination can be built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordResult {
    index: usize,
    identity: Option<RecordId>,
    created: bool,
    errors: Vec<ErrorDescriptor>,
}

impl RecordResult {
    pub fn success(index: usize, identity: RecordId) -> Self {
        Self {
            index,
            identity: Some(identity),
            created: false,
            errors: Vec::new(),
        }
    }

    pub fn failure(index: usize, error: ErrorDescriptor) -> Self {
        Self {
            index,
            identity: None,
            created: false,
            errors: vec![error],
        }
    }

    /// Append another error to a failed result; ignored on success
    pub fn with_error(mut self, error: ErrorDescriptor) -> Self {
        if !self.is_success() {
            self.errors.push(error);
        }
        self
    }

    /// Mark a successful upsert result as an insert
    pub fn created(mut self, created: bool) -> Self {
        self.created = created && self.is_success();
        self
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub(crate) fn reindex(mut self, index: usize) -> Self {
        self.index = index;
        self
    }

    pub fn is_success(&self) -> bool {
        self.identity.is_some()
    }

    pub fn identity(&self) -> Option<&RecordId> {
        self.identity.as_ref()
    }

    /// True only for upsert results that inserted a new record
    pub fn was_created(&self) -> bool {
        self.created
    }

    pub fn errors(&self) -> &[ErrorDescriptor] {
        &self.errors
    }

    pub fn first_error(&self) -> Option<&ErrorDescriptor> {
        self.errors.first()
    }

    /// A failed record may be resubmitted only if all of its errors allow it
    pub fn is_retryable(&self) -> bool {
        !self.is_success() && self.errors.iter().all(ErrorDescriptor::is_retryable)
    }
}
