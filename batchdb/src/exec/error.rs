// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Execution error types

use super::result::{ErrorDescriptor, RecordResult};
use crate::store::StoreError;
use thiserror::Error;

/// Errors raised by the executor, transaction manager and retry coordinator.
///
/// Per-record failures of a non-atomic batch are never raised; they live in
/// the returned [`RecordResult`] list.
#[derive(Error, Debug)]
pub enum BatchError {
    #[error("Batch failed at record {index}: {error}")]
    BatchFailure { index: usize, error: ErrorDescriptor },

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Invalid savepoint: {0}")]
    InvalidSavepoint(String),

    #[error("No active transaction")]
    NoActiveTransaction,

    #[error("Transaction {0} already in progress")]
    TransactionAlreadyActive(String),

    #[error("Batch of {size} records exceeds the limit of {limit}")]
    BatchTooLarge { size: usize, limit: usize },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// `results` holds the final outcome of every record in the batch
    #[error("Record {index} failed terminally after {attempts} resubmissions")]
    TerminalFailure {
        index: usize,
        attempts: u32,
        last: Box<RecordResult>,
        results: Vec<RecordResult>,
    },

    /// A resubmission round failed as a whole; `results` holds each record's
    /// latest outcome, including records that already persisted
    #[error("Retry aborted in round {round}: {cause}")]
    RetryAborted {
        round: u32,
        cause: Box<BatchError>,
        results: Vec<RecordResult>,
    },

    /// An atomic batch failed and the store could not revert it, so some of
    /// its writes may have persisted
    #[error("Batch not reverted after '{cause}': {rollback}")]
    RollbackFailed {
        cause: Box<BatchError>,
        rollback: String,
    },

    #[error("Store error: {0}")]
    Store(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<StoreError> for BatchError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Unavailable(msg) => BatchError::StoreUnavailable(msg),
            StoreError::BatchFailure { index, error } => BatchError::BatchFailure { index, error },
            StoreError::InvalidSavepoint(token) => {
                BatchError::InvalidSavepoint(format!("store token {}", token))
            }
            other => BatchError::Store(other.to_string()),
        }
    }
}
