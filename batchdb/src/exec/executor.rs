// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Batch executor
//!
//! Entry point that applies one [`BatchRequest`] to the store and returns one
//! [`RecordResult`] per submitted record, in submission order.

use std::sync::Arc;
use std::time::Instant;

use crate::config::EngineConfig;
use crate::exec::batch_stmt::{BatchContext, BatchStatementCoordinator};
use crate::exec::error::BatchError;
use crate::exec::request::{BatchRequest, Operation};
use crate::exec::result::RecordResult;
use crate::store::Store;

/// Applies batch requests against a store
///
/// Records are processed sequentially; output order always mirrors input
/// order so callers can correlate failures back to their source records.
pub struct BatchExecutor {
    store: Arc<dyn Store>,
    config: EngineConfig,
}

impl BatchExecutor {
    /// Create an executor with the default configuration
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self::with_config(store, EngineConfig::default())
    }

    pub fn with_config(store: Arc<dyn Store>, config: EngineConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Execute a batch request
    ///
    /// Without `all_or_nothing`, per-record failures are reported in the
    /// returned list and never raised. With it, the first failure reverts the
    /// whole batch and is raised as [`BatchError::BatchFailure`]. On success,
    /// identities assigned by the store are written into `request.records`.
    pub fn execute(&self, request: &mut BatchRequest) -> Result<Vec<RecordResult>, BatchError> {
        let size = request.records.len();
        if size > self.config.max_batch_size {
            return Err(BatchError::BatchTooLarge {
                size,
                limit: self.config.max_batch_size,
            });
        }
        if size == 0 {
            if matches!(request.operation, Operation::Merge { .. }) {
                return Err(BatchError::InvalidRequest(
                    "merge requires at least one duplicate".to_string(),
                ));
            }
            return Ok(Vec::new());
        }

        let start_time = Instant::now();
        let executor = BatchStatementCoordinator::executor_for(&request.operation);
        let description = executor.operation_description();
        log::debug!(
            "BatchExecutor: {} of {} record(s), all_or_nothing={}",
            description,
            size,
            request.all_or_nothing
        );

        let mut context = BatchContext::new(
            self.store.as_ref(),
            &mut request.records,
            request.all_or_nothing,
        );
        let result = executor.execute(&mut context);
        let elapsed = start_time.elapsed().as_millis();

        match &result {
            Ok(results) => {
                let failed = results.iter().filter(|r| !r.is_success()).count();
                if failed > 0 {
                    log::info!(
                        "{} completed with {} of {} record(s) failed in {}ms",
                        description,
                        failed,
                        size,
                        elapsed
                    );
                } else {
                    log::debug!("{} completed for {} record(s) in {}ms", description, size, elapsed);
                }
            }
            Err(error) => log::warn!("{} failed after {}ms: {}", description, elapsed, error),
        }
        result
    }
}
