// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Retry coordinator
//!
//! Isolates the failed records of a non-atomic batch, lets the caller correct
//! them and resubmits only that subset, round after round, until every record
//! has either succeeded or become terminal.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::config::RetryPolicy;
use crate::exec::error::BatchError;
use crate::exec::executor::BatchExecutor;
use crate::exec::request::{BatchRequest, Operation};
use crate::exec::result::{ErrorDescriptor, ErrorKind, RecordResult};
use crate::record::Record;

use super::state::{FailedRecord, RetryState, TerminalReason};

/// Final outcome of a retry run, index-aligned with the original batch
#[derive(Debug, Clone)]
pub struct RetryReport {
    records: Vec<Record>,
    results: Vec<RecordResult>,
    states: Vec<RetryState>,
    resubmissions: Vec<u32>,
    rounds: u32,
}

impl RetryReport {
    /// Records as last submitted (after corrections, with identities)
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Last result of every record
    pub fn results(&self) -> &[RecordResult] {
        &self.results
    }

    pub fn state(&self, index: usize) -> Option<RetryState> {
        self.states.get(index).copied()
    }

    /// How many times the record at `index` was resubmitted
    pub fn resubmissions(&self, index: usize) -> u32 {
        self.resubmissions.get(index).copied().unwrap_or(0)
    }

    /// Number of resubmission rounds issued
    pub fn rounds(&self) -> u32 {
        self.rounds
    }

    pub fn all_succeeded(&self) -> bool {
        self.states.iter().all(|s| *s == RetryState::Succeeded)
    }

    /// Indices of records that ended terminal, with the reason
    pub fn terminal_failures(&self) -> Vec<(usize, TerminalReason)> {
        self.states
            .iter()
            .enumerate()
            .filter_map(|(index, state)| match state {
                RetryState::FailedTerminal(reason) => Some((index, *reason)),
                _ => None,
            })
            .collect()
    }

    /// Final results, or `TerminalFailure` for the first terminal record
    pub fn into_results(self) -> Result<Vec<RecordResult>, BatchError> {
        if let Some((index, _)) = self.terminal_failures().first().copied() {
            return Err(BatchError::TerminalFailure {
                index,
                attempts: self.resubmissions[index],
                last: Box::new(self.results[index].clone()),
                results: self.results,
            });
        }
        Ok(self.results)
    }
}

/// Drives bounded resubmission of failed records
pub struct RetryCoordinator<'a> {
    executor: &'a BatchExecutor,
    policy: RetryPolicy,
}

impl<'a> RetryCoordinator<'a> {
    /// Coordinator using the executor's configured retry policy
    pub fn new(executor: &'a BatchExecutor) -> Self {
        let policy = executor.config().retry.clone();
        Self::with_policy(executor, policy)
    }

    pub fn with_policy(executor: &'a BatchExecutor, policy: RetryPolicy) -> Self {
        Self { executor, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Pair every failed result with the record it describes
    pub fn failures(records: &[Record], results: &[RecordResult]) -> Vec<FailedRecord> {
        results
            .iter()
            .filter(|result| !result.is_success())
            .filter_map(|result| {
                records.get(result.index()).map(|record| FailedRecord {
                    index: result.index(),
                    record: record.clone(),
                    errors: result.errors().to_vec(),
                })
            })
            .collect()
    }

    /// Execute `request`, then keep correcting and resubmitting its failed
    /// records until each one succeeds or turns terminal
    ///
    /// `correct` receives a failed record with its errors and returns the
    /// record to resubmit. Batch-level errors other than store unavailability
    /// abort the run with `RetryAborted`, which still carries every record's
    /// latest result.
    pub fn run<F>(&self, request: BatchRequest, mut correct: F) -> Result<RetryReport, BatchError>
    where
        F: FnMut(&Record, &[ErrorDescriptor]) -> Record,
    {
        if request.all_or_nothing {
            return Err(BatchError::InvalidRequest(
                "retry requires a non-atomic batch".to_string(),
            ));
        }

        let operation = request.operation.clone();
        let mut initial = request;
        let results = self.executor.execute(&mut initial)?;
        let size = initial.records.len();

        let mut run = RetryReport {
            records: initial.records,
            results,
            states: vec![RetryState::Submitted; size],
            resubmissions: vec![0; size],
            rounds: 0,
        };
        for index in 0..size {
            self.settle(&mut run, index);
        }

        loop {
            let mut retryable: Vec<usize> = (0..size)
                .filter(|&index| run.states[index] == RetryState::FailedRetryable)
                .collect();
            if retryable.is_empty() {
                break;
            }

            let pause = self.policy.backoff();
            if !pause.is_zero() {
                std::thread::sleep(pause);
            }

            if let (Operation::Insert, Some(key_field)) = (&operation, &self.policy.idempotency_key)
            {
                retryable = self.reconcile_applied_inserts(&mut run, retryable, key_field);
                if retryable.is_empty() {
                    continue;
                }
            }

            run.rounds += 1;
            let mut corrected = Vec::with_capacity(retryable.len());
            for &index in &retryable {
                run.states[index] = RetryState::Pending;
                corrected.push(correct(&run.records[index], run.results[index].errors()));
                run.states[index] = RetryState::Submitted;
                run.resubmissions[index] += 1;
            }
            log::info!(
                "Retry round {}: resubmitting {} record(s) for {}",
                run.rounds,
                retryable.len(),
                operation
            );

            let mut resubmission = BatchRequest::new(operation.clone(), corrected);
            let round_results = match self.executor.execute(&mut resubmission) {
                Ok(results) => results,
                Err(BatchError::StoreUnavailable(message)) => {
                    log::warn!("Retry round {} hit an unavailable store: {}", run.rounds, message);
                    (0..retryable.len())
                        .map(|position| {
                            RecordResult::failure(
                                position,
                                ErrorDescriptor::new(ErrorKind::StoreUnavailable, message.clone()),
                            )
                        })
                        .collect()
                }
                Err(error) => {
                    log::warn!("Retry round {} aborted: {}", run.rounds, error);
                    return Err(BatchError::RetryAborted {
                        round: run.rounds,
                        cause: Box::new(error),
                        results: run.results,
                    });
                }
            };

            for ((position, result), record) in round_results
                .into_iter()
                .enumerate()
                .zip(resubmission.records)
            {
                let index = retryable[position];
                run.records[index] = record;
                run.results[index] = result.reindex(index);
                self.settle(&mut run, index);
            }
        }

        let terminal = run.terminal_failures();
        if !terminal.is_empty() {
            log::warn!(
                "Retry finished after {} round(s) with {} terminal record(s)",
                run.rounds,
                terminal.len()
            );
        }
        Ok(run)
    }

    fn settle(&self, run: &mut RetryReport, index: usize) {
        run.states[index] = RetryState::after(
            &run.results[index],
            run.resubmissions[index],
            self.policy.budget,
        );
    }

    /// Before resubmitting inserts that failed as unavailable, look their
    /// idempotency keys up (one call per object type) so that inserts which
    /// did land are not applied twice. Returns the indices that still need
    /// resubmission.
    fn reconcile_applied_inserts(
        &self,
        run: &mut RetryReport,
        retryable: Vec<usize>,
        key_field: &str,
    ) -> Vec<usize> {
        let mut candidates: BTreeMap<usize, (String, String)> = BTreeMap::new();
        let mut by_type: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for &index in &retryable {
            let unavailable = run.results[index]
                .errors()
                .iter()
                .any(|error| error.kind == ErrorKind::StoreUnavailable);
            let record = &run.records[index];
            if let (true, Some(key)) = (unavailable, record.external_key(key_field)) {
                by_type
                    .entry(record.object_type.clone())
                    .or_default()
                    .insert(key.clone());
                candidates.insert(index, (record.object_type.clone(), key));
            }
        }
        if candidates.is_empty() {
            return retryable;
        }

        let mut applied = HashMap::new();
        for (object_type, keys) in &by_type {
            match self.executor.store().find_by_key(object_type, key_field, keys) {
                Ok(matches) => {
                    for (key, id) in matches {
                        applied.insert((object_type.clone(), key), id);
                    }
                }
                Err(error) => {
                    log::warn!("Idempotency check for {} failed: {}", object_type, error);
                }
            }
        }

        let mut remaining = Vec::with_capacity(retryable.len());
        for index in retryable {
            let found = candidates
                .get(&index)
                .and_then(|candidate| applied.get(candidate))
                .cloned();
            match found {
                Some(id) => {
                    log::info!(
                        "Record {} was already applied as {}; not resubmitting",
                        index,
                        id
                    );
                    run.records[index].assign_identity(id.clone());
                    run.results[index] = RecordResult::success(index, id);
                    run.states[index] = RetryState::Succeeded;
                }
                None => remaining.push(index),
            }
        }
        remaining
    }
}
