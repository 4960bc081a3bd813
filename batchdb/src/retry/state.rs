// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Per-record retry state

use crate::exec::result::{ErrorDescriptor, RecordResult};
use crate::record::Record;
use serde::{Deserialize, Serialize};

/// Why a record stopped being retried
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminalReason {
    /// Resubmission budget used up
    BudgetExhausted,
    /// The failure kind cannot be fixed by resubmitting
    NonRetryable,
}

/// Lifecycle of one record inside a retry run
///
/// `Pending -> Submitted -> Succeeded | FailedRetryable -> Pending | FailedTerminal`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RetryState {
    Pending,
    Submitted,
    Succeeded,
    FailedRetryable,
    FailedTerminal(TerminalReason),
}

impl RetryState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RetryState::Succeeded | RetryState::FailedTerminal(_))
    }

    /// Next state after a submission produced `result`
    pub fn after(result: &RecordResult, resubmissions: u32, budget: u32) -> Self {
        if result.is_success() {
            RetryState::Succeeded
        } else if !result.is_retryable() {
            RetryState::FailedTerminal(TerminalReason::NonRetryable)
        } else if resubmissions >= budget {
            RetryState::FailedTerminal(TerminalReason::BudgetExhausted)
        } else {
            RetryState::FailedRetryable
        }
    }
}

/// A failed record paired with the errors that stopped it
#[derive(Debug, Clone, PartialEq)]
pub struct FailedRecord {
    /// Position in the original batch
    pub index: usize,
    pub record: Record,
    pub errors: Vec<ErrorDescriptor>,
}
