// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Retry-after-correction workflow for partially failed batches

pub mod coordinator;
pub mod state;

pub use coordinator::{RetryCoordinator, RetryReport};
pub use state::{FailedRecord, RetryState, TerminalReason};
