// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Per-operation batch statement executors

pub mod batch_statement_base;
pub mod coordinator;
pub mod merge;
pub mod upsert;
pub mod write;

pub use batch_statement_base::{
    apply_subset, atomically, BatchContext, BatchStatementExecutor, Outcomes,
};
pub use coordinator::BatchStatementCoordinator;
pub use merge::MergeExecutor;
pub use upsert::UpsertExecutor;
pub use write::WriteExecutor;
