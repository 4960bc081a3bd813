// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
use crate::exec::batch_stmt::{BatchStatementExecutor, MergeExecutor, UpsertExecutor, WriteExecutor};
use crate::exec::request::Operation;
use crate::store::WriteKind;

/// Picks the statement executor for an operation
pub struct BatchStatementCoordinator;

impl BatchStatementCoordinator {
    pub fn executor_for(operation: &Operation) -> Box<dyn BatchStatementExecutor> {
        match operation {
            Operation::Insert => Box::new(WriteExecutor::new(WriteKind::Insert)),
            Operation::Update => Box::new(WriteExecutor::new(WriteKind::Update)),
            Operation::Delete => Box::new(WriteExecutor::new(WriteKind::Delete)),
            Operation::Upsert { key_field } => Box::new(UpsertExecutor::new(key_field.clone())),
            Operation::Merge { master } => Box::new(MergeExecutor::new(master.clone())),
        }
    }
}
