// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Operation logging for savepoint rollback
//!
//! Rather than snapshotting the whole store at every savepoint, each mutation
//! records how to undo itself. A savepoint is then just a position in the log.

use crate::record::{Record, RecordId};

/// Represents a mutation that can be undone
#[derive(Debug, Clone)]
pub enum UndoOperation {
    /// A record was inserted - to undo, remove it
    Insert { id: RecordId },
    /// A record was updated - to undo, restore its previous state
    Update { id: RecordId, previous: Record },
    /// A record was deleted - to undo, restore it
    Delete { id: RecordId, deleted: Record },
    /// Operations that must be undone together (one merged duplicate)
    Batch { operations: Vec<UndoOperation> },
}

/// Undo log shared by every open savepoint of a store
#[derive(Debug, Clone, Default)]
pub struct TransactionLog {
    /// Operations in application order
    undo_operations: Vec<UndoOperation>,
    /// Total number of operations logged since the last clear
    pub operation_count: usize,
}

impl TransactionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an undo operation to the log
    pub fn log_operation(&mut self, operation: UndoOperation) {
        self.operation_count += match &operation {
            UndoOperation::Batch { operations } => operations.len(),
            _ => 1,
        };
        self.undo_operations.push(operation);
    }

    /// Current position, used as a savepoint marker
    pub fn position(&self) -> usize {
        self.undo_operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.undo_operations.is_empty()
    }

    /// Remove and return every operation logged after `position`, most
    /// recent first, ready to be undone
    pub fn unwind_to(&mut self, position: usize) -> Vec<UndoOperation> {
        if position >= self.undo_operations.len() {
            return Vec::new();
        }
        let mut unwound = self.undo_operations.split_off(position);
        unwound.reverse();
        unwound
    }

    /// Forget everything; called once mutations are final
    pub fn clear(&mut self) {
        self.undo_operations.clear();
        self.operation_count = 0;
    }
}
