// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Transaction state management
//!
//! This module defines the transaction state and its savepoint stack.

use crate::store::SavepointToken;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_TRANSACTION_ID: AtomicU64 = AtomicU64::new(1);
static NEXT_SAVEPOINT_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionId(u64);

impl TransactionId {
    /// Generate a new process-unique transaction ID
    pub fn new() -> Self {
        TransactionId(NEXT_TRANSACTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the underlying ID value
    pub fn id(&self) -> u64 {
        self.0
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "txn_{}", self.0)
    }
}

/// Checkpoint inside a transaction
///
/// Opaque to callers; only the [`super::TransactionManager`] that issued it can
/// roll back to it, and only while it is still on the stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Savepoint {
    id: u64,
    transaction: TransactionId,
    depth: usize,
    token: SavepointToken,
}

impl Savepoint {
    pub(crate) fn new(transaction: TransactionId, depth: usize, token: SavepointToken) -> Self {
        Self {
            id: NEXT_SAVEPOINT_ID.fetch_add(1, Ordering::Relaxed),
            transaction,
            depth,
            token,
        }
    }

    /// Transaction that owns this savepoint
    pub fn transaction(&self) -> TransactionId {
        self.transaction
    }

    /// Stack depth right after this savepoint was pushed (1 = first mark)
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub(crate) fn token(&self) -> SavepointToken {
        self.token
    }
}

impl std::fmt::Display for Savepoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:savepoint_{}@{}", self.transaction, self.id, self.depth)
    }
}

/// Complete state of the active transaction
#[derive(Debug, Clone)]
pub struct TransactionState {
    /// Unique transaction identifier
    pub id: TransactionId,
    /// Timestamp when the transaction started
    pub start_time: DateTime<Utc>,
    /// Store savepoint taken at begin, used to unwind the whole transaction
    pub(crate) base: SavepointToken,
    /// Savepoints in creation order (last = most recent)
    pub(crate) savepoints: Vec<Savepoint>,
}

impl TransactionState {
    pub(crate) fn new(base: SavepointToken) -> Self {
        Self {
            id: TransactionId::new(),
            start_time: Utc::now(),
            base,
            savepoints: Vec::new(),
        }
    }

    pub fn depth(&self) -> usize {
        self.savepoints.len()
    }

    /// Push a savepoint backed by `token`
    pub(crate) fn push(&mut self, token: SavepointToken) -> Savepoint {
        let savepoint = Savepoint::new(self.id, self.savepoints.len() + 1, token);
        self.savepoints.push(savepoint.clone());
        savepoint
    }

    /// Stack position of `savepoint`, if it is still live
    pub(crate) fn position(&self, savepoint: &Savepoint) -> Option<usize> {
        if savepoint.transaction != self.id {
            return None;
        }
        self.savepoints.iter().position(|open| open.id == savepoint.id)
    }

    /// Pop every savepoint created after the one at `position`
    pub(crate) fn truncate_after(&mut self, position: usize) -> usize {
        let popped = self.savepoints.len().saturating_sub(position + 1);
        self.savepoints.truncate(position + 1);
        popped
    }

    /// Get transaction duration
    pub fn duration(&self) -> chrono::Duration {
        Utc::now() - self.start_time
    }
}
