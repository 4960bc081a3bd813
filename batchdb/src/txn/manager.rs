// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Transaction manager implementation
//!
//! Owns the savepoint stack of one transaction context and keeps it in step
//! with the store's own savepoints.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::exec::error::BatchError;
use crate::store::Store;

use super::state::{Savepoint, TransactionId, TransactionState};

/// Transaction manager handles begin/mark/rollback/commit against one store
///
/// The stack is guarded by a mutex, but interleaving calls from several
/// callers on one transaction still gives undefined savepoint semantics;
/// callers must serialize their own sequences.
pub struct TransactionManager {
    store: Arc<dyn Store>,
    /// The active transaction, if any
    active: Mutex<Option<TransactionState>>,
}

impl TransactionManager {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            active: Mutex::new(None),
        }
    }

    /// Start a new transaction at depth 0
    pub fn begin(&self) -> Result<TransactionId, BatchError> {
        let mut active = self.active.lock();
        if let Some(txn) = active.as_ref() {
            return Err(BatchError::TransactionAlreadyActive(txn.id.to_string()));
        }

        let base = self.store.begin_savepoint()?;
        let txn = TransactionState::new(base);
        let id = txn.id;
        *active = Some(txn);

        log::info!("BEGIN TRANSACTION {}", id);
        Ok(id)
    }

    /// Push a savepoint capturing the current store state
    pub fn mark(&self) -> Result<Savepoint, BatchError> {
        let mut active = self.active.lock();
        let txn = active.as_mut().ok_or(BatchError::NoActiveTransaction)?;

        let token = self.store.begin_savepoint()?;
        let savepoint = txn.push(token);

        log::debug!("SAVEPOINT {} (depth {})", savepoint, txn.depth());
        Ok(savepoint)
    }

    /// Revert every mutation made since `savepoint` was taken
    ///
    /// Savepoints created after it are discarded; `savepoint` itself remains
    /// valid and may be rolled back to again.
    pub fn rollback_to(&self, savepoint: &Savepoint) -> Result<(), BatchError> {
        let mut active = self.active.lock();
        let txn = active.as_mut().ok_or(BatchError::NoActiveTransaction)?;

        let position = txn.position(savepoint).ok_or_else(|| {
            BatchError::InvalidSavepoint(format!(
                "{} is not on the savepoint stack of {}",
                savepoint, txn.id
            ))
        })?;

        self.store.rollback(savepoint.token())?;
        let popped = txn.truncate_after(position);

        log::info!(
            "ROLLBACK TO SAVEPOINT {} - discarded {} later savepoint(s)",
            savepoint,
            popped
        );
        Ok(())
    }

    /// Finalize all pending mutations and end the transaction
    pub fn commit(&self) -> Result<(), BatchError> {
        let mut active = self.active.lock();
        let txn = active.as_ref().ok_or(BatchError::NoActiveTransaction)?;

        self.store.commit()?;

        log::info!(
            "COMMIT TRANSACTION {} - {} savepoint(s) cleared after {}ms",
            txn.id,
            txn.depth(),
            txn.duration().num_milliseconds()
        );
        *active = None;
        Ok(())
    }

    /// Revert everything done in the transaction and end it
    pub fn rollback(&self) -> Result<(), BatchError> {
        let mut active = self.active.lock();
        let txn = active.as_ref().ok_or(BatchError::NoActiveTransaction)?;

        self.store.rollback(txn.base)?;
        self.store.release_savepoint(txn.base)?;

        log::info!("ROLLBACK TRANSACTION {}", txn.id);
        *active = None;
        Ok(())
    }

    /// Run `work` under a fresh savepoint, rolling back to it if `work` fails
    pub fn with_savepoint<T, F>(&self, work: F) -> Result<T, BatchError>
    where
        F: FnOnce() -> Result<T, BatchError>,
    {
        let savepoint = self.mark()?;
        match work() {
            Ok(value) => Ok(value),
            Err(error) => {
                log::warn!("Rolling back to {} after error: {}", savepoint, error);
                self.rollback_to(&savepoint)?;
                Err(error)
            }
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.lock().is_some()
    }

    pub fn current_transaction(&self) -> Option<TransactionId> {
        self.active.lock().as_ref().map(|txn| txn.id)
    }

    /// Number of live savepoints (0 right after begin or with no transaction)
    pub fn depth(&self) -> usize {
        self.active.lock().as_ref().map_or(0, TransactionState::depth)
    }

    /// Live savepoints, oldest first
    pub fn savepoints(&self) -> Vec<Savepoint> {
        self.active
            .lock()
            .as_ref()
            .map(|txn| txn.savepoints.clone())
            .unwrap_or_default()
    }
}
