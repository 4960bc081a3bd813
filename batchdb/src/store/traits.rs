// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Store collaborator trait
//!
//! The backing store is owned by the embedding application. The engine only
//! drives it through this trait; [`super::MemoryStore`] is the reference
//! implementation.

use super::types::{MergeOutcome, SavepointToken, StoreResult, WriteKind};
use crate::exec::result::RecordResult;
use crate::record::{Record, RecordId};
use std::collections::{BTreeSet, HashMap};

/// Backing store driven by the batch executor and transaction manager
///
/// Implementations must return results in input order, one per record, even
/// if they parallelize internally.
pub trait Store: Send + Sync {
    /// Apply one primitive write to every record.
    ///
    /// Result indices are positions in `records`. With `all_or_nothing` the
    /// first failure reverts every write of the call and is returned as
    /// `StoreError::BatchFailure`.
    fn apply(
        &self,
        kind: WriteKind,
        records: &[Record],
        all_or_nothing: bool,
    ) -> StoreResult<Vec<RecordResult>>;

    /// Look up identities of `object_type` records whose `key_field` holds one
    /// of `key_values`, in a single call
    fn find_by_key(
        &self,
        object_type: &str,
        key_field: &str,
        key_values: &BTreeSet<String>,
    ) -> StoreResult<HashMap<String, RecordId>>;

    /// Push a savepoint capturing the current state
    fn begin_savepoint(&self) -> StoreResult<SavepointToken>;

    /// Revert every mutation since `token` was taken; later savepoints are
    /// discarded, `token` itself stays valid
    fn rollback(&self, token: SavepointToken) -> StoreResult<()>;

    /// Drop `token` and later savepoints without reverting anything
    fn release_savepoint(&self, token: SavepointToken) -> StoreResult<()>;

    /// Finalize all pending mutations and clear every savepoint
    fn commit(&self) -> StoreResult<()>;

    /// Repoint every child reference from each duplicate to `master`, then
    /// delete the duplicate. One outcome per duplicate, in order.
    fn reassign_and_delete(
        &self,
        master: &RecordId,
        duplicates: &[RecordId],
    ) -> StoreResult<Vec<MergeOutcome>>;
}
