// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! BatchDB - batched record mutation against a backing store
//!
//! BatchDB applies one operation to an ordered list of records and reports the
//! outcome of every record separately, so a single bad record never hides the
//! fate of the others.
//!
//! # Features
//!
//! - **Partial success**: one [`RecordResult`] per submitted record, index-aligned
//! - **All-or-nothing batches**: any failure reverts the whole batch
//! - **Upsert by external key**: one batched key lookup, then insert or update
//! - **Merge/dedup**: child references move to the master, duplicates are deleted
//! - **Savepoints**: nested checkpoints with partial rollback
//! - **Retry after correction**: bounded resubmission of failed records only
//!
//! # Usage
//!
//! ```ignore
//! let store = Arc::new(MemoryStore::new(StoreSchema::new().required("Contact", "LastName")));
//! let executor = BatchExecutor::new(store.clone());
//!
//! let mut request = BatchRequest::insert(vec![
//!     Record::new("Contact").field("LastName", "Doe"),
//!     Record::new("Contact"),
//! ]);
//! let results = executor.execute(&mut request)?;
//! assert!(results[0].is_success());
//! assert!(!results[1].is_success());
//! ```

pub mod config;
pub mod exec;
pub mod record;
pub mod retry;
pub mod store;
pub mod txn;

pub use config::{EngineConfig, RetryPolicy};
pub use exec::{
    BatchError, BatchExecutor, BatchRequest, ErrorDescriptor, ErrorKind, Operation, RecordResult,
};
pub use record::{Record, RecordId, Value};
pub use retry::{FailedRecord, RetryCoordinator, RetryReport, RetryState, TerminalReason};
pub use store::{MemoryStore, SavepointToken, Store, StoreError, StoreSchema, WriteKind};
pub use txn::{Savepoint, TransactionId, TransactionManager};

/// BatchDB version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// BatchDB crate name
pub const CRATE_NAME: &str = env!("CARGO_PKG_NAME");
