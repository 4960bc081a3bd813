// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Batch execution: requests, per-record results and the executor

pub mod batch_stmt;
pub mod error;
pub mod executor;
pub mod request;
pub mod result;

pub use error::BatchError;
pub use executor::BatchExecutor;
pub use request::{BatchRequest, Operation};
pub use result::{ErrorDescriptor, ErrorKind, RecordResult};
