// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Backing store abstraction
//!
//! # Components
//! - [`Store`]: trait every backing store implements
//! - [`MemoryStore`]: in-memory store with schema constraints and savepoints
//! - Types: tokens, write kinds, errors

pub mod memory;
pub mod traits;
pub mod types;

pub use memory::MemoryStore;
pub use traits::Store;
pub use types::{
    MergeOutcome, ObjectSchema, SavepointToken, StoreError, StoreResult, StoreSchema, WriteKind,
};
