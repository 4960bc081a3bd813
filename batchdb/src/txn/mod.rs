// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Transaction management module
//!
//! # Features
//! - Transaction lifecycle (begin, commit, full rollback)
//! - Nested savepoints with partial undo (`mark` / `rollback_to`)
//! - Undo log used by stores to implement savepoints

pub mod log;
pub mod manager;
pub mod state;

pub use self::log::{TransactionLog, UndoOperation};
pub use manager::TransactionManager;
pub use state::{Savepoint, TransactionId, TransactionState};
