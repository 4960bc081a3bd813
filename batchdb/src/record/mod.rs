// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Record model submitted to the batch executor

pub mod types;
pub mod value;

pub use types::{Record, RecordId};
pub use value::Value;
