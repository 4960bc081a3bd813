// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Engine configuration and retry policy

use crate::exec::error::BatchError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Environment variable overriding [`EngineConfig::max_batch_size`]
pub const ENV_MAX_BATCH_SIZE: &str = "BATCHDB_MAX_BATCH_SIZE";
/// Environment variable overriding [`RetryPolicy::budget`]
pub const ENV_RETRY_BUDGET: &str = "BATCHDB_RETRY_BUDGET";
/// Environment variable overriding [`RetryPolicy::backoff_ms`]
pub const ENV_RETRY_BACKOFF_MS: &str = "BATCHDB_RETRY_BACKOFF_MS";

/// Global engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Largest accepted batch; bigger requests are rejected before any store call
    pub max_batch_size: usize,

    /// Resubmission policy for the retry coordinator
    pub retry: RetryPolicy,
}

/// Bounded resubmission policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Maximum resubmissions per failing record
    pub budget: u32,

    /// Pause between resubmission rounds (milliseconds)
    pub backoff_ms: u64,

    /// Add up to `backoff_ms` of random jitter to each pause
    pub jitter: bool,

    /// Field checked with `find_by_key` before resubmitting inserts that
    /// failed as unavailable, so an already-applied insert is not doubled
    pub idempotency_key: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_batch_size: 200,
            retry: RetryPolicy::default(),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            budget: 3,
            backoff_ms: 0,
            jitter: false,
            idempotency_key: None,
        }
    }
}

impl RetryPolicy {
    pub fn with_budget(budget: u32) -> Self {
        Self {
            budget,
            ..Self::default()
        }
    }

    /// Pause before the next resubmission round
    pub fn backoff(&self) -> Duration {
        if self.backoff_ms == 0 {
            return Duration::ZERO;
        }
        let jitter = if self.jitter {
            fastrand::u64(0..=self.backoff_ms)
        } else {
            0
        };
        Duration::from_millis(self.backoff_ms + jitter)
    }
}

impl EngineConfig {
    /// Load configuration from a JSON file; missing keys take defaults
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, BatchError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            BatchError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&content).map_err(|e| {
            BatchError::Config(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Default configuration with environment overrides applied
    pub fn from_env() -> Result<Self, BatchError> {
        Self::default().with_env_overrides()
    }

    /// Apply `BATCHDB_*` environment overrides on top of this configuration
    pub fn with_env_overrides(mut self) -> Result<Self, BatchError> {
        if let Some(size) = read_env(ENV_MAX_BATCH_SIZE)? {
            self.max_batch_size = size;
        }
        if let Some(budget) = read_env(ENV_RETRY_BUDGET)? {
            self.retry.budget = budget;
        }
        if let Some(backoff) = read_env(ENV_RETRY_BACKOFF_MS)? {
            self.retry.backoff_ms = backoff;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), BatchError> {
        if self.max_batch_size == 0 {
            return Err(BatchError::Config(
                "max_batch_size must be at least 1".to_string(),
            ));
        }
        if let Some(field) = &self.retry.idempotency_key {
            if field.is_empty() {
                return Err(BatchError::Config(
                    "retry.idempotency_key must not be empty".to_string(),
                ));
            }
        }
        Ok(())
    }
}

fn read_env<T: std::str::FromStr>(name: &str) -> Result<Option<T>, BatchError>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| BatchError::Config(format!("Invalid {}='{}': {}", name, raw, e))),
        Err(_) => Ok(None),
    }
}
