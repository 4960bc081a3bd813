// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Record and identity types

use super::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Store-assigned unique identity of a record
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordId(String);

impl RecordId {
    /// Generate a fresh identity. Only stores should call this.
    pub fn generate() -> Self {
        RecordId(uuid::Uuid::new_v4().simple().to_string())
    }

    /// Wrap an identity issued by an external store
    pub fn new(id: impl Into<String>) -> Self {
        RecordId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One data entity submitted for mutation
///
/// A record is built by the caller without an identity; the identity is filled
/// in by the executor once the store has created it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Object type (table) the record belongs to
    pub object_type: String,
    /// Identity assigned by the store on create
    identity: Option<RecordId>,
    /// Field values by name
    pub fields: BTreeMap<String, Value>,
}

impl Record {
    /// Create a new record without identity
    pub fn new(object_type: impl Into<String>) -> Self {
        Self {
            object_type: object_type.into(),
            identity: None,
            fields: BTreeMap::new(),
        }
    }

    /// Create a record that refers to an existing stored entity
    pub fn with_identity(object_type: impl Into<String>, identity: RecordId) -> Self {
        Self {
            object_type: object_type.into(),
            identity: Some(identity),
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style field setter
    pub fn field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn identity(&self) -> Option<&RecordId> {
        self.identity.as_ref()
    }

    pub fn has_identity(&self) -> bool {
        self.identity.is_some()
    }

    /// Normalized external key value held in `key_field`, if any
    pub fn external_key(&self, key_field: &str) -> Option<String> {
        self.fields.get(key_field).and_then(Value::as_key)
    }

    pub(crate) fn assign_identity(&mut self, identity: RecordId) {
        self.identity = Some(identity);
    }

    pub(crate) fn clear_identity(&mut self) {
        self.identity = None;
    }

    /// Identities of every parent this record references
    pub fn references(&self) -> impl Iterator<Item = (&String, &RecordId)> {
        self.fields
            .iter()
            .filter_map(|(name, value)| value.as_reference().map(|id| (name, id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_external_key_lookup() {
        let record = Record::new("Account")
            .field("AccountNumber", "ACME-1")
            .field("Name", "Acme");
        assert_eq!(
            record.external_key("AccountNumber"),
            Some("ACME-1".to_string())
        );
        assert_eq!(record.external_key("Missing"), None);
        assert!(!record.has_identity());
    }

    #[test]
    fn test_references() {
        let parent = RecordId::generate();
        let record = Record::new("Contact")
            .field("AccountId", parent.clone())
            .field("LastName", "Doe");
        let refs: Vec<_> = record.references().collect();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].0, "AccountId");
        assert_eq!(refs[0].1, &parent);
    }
}
