//! Test fixture for BatchDB integration tests
//!
//! Wires an in-memory store, an executor and a transaction manager together
//! using only the public API.

use batchdb::{
    BatchExecutor, BatchRequest, EngineConfig, MemoryStore, Record, RecordId, StoreSchema,
    TransactionManager,
};
use std::sync::Arc;

/// Schema used by every fixture:
/// - Account: `Name` required, `AccountNumber` unique
/// - Contact: `LastName` required
/// - Profile: `AccountId` unique (at most one profile per account)
pub fn default_schema() -> StoreSchema {
    StoreSchema::new()
        .required("Account", "Name")
        .unique("Account", "AccountNumber")
        .required("Contact", "LastName")
        .unique("Profile", "AccountId")
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Isolated store + executor + transaction manager
pub struct TestFixture {
    pub store: Arc<MemoryStore>,
    pub executor: BatchExecutor,
    pub transactions: TransactionManager,
}

impl TestFixture {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        init_logging();
        let store = Arc::new(MemoryStore::new(default_schema()));
        let executor = BatchExecutor::with_config(store.clone(), config);
        let transactions = TransactionManager::new(store.clone());
        Self {
            store,
            executor,
            transactions,
        }
    }

    /// Insert records that are expected to succeed, returning their identities
    pub fn insert(&self, records: Vec<Record>) -> Vec<RecordId> {
        let mut request = BatchRequest::insert(records);
        let results = self
            .executor
            .execute(&mut request)
            .expect("Insert batch should not fail");
        results
            .iter()
            .map(|result| {
                result
                    .identity()
                    .cloned()
                    .unwrap_or_else(|| panic!("Insert failed: {:?}", result.errors()))
            })
            .collect()
    }

    pub fn account(&self, name: &str, number: &str) -> RecordId {
        self.insert(vec![account(name, number)]).remove(0)
    }

    pub fn contact(&self, last_name: &str, account: &RecordId) -> RecordId {
        self.insert(vec![Record::new("Contact")
            .field("LastName", last_name)
            .field("AccountId", account.clone())])
        .remove(0)
    }

    pub fn profile(&self, account: &RecordId) -> RecordId {
        self.insert(vec![Record::new("Profile").field("AccountId", account.clone())])
            .remove(0)
    }
}

pub fn account(name: &str, number: &str) -> Record {
    Record::new("Account")
        .field("Name", name)
        .field("AccountNumber", number)
}
