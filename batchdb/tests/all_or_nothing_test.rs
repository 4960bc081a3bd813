//! Atomic batches: either every record persists or none does

#[path = "testutils/mod.rs"]
mod testutils;

use batchdb::store::{MergeOutcome, StoreResult};
use batchdb::{
    BatchError, BatchExecutor, BatchRequest, ErrorKind, MemoryStore, Record, RecordId,
    RecordResult, SavepointToken, Store, StoreError, Value, WriteKind,
};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use testutils::test_fixture::{account, default_schema, init_logging, TestFixture};

#[test]
fn test_atomic_insert_persists_nothing_on_failure() {
    let fixture = TestFixture::new();
    let before = fixture.store.snapshot();

    let mut request = BatchRequest::insert(vec![
        Record::new("Contact").field("LastName", "Alpha"),
        Record::new("Contact").field("FirstName", "Bravo"),
        Record::new("Contact").field("LastName", "Charlie"),
    ])
    .all_or_nothing(true);

    let err = fixture.executor.execute(&mut request).unwrap_err();
    match err {
        BatchError::BatchFailure { index, error } => {
            assert_eq!(index, 1);
            assert_eq!(error.kind, ErrorKind::ValidationError);
            assert!(error.affected_fields.contains("LastName"));
        }
        other => panic!("Expected BatchFailure, got {:?}", other),
    }

    assert_eq!(fixture.store.snapshot(), before);
    assert!(request.records.iter().all(|record| !record.has_identity()));
}

#[test]
fn test_atomic_insert_succeeds_as_a_whole() {
    let fixture = TestFixture::new();

    let mut request = BatchRequest::insert(vec![
        account("Acme", "A-1"),
        account("Globex", "A-2"),
        account("Initech", "A-3"),
    ])
    .all_or_nothing(true);

    let results = fixture.executor.execute(&mut request).unwrap();
    assert_eq!(results.len(), 3);
    assert!(results.iter().all(|result| result.is_success()));
    assert_eq!(fixture.store.count("Account"), 3);
    assert_eq!(fixture.store.savepoint_depth(), 0);
}

#[test]
fn test_atomic_precheck_failure_touches_nothing() {
    let fixture = TestFixture::new();
    let keep = fixture.account("Acme", "A-1");
    let before = fixture.store.snapshot();

    // Second record lacks an identity, so the delete of the first must not happen
    let mut request = BatchRequest::delete(vec![
        Record::with_identity("Account", keep.clone()),
        Record::new("Account"),
    ])
    .all_or_nothing(true);

    let err = fixture.executor.execute(&mut request).unwrap_err();
    assert!(matches!(
        err,
        BatchError::BatchFailure { index: 1, ref error } if error.kind == ErrorKind::MissingIdentity
    ));
    assert_eq!(fixture.store.snapshot(), before);
}

#[test]
fn test_atomic_upsert_reverts_updates_when_an_insert_fails() {
    let fixture = TestFixture::new();
    let existing = fixture.account("Acme", "A-1");

    let mut request = BatchRequest::upsert(
        "AccountNumber",
        vec![
            account("Acme Renamed", "A-1"),
            // Name is required, so this insert fails
            Record::new("Account").field("AccountNumber", "A-2"),
        ],
    )
    .all_or_nothing(true);

    let err = fixture.executor.execute(&mut request).unwrap_err();
    assert!(matches!(err, BatchError::BatchFailure { index: 1, .. }));

    let stored = fixture.store.get(&existing).unwrap();
    assert_eq!(stored.get("Name"), Some(&Value::from("Acme")));
    assert_eq!(fixture.store.count("Account"), 1);
    assert_eq!(fixture.store.savepoint_depth(), 0);
}

#[test]
fn test_atomic_merge_reverts_earlier_duplicates() {
    let fixture = TestFixture::new();
    let master = fixture.account("Master", "M-1");
    let clean = fixture.account("Clean duplicate", "D-1");
    let conflicting = fixture.account("Conflicting duplicate", "D-2");
    let clean_child = fixture.contact("Doe", &clean);
    fixture.profile(&master);
    fixture.profile(&conflicting);
    let before = fixture.store.snapshot();

    let mut request = BatchRequest::merge(
        Record::with_identity("Account", master.clone()),
        vec![
            Record::with_identity("Account", clean.clone()),
            Record::with_identity("Account", conflicting.clone()),
        ],
    )
    .all_or_nothing(true);

    let err = fixture.executor.execute(&mut request).unwrap_err();
    match err {
        BatchError::BatchFailure { index, error } => {
            assert_eq!(index, 1);
            assert_eq!(error.kind, ErrorKind::ConstraintViolation);
        }
        other => panic!("Expected BatchFailure, got {:?}", other),
    }

    assert_eq!(fixture.store.snapshot(), before);
    assert!(fixture.store.contains(&clean));
    assert_eq!(
        fixture.store.get(&clean_child).unwrap().get("AccountId"),
        Some(&Value::Reference(clean))
    );
}

/// Store whose savepoint rollback always fails
struct BrokenRollbackStore {
    inner: MemoryStore,
}

impl Store for BrokenRollbackStore {
    fn apply(
        &self,
        kind: WriteKind,
        records: &[Record],
        all_or_nothing: bool,
    ) -> StoreResult<Vec<RecordResult>> {
        self.inner.apply(kind, records, all_or_nothing)
    }

    fn find_by_key(
        &self,
        object_type: &str,
        key_field: &str,
        key_values: &BTreeSet<String>,
    ) -> StoreResult<HashMap<String, RecordId>> {
        self.inner.find_by_key(object_type, key_field, key_values)
    }

    fn begin_savepoint(&self) -> StoreResult<SavepointToken> {
        self.inner.begin_savepoint()
    }

    fn rollback(&self, _token: SavepointToken) -> StoreResult<()> {
        Err(StoreError::Unavailable("rollback log lost".to_string()))
    }

    fn release_savepoint(&self, token: SavepointToken) -> StoreResult<()> {
        self.inner.release_savepoint(token)
    }

    fn commit(&self) -> StoreResult<()> {
        self.inner.commit()
    }

    fn reassign_and_delete(
        &self,
        master: &RecordId,
        duplicates: &[RecordId],
    ) -> StoreResult<Vec<MergeOutcome>> {
        self.inner.reassign_and_delete(master, duplicates)
    }
}

#[test]
fn test_failed_revert_is_not_reported_as_batch_failure() {
    init_logging();
    let store = Arc::new(BrokenRollbackStore {
        inner: MemoryStore::new(default_schema()),
    });
    let executor = BatchExecutor::new(store.clone());

    let mut seed = BatchRequest::insert(vec![account("Acme", "A-1")]);
    let existing = executor.execute(&mut seed).unwrap()[0]
        .identity()
        .cloned()
        .unwrap();

    let mut request = BatchRequest::upsert(
        "AccountNumber",
        vec![
            account("Changed", "A-1"),
            Record::new("Account").field("AccountNumber", "A-2"),
        ],
    )
    .all_or_nothing(true);
    let err = executor.execute(&mut request).unwrap_err();

    match err {
        BatchError::RollbackFailed { cause, rollback } => {
            assert!(matches!(*cause, BatchError::BatchFailure { index: 1, .. }));
            assert!(rollback.contains("rollback log lost"));
        }
        other => panic!("Expected RollbackFailed, got {:?}", other),
    }

    // The update was not reverted, and the error says so
    assert_eq!(
        store.inner.get(&existing).unwrap().get("Name"),
        Some(&Value::from("Changed"))
    );
    assert_eq!(store.inner.savepoint_depth(), 0);
}
