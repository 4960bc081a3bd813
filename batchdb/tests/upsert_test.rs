//! Upsert by external key

#[path = "testutils/mod.rs"]
mod testutils;

use batchdb::{BatchError, BatchRequest, ErrorKind, Record, Value};
use testutils::test_fixture::{account, TestFixture};

#[test]
fn test_upsert_twice_is_idempotent() {
    let fixture = TestFixture::new();

    let mut first = BatchRequest::upsert("AccountNumber", vec![account("Acme", "A-1")]);
    let first_results = fixture.executor.execute(&mut first).unwrap();
    assert!(first_results[0].is_success());
    assert!(first_results[0].was_created());

    let mut second = BatchRequest::upsert("AccountNumber", vec![account("Acme", "A-1")]);
    let second_results = fixture.executor.execute(&mut second).unwrap();
    assert!(second_results[0].is_success());
    assert!(!second_results[0].was_created());

    assert_eq!(first_results[0].identity(), second_results[0].identity());
    assert_eq!(first.records[0].identity(), second.records[0].identity());
    assert_eq!(fixture.store.count("Account"), 1);
}

#[test]
fn test_upsert_mixes_updates_and_inserts_with_one_lookup() {
    let fixture = TestFixture::new();
    let existing = fixture.account("Acme", "A-1");
    let lookups_before = fixture.store.key_lookup_count();

    let mut request = BatchRequest::upsert(
        "AccountNumber",
        vec![
            account("Globex", "A-2"),
            Record::new("Account")
                .field("AccountNumber", "A-1")
                .field("Industry", "Manufacturing"),
            account("Initech", "A-3"),
        ],
    );
    let results = fixture.executor.execute(&mut request).unwrap();

    assert_eq!(fixture.store.key_lookup_count() - lookups_before, 1);
    assert!(results.iter().all(|result| result.is_success()));
    assert!(results[0].was_created());
    assert!(!results[1].was_created());
    assert!(results[2].was_created());
    assert_eq!(results[1].identity(), Some(&existing));

    // The update keeps fields it does not mention
    let stored = fixture.store.get(&existing).unwrap();
    assert_eq!(stored.get("Name"), Some(&Value::from("Acme")));
    assert_eq!(stored.get("Industry"), Some(&Value::from("Manufacturing")));
    assert_eq!(fixture.store.count("Account"), 3);
}

#[test]
fn test_upsert_without_key_fails_that_record_only() {
    let fixture = TestFixture::new();

    let mut request = BatchRequest::upsert(
        "AccountNumber",
        vec![
            Record::new("Account").field("Name", "No number"),
            Record::new("Account")
                .field("Name", "Blank number")
                .field("AccountNumber", ""),
            account("Acme", "A-1"),
        ],
    );
    let results = fixture.executor.execute(&mut request).unwrap();

    assert_eq!(
        results[0].first_error().unwrap().kind,
        ErrorKind::MissingExternalKey
    );
    assert_eq!(
        results[1].first_error().unwrap().kind,
        ErrorKind::MissingExternalKey
    );
    assert!(results[2].is_success());
    assert_eq!(fixture.store.count("Account"), 1);
}

#[test]
fn test_upsert_repeated_key_in_one_batch() {
    let fixture = TestFixture::new();

    let mut request = BatchRequest::upsert(
        "AccountNumber",
        vec![account("Acme", "A-1"), account("Acme again", "A-1")],
    );
    let results = fixture.executor.execute(&mut request).unwrap();

    assert!(results[0].is_success());
    assert_eq!(
        results[1].first_error().unwrap().kind,
        ErrorKind::DuplicateValue
    );
    assert_eq!(fixture.store.count("Account"), 1);
}

#[test]
fn test_upsert_rejects_mixed_object_types() {
    let fixture = TestFixture::new();

    let mut request = BatchRequest::upsert(
        "AccountNumber",
        vec![
            account("Acme", "A-1"),
            Record::new("Contact")
                .field("LastName", "Doe")
                .field("AccountNumber", "A-2"),
        ],
    );
    let err = fixture.executor.execute(&mut request).unwrap_err();

    assert!(matches!(err, BatchError::InvalidRequest(_)));
    assert!(fixture.store.is_empty());
}
