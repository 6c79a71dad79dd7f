//! Tests for the flat key/value fallback backend.

use life_os_core::storage::traits::{IndexField, RawRecord, StorageBackend};
use life_os_core::storage::FlatBackend;
use life_os_core::types::EntityKind;
use serde_json::json;

fn log_record(id: &str, user_id: &str, log_date: &str) -> RawRecord {
    RawRecord {
        kind: EntityKind::DailyLog,
        id: id.to_string(),
        data: json!({ "id": id, "user_id": user_id, "log_date": log_date }),
    }
}

#[test]
fn record_round_trip() {
    let backend = FlatBackend::in_memory();
    let record = log_record("l1", "u1", "2025-01-27");
    backend.put_raw(&record).unwrap();

    let fetched = backend
        .get_raw(EntityKind::DailyLog, "l1")
        .unwrap()
        .unwrap();
    assert_eq!(fetched, record);
    assert!(backend.get_raw(EntityKind::DailyLog, "l2").unwrap().is_none());
}

#[test]
fn scan_raw_is_scoped_to_kind_prefix() {
    let backend = FlatBackend::in_memory();
    backend.put_raw(&log_record("l1", "u1", "2025-01-26")).unwrap();
    backend
        .put_raw(&RawRecord {
            kind: EntityKind::User,
            id: "u1".to_string(),
            data: json!({ "id": "u1" }),
        })
        .unwrap();

    let logs = backend.scan_raw(EntityKind::DailyLog).unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].id, "l1");
}

#[test]
fn scan_index_raw_degrades_to_full_scan_and_filter() {
    let backend = FlatBackend::in_memory();
    backend.put_raw(&log_record("l1", "u1", "2025-01-26")).unwrap();
    backend.put_raw(&log_record("l2", "u2", "2025-01-26")).unwrap();
    backend.put_raw(&log_record("l3", "u1", "2025-01-27")).unwrap();

    let by_user = backend
        .scan_index_raw(EntityKind::DailyLog, IndexField::UserId, "u1")
        .unwrap();
    assert_eq!(by_user.len(), 2);

    let by_date = backend
        .scan_index_raw(EntityKind::DailyLog, IndexField::LogDate, "2025-01-26")
        .unwrap();
    assert_eq!(by_date.len(), 2);
}

#[test]
fn delete_raw_is_idempotent() {
    let backend = FlatBackend::in_memory();
    backend.put_raw(&log_record("l1", "u1", "2025-01-26")).unwrap();
    backend.delete_raw(EntityKind::DailyLog, "l1").unwrap();
    backend.delete_raw(EntityKind::DailyLog, "l1").unwrap();
    assert!(backend.get_raw(EntityKind::DailyLog, "l1").unwrap().is_none());
}

#[test]
fn plain_values_round_trip() {
    let backend = FlatBackend::in_memory();
    assert!(backend.get_value("user-id").is_none());

    backend.set_value("user-id", json!("u-123")).unwrap();
    assert_eq!(backend.get_value("user-id"), Some(json!("u-123")));

    backend.remove_value("user-id").unwrap();
    assert!(backend.get_value("user-id").is_none());
}

#[test]
fn remove_prefix_drops_matching_keys_only() {
    let backend = FlatBackend::in_memory();
    backend.set_value("cache:a", json!(1)).unwrap();
    backend.set_value("cache:b", json!(2)).unwrap();
    backend.set_value("user-id", json!("u1")).unwrap();

    backend.remove_prefix("cache:").unwrap();

    assert!(backend.get_value("cache:a").is_none());
    assert!(backend.get_value("cache:b").is_none());
    assert_eq!(backend.get_value("user-id"), Some(json!("u1")));
}

#[test]
fn clear_raw_keeps_pointers_and_blobs() {
    let backend = FlatBackend::in_memory();
    backend.put_raw(&log_record("l1", "u1", "2025-01-26")).unwrap();
    backend.set_value("user-id", json!("u1")).unwrap();
    backend.set_value("sync-queue", json!({ "queue": [] })).unwrap();

    backend.clear_raw().unwrap();

    assert!(backend.scan_raw(EntityKind::DailyLog).unwrap().is_empty());
    assert_eq!(backend.get_value("user-id"), Some(json!("u1")));
    assert!(backend.get_value("sync-queue").is_some());
}

#[test]
fn file_backed_store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("flat.json");

    {
        let backend = FlatBackend::open(&path);
        backend.put_raw(&log_record("l1", "u1", "2025-01-26")).unwrap();
        backend.set_value("user-id", json!("u1")).unwrap();
    }

    let backend = FlatBackend::open(&path);
    let fetched = backend
        .get_raw(EntityKind::DailyLog, "l1")
        .unwrap()
        .unwrap();
    assert_eq!(fetched.data["user_id"], json!("u1"));
    assert_eq!(backend.get_value("user-id"), Some(json!("u1")));
}

#[test]
fn corrupt_file_starts_empty_instead_of_failing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("flat.json");
    std::fs::write(&path, "{not json").unwrap();

    let backend = FlatBackend::open(&path);
    assert!(backend.get_value("user-id").is_none());

    // Still usable after the discard.
    backend.set_value("user-id", json!("u1")).unwrap();
    assert_eq!(backend.get_value("user-id"), Some(json!("u1")));
}

#[test]
fn missing_file_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    let backend = FlatBackend::open(dir.path().join("never-written.json"));
    assert!(backend.scan_raw(EntityKind::User).unwrap().is_empty());
}
