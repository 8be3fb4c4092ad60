//! Integration tests for carehero-store
//!
//! These tests verify the full persist-and-reload cycle for session records.

use carehero_domain::{PatientRecord, RequiredField, SessionStore, Speaker};
use carehero_store::{InMemorySessionStore, JsonArchive, SqliteSessionStore};
use tempfile::TempDir;

fn populated_record(id: &str) -> PatientRecord {
    let mut record = PatientRecord::new(id);
    record.record_message(Speaker::User, "I have a terrible headache");
    record.set_field_if_empty(RequiredField::MedicalCondition, "terrible headache");
    record.add_symptom("headache");
    record.record_message(Speaker::IntakeRole, "What is your ZIP code?");
    record.record_message(Speaker::User, "90210");
    record.set_field_if_empty(RequiredField::ZipCode, "90210");
    record
}

#[test]
fn test_sqlite_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("sessions.db");

    let record = populated_record("round-trip");
    {
        let mut store = SqliteSessionStore::new(&path).unwrap();
        store.put(record.clone()).unwrap();
    }

    // Reopen to prove the data survived the connection
    let store = SqliteSessionStore::new(&path).unwrap();
    let loaded = store.get("round-trip").unwrap().expect("record should exist");

    assert_eq!(loaded.medical_condition(), record.medical_condition());
    assert_eq!(loaded.zip_code(), record.zip_code());
    assert_eq!(loaded.symptoms(), record.symptoms());
    assert_eq!(
        loaded.conversation_history().len(),
        record.conversation_history().len()
    );
    assert_eq!(loaded, record);
}

#[test]
fn test_sqlite_put_replaces_and_delete() {
    let mut store = SqliteSessionStore::new(":memory:").unwrap();
    let mut record = populated_record("s");
    store.put(record.clone()).unwrap();

    record.set_field_if_empty(RequiredField::PhoneNumber, "555-123-4567");
    store.put(record).unwrap();

    let loaded = store.get("s").unwrap().unwrap();
    assert_eq!(loaded.phone_number(), Some("555-123-4567"));
    assert_eq!(store.session_ids().unwrap(), vec!["s".to_string()]);

    assert!(store.delete("s").unwrap());
    assert!(store.get("s").unwrap().is_none());
}

#[test]
fn test_in_memory_round_trip() {
    let mut store = InMemorySessionStore::new();
    let record = populated_record("mem");
    store.put(record.clone()).unwrap();
    assert_eq!(store.get("mem").unwrap(), Some(record));
}

#[test]
fn test_archive_snapshot_history() {
    let dir = TempDir::new().unwrap();
    let archive = JsonArchive::new(dir.path().join("data")).unwrap();

    let mut record = populated_record("hist");
    archive.append_patient_snapshot(&record).unwrap();
    record.set_field_if_empty(RequiredField::PhoneNumber, "555-123-4567");
    let len = archive.append_patient_snapshot(&record).unwrap();
    assert_eq!(len, 2);

    let snapshots = archive.load_patient_snapshots("hist");
    assert_eq!(snapshots.len(), 2);
    assert_eq!(snapshots[0].phone_number(), None);

    let latest = archive.latest_patient_snapshot("hist").unwrap();
    assert_eq!(latest, record);
    assert_eq!(
        latest.conversation_history().len(),
        record.conversation_history().len()
    );
}

#[test]
fn test_archive_extractions_append() {
    let dir = TempDir::new().unwrap();
    let archive = JsonArchive::new(dir.path()).unwrap();

    archive
        .append_extraction("x", &serde_json::json!({"turn": 1}))
        .unwrap();
    archive
        .append_extraction("x", &serde_json::json!({"turn": 2}))
        .unwrap();

    let loaded: Vec<serde_json::Value> = archive.load_extractions("x");
    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded[1]["turn"], 2);
}
