// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use crate::merge::plan_merge;
use crate::op::OperationType;
use chrono::TimeZone;
use yare::parameterized;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn anniversary(id: &str, name: &str, on: NaiveDate, status: SyncStatus) -> AnniversaryRecord {
    AnniversaryRecord {
        id: id.to_string(),
        name: name.to_string(),
        date: on,
        sync_status: status,
    }
}

fn message(id: &str, content: &str, hour: u32, status: SyncStatus) -> MessageRecord {
    MessageRecord {
        id: id.to_string(),
        name: "Ana".to_string(),
        content: content.to_string(),
        timestamp: Utc.with_ymd_and_hms(2024, 5, 1, hour, 0, 0).unwrap(),
        sync_status: status,
    }
}

#[test]
fn open_creates_parent_directories() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("memoria.db");
    let store = LocalStore::open(&path).unwrap();
    assert!(path.exists());
    assert_eq!(store.path(), Some(path.as_path()));
    assert_eq!(store.queue_len().unwrap(), 0);
    assert_eq!(LocalStore::open_in_memory().unwrap().path(), None);
}

#[test]
fn open_failure_is_storage_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    // A directory cannot be opened as a database file.
    let err = LocalStore::open(dir.path()).err().unwrap();
    assert!(matches!(err, Error::StorageUnavailable(_)));
    assert!(err.is_storage());
}

#[test]
fn reopen_keeps_records() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("memoria.db");
    {
        let mut store = LocalStore::open(&path).unwrap();
        store
            .bulk_upsert(&[anniversary("1", "First date", date(2023, 4, 17), SyncStatus::Synced)])
            .unwrap();
    }
    let store = LocalStore::open(&path).unwrap();
    let all: Vec<AnniversaryRecord> = store.get_all().unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].name, "First date");
}

#[test]
fn anniversaries_are_listed_by_date() {
    let mut store = LocalStore::open_in_memory().unwrap();
    store
        .bulk_upsert(&[
            anniversary("b", "Later", date(2024, 1, 1), SyncStatus::Synced),
            anniversary("a", "Earlier", date(2023, 4, 17), SyncStatus::Synced),
        ])
        .unwrap();

    let all: Vec<AnniversaryRecord> = store.get_all().unwrap();
    let ids: Vec<&str> = all.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b"]);
}

#[test]
fn messages_are_listed_newest_first() {
    let mut store = LocalStore::open_in_memory().unwrap();
    store
        .bulk_upsert(&[
            message("old", "first", 8, SyncStatus::Synced),
            message("new", "second", 20, SyncStatus::Synced),
        ])
        .unwrap();

    let all: Vec<MessageRecord> = store.get_all().unwrap();
    let ids: Vec<&str> = all.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["new", "old"]);
}

#[test]
fn message_timestamp_round_trips_with_subsecond_precision() {
    let mut store = LocalStore::open_in_memory().unwrap();
    let mut record = message("m", "hi", 9, SyncStatus::Pending);
    record.timestamp = Utc.timestamp_nanos(1_714_557_600_123_456_789);
    store.bulk_upsert(std::slice::from_ref(&record)).unwrap();

    let stored: MessageRecord = store.get("m").unwrap().unwrap();
    assert_eq!(stored, record);
}

#[test]
fn upsert_overwrites_by_id() {
    let mut store = LocalStore::open_in_memory().unwrap();
    store
        .bulk_upsert(&[anniversary("1", "Old", date(2023, 4, 17), SyncStatus::Pending)])
        .unwrap();
    store
        .bulk_upsert(&[anniversary("1", "New", date(2023, 4, 18), SyncStatus::Synced)])
        .unwrap();

    let all: Vec<AnniversaryRecord> = store.get_all().unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].name, "New");
    assert_eq!(all[0].sync_status, SyncStatus::Synced);
}

#[test]
fn bulk_upsert_is_atomic() {
    let mut store = LocalStore::open_in_memory().unwrap();
    let result = store.bulk_upsert(&[
        anniversary("1", "Fine", date(2023, 4, 17), SyncStatus::Synced),
        anniversary("2", "", date(2023, 4, 17), SyncStatus::Synced),
    ]);
    assert!(result.is_err());

    let all: Vec<AnniversaryRecord> = store.get_all().unwrap();
    assert!(all.is_empty());
}

#[test]
fn get_missing_record_is_none() {
    let store = LocalStore::open_in_memory().unwrap();
    let found: Option<MessageRecord> = store.get("nope").unwrap();
    assert!(found.is_none());
}

#[test]
fn set_status_on_missing_record_fails() {
    let mut store = LocalStore::open_in_memory().unwrap();
    let err = store
        .set_status::<AnniversaryRecord>("nope", SyncStatus::Error)
        .unwrap_err();
    assert!(matches!(err, Error::RecordNotFound(_)));
}

#[test]
fn set_status_updates_record() {
    let mut store = LocalStore::open_in_memory().unwrap();
    store
        .bulk_upsert(&[message("m", "hi", 9, SyncStatus::Pending)])
        .unwrap();
    store
        .set_status::<MessageRecord>("m", SyncStatus::Error)
        .unwrap();
    let stored: MessageRecord = store.get("m").unwrap().unwrap();
    assert_eq!(stored.sync_status, SyncStatus::Error);
}

#[test]
fn queue_preserves_enqueue_order() {
    let mut store = LocalStore::open_in_memory().unwrap();
    let first = store
        .enqueue(&Operation::create_message(message("tmp-1", "a", 9, SyncStatus::Pending)))
        .unwrap();
    let second = store
        .enqueue(&Operation::delete(DataType::Anniversary, "7"))
        .unwrap();
    assert!(second.id > first.id);

    let queued = store.peek_queue().unwrap();
    assert_eq!(queued.len(), 2);
    assert_eq!(queued[0].id, first.id);
    assert_eq!(queued[0].operation_type, OperationType::Create);
    assert_eq!(queued[1].record_id(), "7");
    assert_eq!(queued[1].enqueued_at, second.enqueued_at);
}

#[test]
fn enqueue_rejects_inconsistent_operation() {
    let mut store = LocalStore::open_in_memory().unwrap();
    let mut op = Operation::delete(DataType::Message, "1");
    op.operation_type = OperationType::Create;
    let err = store.enqueue(&op).unwrap_err();
    assert!(matches!(err, Error::Validation { .. }));
    assert_eq!(store.queue_len().unwrap(), 0);
}

#[test]
fn peek_does_not_remove() {
    let mut store = LocalStore::open_in_memory().unwrap();
    store
        .enqueue(&Operation::delete(DataType::Message, "1"))
        .unwrap();
    store.peek_queue().unwrap();
    assert_eq!(store.queue_len().unwrap(), 1);
}

#[test]
fn drain_empties_queue() {
    let mut store = LocalStore::open_in_memory().unwrap();
    store
        .enqueue(&Operation::delete(DataType::Message, "1"))
        .unwrap();
    store
        .enqueue(&Operation::delete(DataType::Message, "2"))
        .unwrap();

    let drained = store.drain_queue().unwrap();
    assert_eq!(drained.len(), 2);
    assert_eq!(store.queue_len().unwrap(), 0);
}

#[test]
fn remove_ops_only_removes_listed_ids() {
    let mut store = LocalStore::open_in_memory().unwrap();
    let keep = store
        .enqueue(&Operation::delete(DataType::Message, "1"))
        .unwrap();
    let done = store
        .enqueue(&Operation::delete(DataType::Message, "2"))
        .unwrap();

    assert_eq!(store.remove_ops(&[done.id]).unwrap(), 1);
    let queued = store.peek_queue().unwrap();
    assert_eq!(queued.len(), 1);
    assert_eq!(queued[0].id, keep.id);
}

#[test]
fn remove_ops_with_no_ids_is_noop() {
    let mut store = LocalStore::open_in_memory().unwrap();
    assert_eq!(store.remove_ops(&[]).unwrap(), 0);
}

#[test]
fn insert_with_op_stores_record_and_queue_entry() {
    let mut store = LocalStore::open_in_memory().unwrap();
    let record = anniversary("tmp-1", "Trip", date(2024, 7, 1), SyncStatus::Pending);
    store
        .insert_with_op(&record, &Operation::create_anniversary(record.clone()))
        .unwrap();

    assert!(store.exists::<AnniversaryRecord>("tmp-1").unwrap());
    assert_eq!(store.queue_len().unwrap(), 1);
}

#[test]
fn insert_with_op_rolls_back_on_bad_record() {
    let mut store = LocalStore::open_in_memory().unwrap();
    let record = anniversary("tmp-1", "", date(2024, 7, 1), SyncStatus::Pending);
    let result = store.insert_with_op(&record, &Operation::create_anniversary(record.clone()));
    assert!(result.is_err());
    assert_eq!(store.queue_len().unwrap(), 0);
}

#[test]
fn remove_with_op_deletes_and_queues() {
    let mut store = LocalStore::open_in_memory().unwrap();
    store
        .bulk_upsert(&[message("5", "hi", 9, SyncStatus::Synced)])
        .unwrap();

    store
        .remove_with_op::<MessageRecord>("5", &Operation::delete(DataType::Message, "5"))
        .unwrap();

    assert!(!store.exists::<MessageRecord>("5").unwrap());
    let queued = store.peek_queue().unwrap();
    assert_eq!(queued[0].operation_type, OperationType::Delete);
}

#[test]
fn discard_unconfirmed_drops_record_and_its_ops() {
    let mut store = LocalStore::open_in_memory().unwrap();
    let record = message("tmp-1", "hi", 9, SyncStatus::Pending);
    store
        .insert_with_op(&record, &Operation::create_message(record.clone()))
        .unwrap();
    store
        .enqueue(&Operation::delete(DataType::Message, "other"))
        .unwrap();

    let dropped = store.discard_unconfirmed::<MessageRecord>("tmp-1").unwrap();
    assert_eq!(dropped, 1);
    assert!(!store.exists::<MessageRecord>("tmp-1").unwrap());
    let queued = store.peek_queue().unwrap();
    assert_eq!(queued.len(), 1);
    assert_eq!(queued[0].record_id(), "other");
}

#[test]
fn discard_unconfirmed_missing_record_fails() {
    let mut store = LocalStore::open_in_memory().unwrap();
    let err = store
        .discard_unconfirmed::<AnniversaryRecord>("nope")
        .unwrap_err();
    assert!(matches!(err, Error::RecordNotFound(_)));
}

#[test]
fn replace_id_renames_and_confirms() {
    let mut store = LocalStore::open_in_memory().unwrap();
    let record = anniversary("tmp-1", "Trip", date(2024, 7, 1), SyncStatus::Pending);
    store
        .insert_with_op(&record, &Operation::create_anniversary(record.clone()))
        .unwrap();

    let outcome = store.replace_id::<AnniversaryRecord>("tmp-1", "42").unwrap();
    assert_eq!(outcome, IdReplacement::Renamed);

    assert!(!store.exists::<AnniversaryRecord>("tmp-1").unwrap());
    let stored: AnniversaryRecord = store.get("42").unwrap().unwrap();
    assert_eq!(stored.sync_status, SyncStatus::Synced);
    assert_eq!(stored.name, "Trip");
}

#[test]
fn replace_id_rewrites_queued_payloads() {
    let mut store = LocalStore::open_in_memory().unwrap();
    let record = message("tmp-1", "hi", 9, SyncStatus::Pending);
    store
        .insert_with_op(&record, &Operation::create_message(record.clone()))
        .unwrap();
    store
        .enqueue(&Operation::delete(DataType::Message, "tmp-1"))
        .unwrap();

    store.replace_id::<MessageRecord>("tmp-1", "9").unwrap();

    let queued = store.peek_queue().unwrap();
    assert!(queued.iter().all(|op| op.record_id() == "9"));
}

#[test]
fn replace_id_leaves_other_collection_alone() {
    let mut store = LocalStore::open_in_memory().unwrap();
    let record = message("tmp-1", "hi", 9, SyncStatus::Pending);
    store.bulk_upsert(std::slice::from_ref(&record)).unwrap();
    store
        .enqueue(&Operation::delete(DataType::Anniversary, "tmp-1"))
        .unwrap();

    store.replace_id::<MessageRecord>("tmp-1", "9").unwrap();

    let queued = store.peek_queue().unwrap();
    assert_eq!(queued[0].record_id(), "tmp-1");
}

#[test]
fn replace_id_collapses_onto_existing_confirmed_row() {
    let mut store = LocalStore::open_in_memory().unwrap();
    store
        .bulk_upsert(&[
            anniversary("tmp-1", "Trip", date(2024, 7, 1), SyncStatus::Pending),
            anniversary("42", "Trip", date(2024, 7, 1), SyncStatus::Synced),
        ])
        .unwrap();

    let outcome = store.replace_id::<AnniversaryRecord>("tmp-1", "42").unwrap();
    assert_eq!(outcome, IdReplacement::Collapsed);

    let all: Vec<AnniversaryRecord> = store.get_all().unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].id, "42");
}

#[test]
fn replace_id_missing_tentative_row() {
    let mut store = LocalStore::open_in_memory().unwrap();
    let outcome = store.replace_id::<MessageRecord>("tmp-1", "9").unwrap();
    assert_eq!(outcome, IdReplacement::Missing);
}

#[test]
fn apply_merge_upserts_and_removes_in_one_batch() {
    let mut store = LocalStore::open_in_memory().unwrap();
    store
        .bulk_upsert(&[
            anniversary("1", "Gone", date(2023, 1, 1), SyncStatus::Synced),
            anniversary("tmp-1", "Offline", date(2023, 2, 1), SyncStatus::Pending),
        ])
        .unwrap();

    let local: Vec<AnniversaryRecord> = store.get_all().unwrap();
    let remote = vec![anniversary("2", "New", date(2023, 3, 1), SyncStatus::Synced)];
    let plan = plan_merge(&local, &remote);
    store.apply_merge(&plan).unwrap();

    let all: Vec<AnniversaryRecord> = store.get_all().unwrap();
    let ids: Vec<&str> = all.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["tmp-1", "2"]);
}

#[test]
fn meta_defaults_when_unset() {
    let store = LocalStore::open_in_memory().unwrap();
    assert_eq!(store.load_meta().unwrap(), SyncMeta::default());
}

#[parameterized(
    never_synced = { None, 3 },
    synced = { Some(1_714_557_600), 0 },
)]
fn meta_round_trips(last_sync: Option<i64>, retry_count: u32) {
    let mut store = LocalStore::open_in_memory().unwrap();
    let meta = SyncMeta {
        last_sync_time: last_sync.map(|s| Utc.timestamp_opt(s, 0).unwrap()),
        retry_count,
    };
    store.save_meta(&meta).unwrap();
    assert_eq!(store.load_meta().unwrap(), meta);
}

#[test]
fn corrupted_status_is_reported() {
    let store = LocalStore::open_in_memory().unwrap();
    store
        .conn
        .execute(
            "INSERT INTO messages (id, name, content, timestamp, sync_status)
             VALUES ('x', 'Ana', 'hi', '2024-05-01T09:00:00Z', 'bogus')",
            [],
        )
        .unwrap();
    let result: Result<Vec<MessageRecord>> = store.get_all();
    assert!(result.is_err());
}
