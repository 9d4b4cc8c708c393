// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Tests for backend JSON normalization.

#![allow(clippy::unwrap_used)]

use super::wire::*;
use chrono::{NaiveDate, TimeZone, Utc};
use mm_core::id::{derived_id, DERIVED_PREFIX};
use mm_core::{AnniversaryRecord, MessageRecord, SyncStatus};
use serde_json::json;
use yare::parameterized;

#[test]
fn relational_anniversary_rows() {
    let body = json!([
        { "id": 1, "name": "First date", "date": "2023-04-17" },
        { "id": "2", "name": "Trip", "date": "2024-07-01T00:00:00.000Z" },
    ]);
    let records = parse_anniversaries(body).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].id, "1");
    assert_eq!(records[0].date, NaiveDate::from_ymd_opt(2023, 4, 17).unwrap());
    assert_eq!(records[1].id, "2");
    assert_eq!(records[1].date, NaiveDate::from_ymd_opt(2024, 7, 1).unwrap());
    assert!(records.iter().all(|r| r.sync_status == SyncStatus::Synced));
}

#[test]
fn alternate_anniversary_shape_uses_title() {
    let body = json!([
        { "id": 7, "title": "Moved in", "date": "2024-01-05", "description": "keys!", "type": "milestone" },
    ]);
    let records = parse_anniversaries(body).unwrap();
    assert_eq!(records[0].name, "Moved in");
    assert_eq!(records[0].id, "7");
}

#[test]
fn kv_anniversary_rows_get_derived_ids() {
    let body = json!([{ "name": "First date", "date": "2023-04-17" }]);
    let records = parse_anniversaries(body).unwrap();
    assert!(records[0].id.starts_with(DERIVED_PREFIX));
    assert_eq!(records[0].id, derived_id(&["First date", "2023-04-17"]));
}

#[test]
fn malformed_rows_are_skipped() {
    let body = json!([
        { "id": 1, "name": "Good", "date": "2023-04-17" },
        { "id": 2, "name": "", "date": "2023-04-17" },
        { "id": 3, "name": "Bad date", "date": "someday" },
        "not a row",
    ]);
    let records = parse_anniversaries(body).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, "1");
}

#[parameterized(
    object = { json!({ "error": "boom" }) },
    string = { json!("nope") },
    number = { json!(3) },
)]
fn non_array_body_is_an_error(body: serde_json::Value) {
    assert!(matches!(
        parse_messages(body),
        Err(WireError::NotAnArray(_))
    ));
}

#[test]
fn null_body_is_empty_collection() {
    assert!(parse_messages(serde_json::Value::Null).unwrap().is_empty());
}

#[parameterized(
    rfc3339 = { json!({ "id": 1, "name": "A", "content": "hi", "timestamp": "2024-05-01T12:00:00Z" }) },
    sqlite = { json!({ "id": 1, "name": "A", "content": "hi", "timestamp": "2024-05-01 12:00:00" }) },
    millis = { json!({ "id": 1, "name": "A", "content": "hi", "timestamp": 1714564800000_i64 }) },
    kv_date = { json!({ "id": 1, "name": "A", "content": "hi", "date": "2024-05-01T12:00:00.000Z" }) },
)]
fn message_timestamp_forms(row: serde_json::Value) {
    let records = parse_messages(json!([row])).unwrap();
    assert_eq!(
        records[0].timestamp,
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    );
}

#[test]
fn message_without_any_time_is_skipped() {
    let records = parse_messages(json!([{ "id": 1, "name": "A", "content": "hi" }])).unwrap();
    assert!(records.is_empty());
}

#[test]
fn kv_message_id_matches_parsed_id() {
    let record = MessageRecord {
        id: "tmp-1".into(),
        name: "Ana".into(),
        content: "hello".into(),
        timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        sync_status: SyncStatus::Pending,
    };
    let row = kv_message_row(&record);
    assert_eq!(row["date"], "2024-05-01T12:00:00.000Z");

    let parsed = parse_messages(json!([row.clone()])).unwrap();
    assert_eq!(Some(parsed[0].id.clone()), kv_message_id(&row));
}

#[test]
fn kv_message_delete_body_keeps_raw_triple() {
    let row = json!({ "name": "Ana", "content": "hello", "date": "2024-05-01T12:00:00.000Z", "extra": 1 });
    assert_eq!(
        kv_message_delete_body(&row),
        json!({ "name": "Ana", "content": "hello", "date": "2024-05-01T12:00:00.000Z" })
    );
}

#[test]
fn kv_anniversary_id_matches_parsed_id() {
    let record = AnniversaryRecord {
        id: "tmp-1".into(),
        name: "Trip".into(),
        date: NaiveDate::from_ymd_opt(2024, 7, 1).unwrap(),
        sync_status: SyncStatus::Pending,
    };
    let row = kv_anniversary_row(&record);
    let parsed = parse_anniversaries(json!([row.clone()])).unwrap();
    assert_eq!(Some(parsed[0].id.clone()), kv_anniversary_id(&row));
}

#[parameterized(
    numeric = { json!({ "success": true, "id": 42 }), Some("42") },
    text = { json!({ "success": true, "id": "abc" }), Some("abc") },
    absent = { json!({ "success": true }), None },
    empty = { serde_json::Value::Null, None },
)]
fn receipt_ids(body: serde_json::Value, expected: Option<&str>) {
    assert_eq!(parse_receipt(body).id.as_deref(), expected);
}

#[parameterized(
    numeric = { "42", json!({ "id": 42 }) },
    text = { "kv-abc", json!({ "id": "kv-abc" }) },
)]
fn delete_body_id_types(id: &str, expected: serde_json::Value) {
    assert_eq!(delete_body(id), expected);
}

#[test]
fn photos_parse_camel_case() {
    let body = json!([
        { "id": "1700000000000", "url": "https://example.com/p.jpg", "description": "beach", "uploadedAt": "2024-05-01T12:00:00.000Z" },
        { "id": 2, "url": "https://example.com/q.jpg" },
    ]);
    let photos = parse_photos(body).unwrap();
    assert_eq!(photos.len(), 2);
    assert_eq!(photos[0].description, "beach");
    assert!(photos[0].uploaded_at.is_some());
    assert_eq!(photos[1].id, "2");
    assert!(photos[1].uploaded_at.is_none());
}
