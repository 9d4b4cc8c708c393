// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Normalization of backend JSON into records, and of records into request bodies.
//!
//! The backend comes in two shapes. Relational rows carry a server id and
//! either `{name, date}` or `{title, date, description, type}` for
//! anniversaries. KV-array rows carry no id at all, so a stable id is derived
//! from the row content. Both normalize into the same record types here and
//! nowhere else.
//!
//! A body that is not a JSON array is an error. A single row that cannot be
//! normalized is skipped with a warning so one bad row cannot wedge sync.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;

use mm_core::id::derived_id;
use mm_core::{AnniversaryRecord, MessageRecord, PhotoRecord, SyncStatus};

use super::remote::CreateReceipt;

/// Error type for normalization failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WireError {
    #[error("expected a JSON array, got {0}")]
    NotAnArray(&'static str),

    #[error("missing field '{0}'")]
    MissingField(&'static str),

    #[error("invalid date '{0}'")]
    InvalidDate(String),

    #[error("invalid timestamp '{0}'")]
    InvalidTimestamp(String),

    #[error("{0}")]
    Json(String),
}

/// Id as the backend sends it: a row number or a string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum WireId {
    Number(i64),
    Text(String),
}

impl WireId {
    pub fn into_string(self) -> String {
        match self {
            WireId::Number(n) => n.to_string(),
            WireId::Text(s) => s,
        }
    }
}

/// Instant as the backend sends it: epoch milliseconds or a date-time string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
enum WireInstant {
    Millis(i64),
    Text(String),
}

impl WireInstant {
    fn raw(&self) -> String {
        match self {
            WireInstant::Millis(ms) => ms.to_string(),
            WireInstant::Text(s) => s.clone(),
        }
    }

    fn parse(&self) -> Result<DateTime<Utc>, WireError> {
        match self {
            WireInstant::Millis(ms) => Utc
                .timestamp_millis_opt(*ms)
                .single()
                .ok_or_else(|| WireError::InvalidTimestamp(ms.to_string())),
            WireInstant::Text(s) => parse_instant(s),
        }
    }
}

#[derive(Debug, Deserialize)]
struct AnniversaryRow {
    #[serde(default)]
    id: Option<WireId>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    date: Option<String>,
}

impl AnniversaryRow {
    fn label(&self) -> Option<&str> {
        self.name
            .as_deref()
            .or(self.title.as_deref())
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    fn into_record(self) -> Result<AnniversaryRecord, WireError> {
        let label = self.label().ok_or(WireError::MissingField("name"))?;
        let raw_date = self.date.as_deref().ok_or(WireError::MissingField("date"))?;
        let date = parse_date(raw_date)?;
        let id = match self.id.clone() {
            Some(id) => id.into_string(),
            None => derived_id(&[label, raw_date]),
        };
        Ok(AnniversaryRecord {
            id,
            name: label.to_string(),
            date,
            sync_status: SyncStatus::Synced,
        })
    }
}

#[derive(Debug, Deserialize)]
struct MessageRow {
    #[serde(default)]
    id: Option<WireId>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    timestamp: Option<WireInstant>,
    #[serde(default)]
    date: Option<WireInstant>,
}

impl MessageRow {
    fn into_record(self) -> Result<MessageRecord, WireError> {
        let name = non_empty(self.name.as_deref()).ok_or(WireError::MissingField("name"))?;
        let content =
            non_empty(self.content.as_deref()).ok_or(WireError::MissingField("content"))?;
        let instant = self
            .timestamp
            .as_ref()
            .or(self.date.as_ref())
            .ok_or(WireError::MissingField("timestamp"))?;
        let timestamp = instant.parse()?;
        let id = match self.id.clone() {
            Some(id) => id.into_string(),
            // KV rows are deleted by their raw (name, date, content) triple.
            None => derived_id(&[name, &instant.raw(), content]),
        };
        Ok(MessageRecord {
            id,
            name: name.to_string(),
            content: content.to_string(),
            timestamp,
            sync_status: SyncStatus::Synced,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PhotoRow {
    id: WireId,
    url: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    uploaded_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReceiptBody {
    #[serde(default)]
    id: Option<WireId>,
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

/// Parse a calendar date from the first ten characters (`YYYY-MM-DD`).
pub fn parse_date(raw: &str) -> Result<NaiveDate, WireError> {
    let head = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(head, "%Y-%m-%d").map_err(|_| WireError::InvalidDate(raw.to_string()))
}

/// Parse an instant from RFC 3339, SQLite's `YYYY-MM-DD HH:MM:SS` (UTC), or epoch millis.
pub fn parse_instant(raw: &str) -> Result<DateTime<Utc>, WireError> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Ok(naive.and_utc());
    }
    if let Ok(ms) = raw.parse::<i64>() {
        if let Some(dt) = Utc.timestamp_millis_opt(ms).single() {
            return Ok(dt);
        }
    }
    Err(WireError::InvalidTimestamp(raw.to_string()))
}

fn rows(body: Value) -> Result<Vec<Value>, WireError> {
    match body {
        Value::Array(rows) => Ok(rows),
        // An empty KV namespace reads back as null.
        Value::Null => Ok(Vec::new()),
        Value::Object(_) => Err(WireError::NotAnArray("an object")),
        Value::String(_) => Err(WireError::NotAnArray("a string")),
        Value::Number(_) => Err(WireError::NotAnArray("a number")),
        Value::Bool(_) => Err(WireError::NotAnArray("a boolean")),
    }
}

fn normalize_rows<Row, R>(
    body: Value,
    kind: &str,
    convert: impl Fn(Row) -> Result<R, WireError>,
) -> Result<Vec<R>, WireError>
where
    Row: for<'de> Deserialize<'de>,
{
    let mut records = Vec::new();
    for (index, row) in rows(body)?.into_iter().enumerate() {
        let parsed = serde_json::from_value::<Row>(row)
            .map_err(|e| WireError::Json(e.to_string()))
            .and_then(&convert);
        match parsed {
            Ok(record) => records.push(record),
            Err(e) => warn!(kind, index, error = %e, "skipping malformed row"),
        }
    }
    Ok(records)
}

/// Normalize a `GET /api/anniversaries` body.
pub fn parse_anniversaries(body: Value) -> Result<Vec<AnniversaryRecord>, WireError> {
    normalize_rows(body, "anniversary", AnniversaryRow::into_record)
}

/// Normalize a `GET /api/messages` body.
pub fn parse_messages(body: Value) -> Result<Vec<MessageRecord>, WireError> {
    normalize_rows(body, "message", MessageRow::into_record)
}

/// Normalize a `GET /api/photos` body.
pub fn parse_photos(body: Value) -> Result<Vec<PhotoRecord>, WireError> {
    normalize_rows(body, "photo", |row: PhotoRow| {
        let uploaded_at = match row.uploaded_at.as_deref() {
            Some(raw) => Some(parse_instant(raw)?),
            None => None,
        };
        Ok(PhotoRecord {
            id: row.id.into_string(),
            url: row.url,
            description: row.description.unwrap_or_default(),
            uploaded_at,
        })
    })
}

/// Read the confirmed id, if any, from a create response.
pub fn parse_receipt(body: Value) -> CreateReceipt {
    let id = serde_json::from_value::<ReceiptBody>(body)
        .ok()
        .and_then(|receipt| receipt.id)
        .map(WireId::into_string);
    CreateReceipt { id }
}

/// Relational create body for an anniversary.
pub fn anniversary_body(record: &AnniversaryRecord) -> Value {
    json!({
        "name": record.name,
        "date": record.date.format("%Y-%m-%d").to_string(),
    })
}

/// Relational create body for a message. The backend stamps the time itself.
pub fn message_body(record: &MessageRecord) -> Value {
    json!({
        "name": record.name,
        "content": record.content,
    })
}

/// Relational delete body. Numeric ids are sent as numbers.
pub fn delete_body(id: &str) -> Value {
    match id.parse::<i64>() {
        Ok(n) => json!({ "id": n }),
        Err(_) => json!({ "id": id }),
    }
}

/// KV-array row for an anniversary.
pub fn kv_anniversary_row(record: &AnniversaryRecord) -> Value {
    anniversary_body(record)
}

/// KV-array row for a message; the timestamp travels as `date`.
pub fn kv_message_row(record: &MessageRecord) -> Value {
    json!({
        "name": record.name,
        "content": record.content,
        "date": record.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}

/// Id a KV anniversary row normalizes to, if the row is well-formed.
pub fn kv_anniversary_id(row: &Value) -> Option<String> {
    serde_json::from_value::<AnniversaryRow>(row.clone())
        .ok()
        .and_then(|r| r.into_record().ok())
        .map(|r| r.id)
}

/// Id a KV message row normalizes to, if the row is well-formed.
pub fn kv_message_id(row: &Value) -> Option<String> {
    serde_json::from_value::<MessageRow>(row.clone())
        .ok()
        .and_then(|r| r.into_record().ok())
        .map(|r| r.id)
}

/// Body for the KV message delete route: the raw `(name, date, content)` triple.
pub fn kv_message_delete_body(row: &Value) -> Value {
    json!({
        "name": row.get("name").cloned().unwrap_or(Value::Null),
        "date": row.get("date").cloned().unwrap_or(Value::Null),
        "content": row.get("content").cloned().unwrap_or(Value::Null),
    })
}
