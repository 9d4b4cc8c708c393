// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! SQLite-backed local store for synchronized records.
//!
//! The [`LocalStore`] holds the device's copy of every collection plus the
//! queue of operations still waiting for the backend. Every multi-row write
//! runs inside a single transaction, so a reader never observes half of a
//! batch.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::merge::MergePlan;
use crate::op::{OpPayload, Operation, PendingOperation};
use crate::record::{AnniversaryRecord, DataType, MessageRecord, Record, SyncStatus};

/// SQL schema for the local store.
pub const SCHEMA: &str = r#"
-- Countdown cards; id is the backend id or a tentative tmp- id
CREATE TABLE IF NOT EXISTS anniversaries (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    id TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL CHECK (length(name) > 0),
    date TEXT NOT NULL,
    sync_status TEXT NOT NULL
);

-- Guestbook entries
CREATE TABLE IF NOT EXISTS messages (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    id TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL CHECK (length(name) > 0),
    content TEXT NOT NULL CHECK (length(content) > 0),
    timestamp TEXT NOT NULL,
    sync_status TEXT NOT NULL
);

-- Operations waiting to be replayed against the backend
CREATE TABLE IF NOT EXISTS sync_queue (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    data_type TEXT NOT NULL,
    operation_type TEXT NOT NULL,
    record_id TEXT NOT NULL,
    payload TEXT NOT NULL,
    enqueued_at TEXT NOT NULL
);

-- Sync bookkeeping that outlives a process
CREATE TABLE IF NOT EXISTS sync_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

-- Indexes
CREATE INDEX IF NOT EXISTS idx_anniversaries_date ON anniversaries(date);
CREATE INDEX IF NOT EXISTS idx_anniversaries_status ON anniversaries(sync_status);
CREATE INDEX IF NOT EXISTS idx_messages_timestamp ON messages(timestamp);
CREATE INDEX IF NOT EXISTS idx_messages_status ON messages(sync_status);
CREATE INDEX IF NOT EXISTS idx_sync_queue_record ON sync_queue(data_type, record_id);
"#;

const META_LAST_SYNC: &str = "last_sync_time";
const META_RETRY_COUNT: &str = "retry_count";

/// Parse a string value from the database, returning a rusqlite error on parse failure.
fn parse_db<T: std::str::FromStr>(
    value: &str,
    column: &str,
) -> std::result::Result<T, rusqlite::Error> {
    value.parse().map_err(|_| corrupted(format!("invalid value '{value}' in column '{column}'")))
}

/// Parse an RFC3339 timestamp from the database.
fn parse_timestamp(
    value: &str,
    column: &str,
) -> std::result::Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| corrupted(format!("invalid timestamp '{value}' in column '{column}'")))
}

/// Parse a calendar date from the database.
fn parse_date(value: &str, column: &str) -> std::result::Result<NaiveDate, rusqlite::Error> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| corrupted(format!("invalid date '{value}' in column '{column}'")))
}

fn corrupted(message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        0,
        rusqlite::types::Type::Text,
        Box::new(Error::CorruptedData(message)),
    )
}

/// A record type with a table in the local store.
pub trait StoredRecord: Record {
    /// Table holding this collection.
    const TABLE: &'static str;

    /// Columns selected by [`StoredRecord::from_row`], in order.
    const COLUMNS: &'static str;

    /// Display order of the collection.
    const ORDER_BY: &'static str;

    /// Build a record from a row selected with [`StoredRecord::COLUMNS`].
    fn from_row(row: &Row<'_>) -> std::result::Result<Self, rusqlite::Error>;

    /// Insert the record, or overwrite the row with the same id.
    fn upsert(&self, conn: &Connection) -> rusqlite::Result<usize>;
}

impl StoredRecord for AnniversaryRecord {
    const TABLE: &'static str = "anniversaries";
    const COLUMNS: &'static str = "id, name, date, sync_status";
    const ORDER_BY: &'static str = "date ASC, seq ASC";

    fn from_row(row: &Row<'_>) -> std::result::Result<Self, rusqlite::Error> {
        let date_str: String = row.get(2)?;
        let status_str: String = row.get(3)?;
        Ok(AnniversaryRecord {
            id: row.get(0)?,
            name: row.get(1)?,
            date: parse_date(&date_str, "date")?,
            sync_status: parse_db(&status_str, "sync_status")?,
        })
    }

    fn upsert(&self, conn: &Connection) -> rusqlite::Result<usize> {
        conn.execute(
            "INSERT INTO anniversaries (id, name, date, sync_status)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET
                 name = excluded.name,
                 date = excluded.date,
                 sync_status = excluded.sync_status",
            params![
                self.id,
                self.name,
                self.date.format("%Y-%m-%d").to_string(),
                self.sync_status.as_str(),
            ],
        )
    }
}

impl StoredRecord for MessageRecord {
    const TABLE: &'static str = "messages";
    const COLUMNS: &'static str = "id, name, content, timestamp, sync_status";
    const ORDER_BY: &'static str = "timestamp DESC, seq DESC";

    fn from_row(row: &Row<'_>) -> std::result::Result<Self, rusqlite::Error> {
        let timestamp_str: String = row.get(3)?;
        let status_str: String = row.get(4)?;
        Ok(MessageRecord {
            id: row.get(0)?,
            name: row.get(1)?,
            content: row.get(2)?,
            timestamp: parse_timestamp(&timestamp_str, "timestamp")?,
            sync_status: parse_db(&status_str, "sync_status")?,
        })
    }

    fn upsert(&self, conn: &Connection) -> rusqlite::Result<usize> {
        conn.execute(
            "INSERT INTO messages (id, name, content, timestamp, sync_status)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO UPDATE SET
                 name = excluded.name,
                 content = excluded.content,
                 timestamp = excluded.timestamp,
                 sync_status = excluded.sync_status",
            params![
                self.id,
                self.name,
                self.content,
                self.timestamp.to_rfc3339_opts(SecondsFormat::Nanos, true),
                self.sync_status.as_str(),
            ],
        )
    }
}

/// Sync bookkeeping persisted alongside the records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncMeta {
    pub last_sync_time: Option<DateTime<Utc>>,
    pub retry_count: u32,
}

/// Outcome of replacing a tentative id with the backend's id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdReplacement {
    /// The row now carries the confirmed id.
    Renamed,
    /// A row with the confirmed id already existed; the tentative row was dropped.
    Collapsed,
    /// No row carried the tentative id.
    Missing,
}

/// SQLite connection holding the device's records and sync queue.
pub struct LocalStore {
    conn: Connection,
    /// `None` for in-memory stores.
    path: Option<PathBuf>,
}

impl LocalStore {
    /// Open the store at the given path, creating the schema if needed.
    ///
    /// Any failure to open or initialize the file is reported as
    /// [`Error::StorageUnavailable`].
    pub fn open(path: &Path) -> Result<Self> {
        Self::try_open(path).map_err(|e| Error::StorageUnavailable(format!("{}: {e}", path.display())))
    }

    fn try_open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| Error::StorageUnavailable(e.to_string()))?;
            }
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;",
        )?;
        conn.execute_batch(SCHEMA)?;
        Ok(LocalStore {
            conn,
            path: Some(path.to_path_buf()),
        })
    }

    /// Open an in-memory store (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(LocalStore { conn, path: None })
    }

    /// The database file, if the store lives on disk.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// All records of a collection, in display order.
    pub fn get_all<R: StoredRecord>(&self) -> Result<Vec<R>> {
        let sql = format!(
            "SELECT {} FROM {} ORDER BY {}",
            R::COLUMNS,
            R::TABLE,
            R::ORDER_BY
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let records = stmt
            .query_map([], |row| R::from_row(row))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// Look up one record by id.
    pub fn get<R: StoredRecord>(&self, id: &str) -> Result<Option<R>> {
        let sql = format!("SELECT {} FROM {} WHERE id = ?1", R::COLUMNS, R::TABLE);
        let record = self
            .conn
            .query_row(&sql, params![id], |row| R::from_row(row))
            .optional()?;
        Ok(record)
    }

    /// Check if a record exists in the collection.
    pub fn exists<R: StoredRecord>(&self, id: &str) -> Result<bool> {
        let sql = format!("SELECT COUNT(*) FROM {} WHERE id = ?1", R::TABLE);
        let count: i64 = self.conn.query_row(&sql, params![id], |row| row.get(0))?;
        Ok(count > 0)
    }

    /// Insert or overwrite a batch of records atomically.
    pub fn bulk_upsert<R: StoredRecord>(&mut self, records: &[R]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        for record in records {
            record.upsert(&tx)?;
        }
        tx.commit()?;
        Ok(records.len())
    }

    /// Update the sync status of one record.
    pub fn set_status<R: StoredRecord>(&mut self, id: &str, status: SyncStatus) -> Result<()> {
        let sql = format!("UPDATE {} SET sync_status = ?1 WHERE id = ?2", R::TABLE);
        let affected = self.conn.execute(&sql, params![status.as_str(), id])?;
        if affected == 0 {
            return Err(Error::RecordNotFound(id.to_string()));
        }
        Ok(())
    }

    /// Apply a merge plan as one batch.
    pub fn apply_merge<R: StoredRecord>(&mut self, plan: &MergePlan<R>) -> Result<()> {
        if plan.is_empty() {
            return Ok(());
        }
        let tx = self.conn.transaction()?;
        for record in &plan.upserts {
            record.upsert(&tx)?;
        }
        let sql = format!("DELETE FROM {} WHERE id = ?1", R::TABLE);
        for id in &plan.removals {
            tx.execute(&sql, params![id])?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Store a new local record and the operation that will push it, atomically.
    pub fn insert_with_op<R: StoredRecord>(
        &mut self,
        record: &R,
        op: &Operation,
    ) -> Result<PendingOperation> {
        op.validate()?;
        let tx = self.conn.transaction()?;
        record.upsert(&tx)?;
        let pending = insert_op(&tx, op)?;
        tx.commit()?;
        Ok(pending)
    }

    /// Remove a local record and queue the operation that deletes it remotely, atomically.
    pub fn remove_with_op<R: StoredRecord>(
        &mut self,
        id: &str,
        op: &Operation,
    ) -> Result<PendingOperation> {
        op.validate()?;
        let tx = self.conn.transaction()?;
        let sql = format!("DELETE FROM {} WHERE id = ?1", R::TABLE);
        tx.execute(&sql, params![id])?;
        let pending = insert_op(&tx, op)?;
        tx.commit()?;
        Ok(pending)
    }

    /// Drop a record the backend never saw, along with every queued operation for it.
    ///
    /// Returns the number of queued operations discarded.
    pub fn discard_unconfirmed<R: StoredRecord>(&mut self, id: &str) -> Result<usize> {
        let tx = self.conn.transaction()?;
        let sql = format!("DELETE FROM {} WHERE id = ?1", R::TABLE);
        let removed = tx.execute(&sql, params![id])?;
        if removed == 0 {
            return Err(Error::RecordNotFound(id.to_string()));
        }
        let dropped = tx.execute(
            "DELETE FROM sync_queue WHERE data_type = ?1 AND record_id = ?2",
            params![R::DATA_TYPE.as_str(), id],
        )?;
        tx.commit()?;
        Ok(dropped)
    }

    /// Replace a tentative id with the id the backend assigned.
    ///
    /// The record becomes synced and queued operations that still point at
    /// the tentative id are rewritten. If a row with the confirmed id is
    /// already present (a merge got there first, or the same create was
    /// replayed twice) the tentative row is dropped instead of duplicated.
    pub fn replace_id<R: StoredRecord>(
        &mut self,
        tentative: &str,
        confirmed: &str,
    ) -> Result<IdReplacement> {
        let tx = self.conn.transaction()?;

        let exists_sql = format!("SELECT COUNT(*) FROM {} WHERE id = ?1", R::TABLE);
        let tentative_rows: i64 = tx.query_row(&exists_sql, params![tentative], |row| row.get(0))?;
        if tentative_rows == 0 {
            return Ok(IdReplacement::Missing);
        }
        let confirmed_rows: i64 = tx.query_row(&exists_sql, params![confirmed], |row| row.get(0))?;

        let outcome = if tentative == confirmed {
            let sql = format!("UPDATE {} SET sync_status = ?1 WHERE id = ?2", R::TABLE);
            tx.execute(&sql, params![SyncStatus::Synced.as_str(), confirmed])?;
            IdReplacement::Renamed
        } else if confirmed_rows > 0 {
            let sql = format!("DELETE FROM {} WHERE id = ?1", R::TABLE);
            tx.execute(&sql, params![tentative])?;
            IdReplacement::Collapsed
        } else {
            let sql = format!("UPDATE {} SET id = ?1, sync_status = ?2 WHERE id = ?3", R::TABLE);
            tx.execute(&sql, params![confirmed, SyncStatus::Synced.as_str(), tentative])?;
            IdReplacement::Renamed
        };

        rename_queued(&tx, R::DATA_TYPE, tentative, confirmed)?;
        tx.commit()?;
        Ok(outcome)
    }

    /// Persist an operation in the queue.
    pub fn enqueue(&mut self, op: &Operation) -> Result<PendingOperation> {
        op.validate()?;
        let tx = self.conn.transaction()?;
        let pending = insert_op(&tx, op)?;
        tx.commit()?;
        Ok(pending)
    }

    /// Read all queued operations, oldest first, without removing them.
    pub fn peek_queue(&self) -> Result<Vec<PendingOperation>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, payload, data_type, operation_type, enqueued_at
             FROM sync_queue ORDER BY id",
        )?;
        let ops = stmt
            .query_map([], op_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(ops)
    }

    /// Read and clear the queue in one transaction.
    pub fn drain_queue(&mut self) -> Result<Vec<PendingOperation>> {
        let tx = self.conn.transaction()?;
        let ops = {
            let mut stmt = tx.prepare(
                "SELECT id, payload, data_type, operation_type, enqueued_at
                 FROM sync_queue ORDER BY id",
            )?;
            let rows = stmt.query_map([], op_from_row)?;
            rows.collect::<std::result::Result<Vec<_>, _>>()?
        };
        tx.execute("DELETE FROM sync_queue", [])?;
        tx.commit()?;
        Ok(ops)
    }

    /// Remove the given operations from the queue. Returns how many were removed.
    pub fn remove_ops(&mut self, ids: &[i64]) -> Result<usize> {
        if ids.is_empty() {
            return Ok(0);
        }
        let tx = self.conn.transaction()?;
        let mut removed = 0;
        for id in ids {
            removed += tx.execute("DELETE FROM sync_queue WHERE id = ?1", params![id])?;
        }
        tx.commit()?;
        Ok(removed)
    }

    /// Number of queued operations.
    pub fn queue_len(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM sync_queue", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Load persisted sync bookkeeping.
    pub fn load_meta(&self) -> Result<SyncMeta> {
        let last_sync: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM sync_meta WHERE key = ?1",
                params![META_LAST_SYNC],
                |row| row.get(0),
            )
            .optional()?;
        let retry_count: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM sync_meta WHERE key = ?1",
                params![META_RETRY_COUNT],
                |row| row.get(0),
            )
            .optional()?;

        let last_sync_time = match last_sync {
            Some(s) => Some(
                DateTime::parse_from_rfc3339(&s)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(|_| Error::CorruptedData(format!("invalid last sync time '{s}'")))?,
            ),
            None => None,
        };
        let retry_count = match retry_count {
            Some(s) => s
                .parse()
                .map_err(|_| Error::CorruptedData(format!("invalid retry count '{s}'")))?,
            None => 0,
        };

        Ok(SyncMeta {
            last_sync_time,
            retry_count,
        })
    }

    /// Persist sync bookkeeping.
    pub fn save_meta(&mut self, meta: &SyncMeta) -> Result<()> {
        let tx = self.conn.transaction()?;
        match meta.last_sync_time {
            Some(at) => {
                tx.execute(
                    "INSERT OR REPLACE INTO sync_meta (key, value) VALUES (?1, ?2)",
                    params![META_LAST_SYNC, at.to_rfc3339()],
                )?;
            }
            None => {
                tx.execute("DELETE FROM sync_meta WHERE key = ?1", params![META_LAST_SYNC])?;
            }
        }
        tx.execute(
            "INSERT OR REPLACE INTO sync_meta (key, value) VALUES (?1, ?2)",
            params![META_RETRY_COUNT, meta.retry_count.to_string()],
        )?;
        tx.commit()?;
        Ok(())
    }
}

fn insert_op(tx: &Transaction<'_>, op: &Operation) -> Result<PendingOperation> {
    let enqueued_at = Utc::now();
    tx.execute(
        "INSERT INTO sync_queue (data_type, operation_type, record_id, payload, enqueued_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            op.data_type.as_str(),
            op.operation_type.as_str(),
            op.payload.record_id(),
            serde_json::to_string(&op.payload)?,
            enqueued_at.to_rfc3339_opts(SecondsFormat::Nanos, true),
        ],
    )?;
    Ok(PendingOperation {
        id: tx.last_insert_rowid(),
        data_type: op.data_type,
        operation_type: op.operation_type,
        payload: op.payload.clone(),
        enqueued_at,
    })
}

fn op_from_row(row: &Row<'_>) -> std::result::Result<PendingOperation, rusqlite::Error> {
    let payload_str: String = row.get(1)?;
    let data_type_str: String = row.get(2)?;
    let operation_type_str: String = row.get(3)?;
    let enqueued_str: String = row.get(4)?;
    let payload: OpPayload = serde_json::from_str(&payload_str)
        .map_err(|e| corrupted(format!("invalid queued payload: {e}")))?;

    Ok(PendingOperation {
        id: row.get(0)?,
        data_type: parse_db(&data_type_str, "data_type")?,
        operation_type: parse_db(&operation_type_str, "operation_type")?,
        payload,
        enqueued_at: parse_timestamp(&enqueued_str, "enqueued_at")?,
    })
}

/// Point queued operations for `from` at `to`.
fn rename_queued(tx: &Transaction<'_>, data_type: DataType, from: &str, to: &str) -> Result<()> {
    let queued: Vec<(i64, String)> = {
        let mut stmt =
            tx.prepare("SELECT id, payload FROM sync_queue WHERE data_type = ?1 AND record_id = ?2")?;
        let rows = stmt.query_map(params![data_type.as_str(), from], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })?;
        rows.collect::<std::result::Result<Vec<_>, _>>()?
    };

    for (id, payload_str) in queued {
        let mut payload: OpPayload = serde_json::from_str(&payload_str)?;
        payload.rename(to);
        tx.execute(
            "UPDATE sync_queue SET record_id = ?1, payload = ?2 WHERE id = ?3",
            params![to, serde_json::to_string(&payload)?, id],
        )?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
