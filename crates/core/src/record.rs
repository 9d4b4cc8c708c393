// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Record types kept in sync between the device and the backend.
//!
//! Two collections are synchronized: anniversaries (dated countdown cards)
//! and messages (the guestbook wall). Photos are read-only and only ever
//! fetched, so they carry no sync status.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Longest accepted author or anniversary name, in characters.
pub const NAME_MAX_CHARS: usize = 64;

/// Longest accepted message body, in characters.
pub const CONTENT_MAX_CHARS: usize = 2000;

/// Whether the backend has confirmed a local record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// Created locally, not yet confirmed by the backend.
    Pending,
    /// Confirmed by the backend.
    Synced,
    /// The last attempt to push this record failed; it is retried on the next pass.
    Error,
}

impl SyncStatus {
    /// Returns the string representation used in storage and display.
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Pending => "pending",
            SyncStatus::Synced => "synced",
            SyncStatus::Error => "error",
        }
    }

    /// True once the backend holds an authoritative copy.
    pub fn is_confirmed(&self) -> bool {
        *self == SyncStatus::Synced
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SyncStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(SyncStatus::Pending),
            "synced" => Ok(SyncStatus::Synced),
            "error" => Ok(SyncStatus::Error),
            _ => Err(Error::InvalidSyncStatus(s.to_string())),
        }
    }
}

/// The synchronized collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Anniversary,
    Message,
}

impl DataType {
    /// Every synchronized collection, in replay order.
    pub const ALL: [DataType; 2] = [DataType::Anniversary, DataType::Message];

    /// Returns the string representation used in storage and display.
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Anniversary => "anniversary",
            DataType::Message => "message",
        }
    }

    /// Collection name, shared by the local table and the API route.
    pub fn collection(&self) -> &'static str {
        match self {
            DataType::Anniversary => "anniversaries",
            DataType::Message => "messages",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DataType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "anniversary" | "anniversaries" => Ok(DataType::Anniversary),
            "message" | "messages" => Ok(DataType::Message),
            _ => Err(Error::InvalidDataType(s.to_string())),
        }
    }
}

/// Common view over the synchronized record types.
pub trait Record: Clone + fmt::Debug + PartialEq {
    /// Which collection this record belongs to.
    const DATA_TYPE: DataType;

    fn id(&self) -> &str;
    fn set_id(&mut self, id: String);
    fn sync_status(&self) -> SyncStatus;
    fn set_sync_status(&mut self, status: SyncStatus);

    /// Returns a copy marked with the given status.
    fn with_status(&self, status: SyncStatus) -> Self {
        let mut copy = self.clone();
        copy.set_sync_status(status);
        copy
    }

    /// True when the record carries the same payload, ignoring sync status.
    fn same_content(&self, other: &Self) -> bool;
}

/// A dated event shown as a countdown card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnniversaryRecord {
    pub id: String,
    pub name: String,
    pub date: NaiveDate,
    pub sync_status: SyncStatus,
}

impl AnniversaryRecord {
    /// Creates a validated, not yet confirmed anniversary.
    pub fn pending(id: String, name: &str, date: NaiveDate) -> Result<Self> {
        Ok(AnniversaryRecord {
            id,
            name: validate_name(name)?,
            date,
            sync_status: SyncStatus::Pending,
        })
    }
}

impl Record for AnniversaryRecord {
    const DATA_TYPE: DataType = DataType::Anniversary;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn sync_status(&self) -> SyncStatus {
        self.sync_status
    }

    fn set_sync_status(&mut self, status: SyncStatus) {
        self.sync_status = status;
    }

    fn same_content(&self, other: &Self) -> bool {
        self.name == other.name && self.date == other.date
    }
}

/// A guestbook entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub id: String,
    pub name: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub sync_status: SyncStatus,
}

impl MessageRecord {
    /// Creates a validated, not yet confirmed message.
    pub fn pending(id: String, name: &str, content: &str, timestamp: DateTime<Utc>) -> Result<Self> {
        Ok(MessageRecord {
            id,
            name: validate_name(name)?,
            content: validate_content(content)?,
            timestamp,
            sync_status: SyncStatus::Pending,
        })
    }
}

impl Record for MessageRecord {
    const DATA_TYPE: DataType = DataType::Message;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn sync_status(&self) -> SyncStatus {
        self.sync_status
    }

    fn set_sync_status(&mut self, status: SyncStatus) {
        self.sync_status = status;
    }

    fn same_content(&self, other: &Self) -> bool {
        self.name == other.name && self.content == other.content && self.timestamp == other.timestamp
    }
}

/// A gallery entry. Photos are uploaded out of band and only listed here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoRecord {
    pub id: String,
    pub url: String,
    #[serde(default)]
    pub description: String,
    pub uploaded_at: Option<DateTime<Utc>>,
}

/// Trims and checks a display name.
pub fn validate_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::validation("name", "must not be empty"));
    }
    if trimmed.chars().count() > NAME_MAX_CHARS {
        return Err(Error::validation(
            "name",
            format!("must be at most {NAME_MAX_CHARS} characters"),
        ));
    }
    Ok(trimmed.to_string())
}

/// Trims and checks a message body.
pub fn validate_content(content: &str) -> Result<String> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(Error::validation("content", "must not be empty"));
    }
    if trimmed.chars().count() > CONTENT_MAX_CHARS {
        return Err(Error::validation(
            "content",
            format!("must be at most {CONTENT_MAX_CHARS} characters"),
        ));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
#[path = "record_tests.rs"]
mod tests;
