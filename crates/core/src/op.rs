// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Queued mutations awaiting replay against the backend.
//!
//! Every local mutation that could not be confirmed remotely is recorded as
//! an [`Operation`]. Once persisted in the queue it becomes a
//! [`PendingOperation`] with a store-assigned sequence id, and it is removed
//! again only after it has been replayed successfully.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::record::{AnniversaryRecord, DataType, MessageRecord};

/// The kind of mutation being replayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    Create,
    Update,
    Delete,
}

impl OperationType {
    /// Replay order within one collection.
    pub const REPLAY_ORDER: [OperationType; 3] = [
        OperationType::Create,
        OperationType::Update,
        OperationType::Delete,
    ];

    /// Returns the string representation used in storage and display.
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationType::Create => "create",
            OperationType::Update => "update",
            OperationType::Delete => "delete",
        }
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OperationType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "create" => Ok(OperationType::Create),
            "update" => Ok(OperationType::Update),
            "delete" => Ok(OperationType::Delete),
            _ => Err(Error::InvalidOperationType(s.to_string())),
        }
    }
}

/// Data carried by a queued operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OpPayload {
    /// Full anniversary, for creates and updates.
    Anniversary { record: AnniversaryRecord },
    /// Full message, for creates and updates.
    Message { record: MessageRecord },
    /// Only the id is needed to delete.
    Remove { id: String },
}

impl OpPayload {
    /// Returns the id of the record this payload refers to.
    pub fn record_id(&self) -> &str {
        match self {
            OpPayload::Anniversary { record } => &record.id,
            OpPayload::Message { record } => &record.id,
            OpPayload::Remove { id } => id,
        }
    }

    /// Points the payload at a new record id.
    pub fn rename(&mut self, new_id: &str) {
        match self {
            OpPayload::Anniversary { record } => record.id = new_id.to_string(),
            OpPayload::Message { record } => record.id = new_id.to_string(),
            OpPayload::Remove { id } => *id = new_id.to_string(),
        }
    }
}

/// A mutation that has not been persisted to the queue yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    pub data_type: DataType,
    pub operation_type: OperationType,
    pub payload: OpPayload,
}

impl Operation {
    /// Creates a queued anniversary create.
    pub fn create_anniversary(record: AnniversaryRecord) -> Self {
        Operation {
            data_type: DataType::Anniversary,
            operation_type: OperationType::Create,
            payload: OpPayload::Anniversary { record },
        }
    }

    /// Creates a queued message create.
    pub fn create_message(record: MessageRecord) -> Self {
        Operation {
            data_type: DataType::Message,
            operation_type: OperationType::Create,
            payload: OpPayload::Message { record },
        }
    }

    /// Creates a queued anniversary update.
    pub fn update_anniversary(record: AnniversaryRecord) -> Self {
        Operation {
            data_type: DataType::Anniversary,
            operation_type: OperationType::Update,
            payload: OpPayload::Anniversary { record },
        }
    }

    /// Creates a queued message update.
    pub fn update_message(record: MessageRecord) -> Self {
        Operation {
            data_type: DataType::Message,
            operation_type: OperationType::Update,
            payload: OpPayload::Message { record },
        }
    }

    /// Creates a queued delete.
    pub fn delete(data_type: DataType, id: impl Into<String>) -> Self {
        Operation {
            data_type,
            operation_type: OperationType::Delete,
            payload: OpPayload::Remove { id: id.into() },
        }
    }

    /// Checks that the payload matches the declared data and operation types.
    pub fn validate(&self) -> Result<()> {
        let consistent = match (&self.payload, self.operation_type) {
            (OpPayload::Remove { id }, OperationType::Delete) => !id.is_empty(),
            (OpPayload::Remove { .. }, _) | (_, OperationType::Delete) => false,
            (OpPayload::Anniversary { .. }, _) => self.data_type == DataType::Anniversary,
            (OpPayload::Message { .. }, _) => self.data_type == DataType::Message,
        };
        if consistent {
            Ok(())
        } else {
            Err(Error::validation(
                "operation",
                format!(
                    "{} {} does not match its payload",
                    self.operation_type, self.data_type
                ),
            ))
        }
    }
}

/// An operation persisted in the sync queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingOperation {
    /// Queue sequence id, assigned by the store.
    pub id: i64,
    pub data_type: DataType,
    pub operation_type: OperationType,
    pub payload: OpPayload,
    pub enqueued_at: DateTime<Utc>,
}

impl PendingOperation {
    /// Returns the id of the record this operation refers to.
    pub fn record_id(&self) -> &str {
        self.payload.record_id()
    }
}

#[cfg(test)]
#[path = "op_tests.rs"]
mod tests;
