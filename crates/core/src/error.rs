// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for mm-core operations.

use thiserror::Error;

/// All possible errors that can occur in mm-core operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("local store unavailable: {0}\n  hint: the database may be corrupted or the disk full; sync falls back to remote-only")]
    StorageUnavailable(String),

    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("record not found: {0}")]
    RecordNotFound(String),

    #[error("invalid sync status: '{0}'\n  hint: valid statuses are: pending, synced, error")]
    InvalidSyncStatus(String),

    #[error("invalid data type: '{0}'\n  hint: valid types are: anniversary, message")]
    InvalidDataType(String),

    #[error("invalid operation type: '{0}'\n  hint: valid types are: create, update, delete")]
    InvalidOperationType(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("corrupted data: {0}")]
    CorruptedData(String),
}

impl Error {
    /// Builds a validation error for the named input field.
    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Error::Validation {
            field,
            reason: reason.into(),
        }
    }

    /// Returns true if the error means the local store can no longer be trusted.
    ///
    /// Validation and lookup failures are caller mistakes; everything touching
    /// the SQLite file itself is a storage failure.
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            Error::StorageUnavailable(_)
                | Error::Database(_)
                | Error::Json(_)
                | Error::CorruptedData(_)
        )
    }
}

/// A specialized Result type for mm-core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
