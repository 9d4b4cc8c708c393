// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

use crate::sync::{RemoteError, SyncError};

/// All errors the memoria CLI can report.
///
/// Messages are meant for the terminal and carry hints for common mistakes.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] mm_core::Error),

    #[error("{0}\n  hint: check api_base_url in the config file and your network")]
    Remote(#[from] RemoteError),

    #[error("offline: {0}\n  hint: drop --offline or wait for the network to come back")]
    Offline(&'static str),

    #[error("config error: {0}")]
    Config(String),

    #[error("start_date is not set\n  hint: add start_date = \"YYYY-MM-DD\" to the config file")]
    StartDateMissing,

    #[error("already watching: another memoria watch holds {0}")]
    AlreadyWatching(String),

    #[error("sync failed: {0}\n  hint: queued changes are kept; run 'memoria sync' again later")]
    SyncFailed(String),

    #[error("token rejected\n  hint: run 'memoria admin login' for a fresh token")]
    TokenRejected,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for memoria CLI operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<SyncError> for Error {
    fn from(e: SyncError) -> Self {
        match e {
            SyncError::Core(e) => Error::Core(e),
            SyncError::Remote(e) => Error::Remote(e),
            SyncError::Offline => Error::Offline("write rejected without a local store"),
        }
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
