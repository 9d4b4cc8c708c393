// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Remote API abstraction.
//!
//! Provides a trait-based seam over the backend so that:
//! - The reqwest client talks to the real HTTP API
//! - A mock remote stands in for it in unit tests
//!
//! Implementations perform exactly one request per call and never retry;
//! retrying is the sync manager's job.

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use mm_core::{AnniversaryRecord, DataType, MessageRecord};

/// Error type for remote operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    /// The request never got a response.
    #[error("network error for {url}: {message}")]
    Network { url: String, message: String },

    /// No response within the request timeout.
    #[error("request to {url} timed out")]
    Timeout { url: String },

    /// The backend answered with a non-2xx status.
    #[error("{url} returned {status}: {message}")]
    Status {
        url: String,
        status: u16,
        message: String,
    },

    /// The response body was not the JSON we expected.
    #[error("malformed response from {url}: {message}")]
    Decode { url: String, message: String },
}

/// Result type for remote operations.
pub type RemoteResult<T> = Result<T, RemoteError>;

/// Boxed future returned by [`RemoteApi`] methods.
pub type RemoteFuture<'a, T> = Pin<Box<dyn Future<Output = RemoteResult<T>> + Send + 'a>>;

/// What the backend reported for a successful create.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateReceipt {
    /// Confirmed id, when the backend returns one.
    pub id: Option<String>,
}

/// Shape of the rows the backend stores.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendSchema {
    /// One row per record with a server-assigned id.
    #[default]
    Relational,
    /// Whole collections stored as JSON arrays without ids.
    KvArray,
}

impl BackendSchema {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendSchema::Relational => "relational",
            BackendSchema::KvArray => "kv-array",
        }
    }
}

/// CRUD access to the synchronized collections.
pub trait RemoteApi: Send + Sync {
    /// Fetch every anniversary the backend holds.
    fn fetch_anniversaries(&self) -> RemoteFuture<'_, Vec<AnniversaryRecord>>;

    /// Fetch every message the backend holds.
    fn fetch_messages(&self) -> RemoteFuture<'_, Vec<MessageRecord>>;

    /// Create an anniversary.
    fn create_anniversary<'a>(
        &'a self,
        record: &'a AnniversaryRecord,
    ) -> RemoteFuture<'a, CreateReceipt>;

    /// Create a message.
    fn create_message<'a>(&'a self, record: &'a MessageRecord) -> RemoteFuture<'a, CreateReceipt>;

    /// Delete a record by id. A record that is already gone counts as deleted.
    fn delete_record<'a>(&'a self, data_type: DataType, id: &'a str) -> RemoteFuture<'a, ()>;
}
