// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! mm-core: Shared library for the memoria sync client
//!
//! This crate provides the record types, the offline operation queue, the
//! SQLite local store, and the merge rules used by the memoria CLI.

pub mod calendar;
pub mod error;
pub mod id;
pub mod merge;
pub mod op;
pub mod record;
pub mod store;

pub use error::{Error, Result};
pub use merge::{plan_merge, MergePlan};
pub use op::{OpPayload, Operation, OperationType, PendingOperation};
pub use record::{AnniversaryRecord, DataType, MessageRecord, PhotoRecord, Record, SyncStatus};
pub use store::{IdReplacement, LocalStore, StoredRecord, SyncMeta};
