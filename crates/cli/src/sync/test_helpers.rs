// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for sync module tests.

#![allow(clippy::unwrap_used)]

use std::sync::{Arc, Mutex};

use chrono::{NaiveDate, TimeZone, Utc};
use tokio::sync::Semaphore;

use mm_core::{AnniversaryRecord, DataType, MessageRecord, SyncStatus};

use super::network::{NetworkProbe, ProbeFuture};
use super::remote::{CreateReceipt, RemoteApi, RemoteError, RemoteFuture};

/// A call the mock remote received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    FetchAnniversaries,
    FetchMessages,
    CreateAnniversary(String),
    CreateMessage(String),
    Delete(DataType, String),
}

#[derive(Default)]
struct MockState {
    anniversaries: Vec<AnniversaryRecord>,
    messages: Vec<MessageRecord>,
    calls: Vec<Call>,
    fail_fetch_anniversaries: bool,
    fail_fetch_messages: bool,
    fail_creates: bool,
    fail_deletes: bool,
    omit_create_ids: bool,
    next_id: u64,
}

/// In-memory backend that records every call.
///
/// Creates are stored as synced rows with sequential numeric ids, so a
/// following fetch returns them the way a relational backend would.
#[derive(Clone, Default)]
pub struct MockRemote {
    state: Arc<Mutex<MockState>>,
    gate: Option<Arc<Semaphore>>,
}

impl MockRemote {
    pub fn new() -> Self {
        let remote = MockRemote::default();
        remote.state.lock().unwrap().next_id = 100;
        remote
    }

    /// Block `fetch_anniversaries` until the returned semaphore gets a permit.
    pub fn gated() -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        let mut remote = MockRemote::new();
        remote.gate = Some(Arc::clone(&gate));
        (remote, gate)
    }

    pub fn with_anniversaries(self, records: Vec<AnniversaryRecord>) -> Self {
        self.state.lock().unwrap().anniversaries = records;
        self
    }

    pub fn with_messages(self, records: Vec<MessageRecord>) -> Self {
        self.state.lock().unwrap().messages = records;
        self
    }

    pub fn set_anniversaries(&self, records: Vec<AnniversaryRecord>) {
        self.state.lock().unwrap().anniversaries = records;
    }

    pub fn fail_fetch_messages(&self, fail: bool) {
        self.state.lock().unwrap().fail_fetch_messages = fail;
    }

    pub fn fail_fetch_anniversaries(&self, fail: bool) {
        self.state.lock().unwrap().fail_fetch_anniversaries = fail;
    }

    pub fn fail_creates(&self, fail: bool) {
        self.state.lock().unwrap().fail_creates = fail;
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.state.lock().unwrap().fail_deletes = fail;
    }

    /// Make creates answer `{success}` with no id.
    pub fn omit_create_ids(&self, omit: bool) {
        self.state.lock().unwrap().omit_create_ids = omit;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    /// Calls other than fetches.
    pub fn writes(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| !matches!(c, Call::FetchAnniversaries | Call::FetchMessages))
            .collect()
    }

    pub fn stored_messages(&self) -> Vec<MessageRecord> {
        self.state.lock().unwrap().messages.clone()
    }

    pub fn stored_anniversaries(&self) -> Vec<AnniversaryRecord> {
        self.state.lock().unwrap().anniversaries.clone()
    }
}

fn server_error(path: &str) -> RemoteError {
    RemoteError::Status {
        url: format!("http://mock{path}"),
        status: 500,
        message: "boom".to_string(),
    }
}

impl RemoteApi for MockRemote {
    fn fetch_anniversaries(&self) -> RemoteFuture<'_, Vec<AnniversaryRecord>> {
        Box::pin(async move {
            if let Some(gate) = &self.gate {
                gate.acquire().await.unwrap().forget();
            }
            let mut state = self.state.lock().unwrap();
            state.calls.push(Call::FetchAnniversaries);
            if state.fail_fetch_anniversaries {
                return Err(server_error("/api/anniversaries"));
            }
            Ok(state.anniversaries.clone())
        })
    }

    fn fetch_messages(&self) -> RemoteFuture<'_, Vec<MessageRecord>> {
        Box::pin(async move {
            let mut state = self.state.lock().unwrap();
            state.calls.push(Call::FetchMessages);
            if state.fail_fetch_messages {
                return Err(server_error("/api/messages"));
            }
            Ok(state.messages.clone())
        })
    }

    fn create_anniversary<'a>(
        &'a self,
        record: &'a AnniversaryRecord,
    ) -> RemoteFuture<'a, CreateReceipt> {
        Box::pin(async move {
            let mut state = self.state.lock().unwrap();
            state.calls.push(Call::CreateAnniversary(record.id.clone()));
            if state.fail_creates {
                return Err(server_error("/api/anniversaries"));
            }
            state.next_id += 1;
            let id = state.next_id.to_string();
            state.anniversaries.push(AnniversaryRecord {
                id: id.clone(),
                sync_status: SyncStatus::Synced,
                ..record.clone()
            });
            let id = (!state.omit_create_ids).then_some(id);
            Ok(CreateReceipt { id })
        })
    }

    fn create_message<'a>(&'a self, record: &'a MessageRecord) -> RemoteFuture<'a, CreateReceipt> {
        Box::pin(async move {
            let mut state = self.state.lock().unwrap();
            state.calls.push(Call::CreateMessage(record.id.clone()));
            if state.fail_creates {
                return Err(server_error("/api/messages"));
            }
            state.next_id += 1;
            let id = state.next_id.to_string();
            state.messages.push(MessageRecord {
                id: id.clone(),
                sync_status: SyncStatus::Synced,
                ..record.clone()
            });
            let id = (!state.omit_create_ids).then_some(id);
            Ok(CreateReceipt { id })
        })
    }

    fn delete_record<'a>(&'a self, data_type: DataType, id: &'a str) -> RemoteFuture<'a, ()> {
        Box::pin(async move {
            let mut state = self.state.lock().unwrap();
            state.calls.push(Call::Delete(data_type, id.to_string()));
            if state.fail_deletes {
                return Err(server_error(&format!("/api/{}", data_type.collection())));
            }
            match data_type {
                DataType::Anniversary => state.anniversaries.retain(|r| r.id != id),
                DataType::Message => state.messages.retain(|r| r.id != id),
            }
            Ok(())
        })
    }
}

/// Probe with a switchable answer.
#[derive(Clone, Default)]
pub struct MockProbe {
    reachable: Arc<Mutex<bool>>,
}

impl MockProbe {
    pub fn new(reachable: bool) -> Self {
        MockProbe {
            reachable: Arc::new(Mutex::new(reachable)),
        }
    }

    pub fn set(&self, reachable: bool) {
        *self.reachable.lock().unwrap() = reachable;
    }
}

impl NetworkProbe for MockProbe {
    fn probe(&self) -> ProbeFuture<'_> {
        Box::pin(async move { *self.reachable.lock().unwrap() })
    }
}

pub fn synced_anniversary(id: &str, name: &str) -> AnniversaryRecord {
    AnniversaryRecord {
        id: id.to_string(),
        name: name.to_string(),
        date: NaiveDate::from_ymd_opt(2023, 4, 17).unwrap(),
        sync_status: SyncStatus::Synced,
    }
}

pub fn synced_message(id: &str, content: &str) -> MessageRecord {
    MessageRecord {
        id: id.to_string(),
        name: "Ana".to_string(),
        content: content.to_string(),
        timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        sync_status: SyncStatus::Synced,
    }
}
