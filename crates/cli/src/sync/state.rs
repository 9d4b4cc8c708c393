// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Sync state machine, events, and the listener registry.
//!
//! ```text
//! idle ──► syncing ──► success
//!             │   ▲
//!             ▼   │ retry
//!           error ┘
//!
//! any ──► offline ──► syncing (on restore)
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use mm_core::DataType;

/// Coarse status shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    Idle,
    Syncing,
    Success,
    Error,
    Offline,
}

impl SyncPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncPhase::Idle => "idle",
            SyncPhase::Syncing => "syncing",
            SyncPhase::Success => "success",
            SyncPhase::Error => "error",
            SyncPhase::Offline => "offline",
        }
    }
}

impl std::fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of asking to start a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Begin {
    Started,
    AlreadySyncing,
    Offline,
}

/// Sync state of one manager.
///
/// `in_flight` is tracked separately from `phase` so that going offline in
/// the middle of a pass still blocks a second pass from starting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncState {
    pub phase: SyncPhase,
    pub last_sync_time: Option<DateTime<Utc>>,
    pub retry_count: u32,
    pub online: bool,
    pub last_error: Option<String>,
    #[serde(skip)]
    in_flight: bool,
}

impl Default for SyncState {
    fn default() -> Self {
        SyncState {
            phase: SyncPhase::Idle,
            last_sync_time: None,
            retry_count: 0,
            online: true,
            last_error: None,
            in_flight: false,
        }
    }
}

impl SyncState {
    /// Restore the last sync time persisted by an earlier process.
    ///
    /// The retry budget always starts fresh.
    pub fn restored(last_sync_time: Option<DateTime<Utc>>) -> Self {
        SyncState {
            last_sync_time,
            ..SyncState::default()
        }
    }

    /// True while a pass is running.
    pub fn is_syncing(&self) -> bool {
        self.in_flight
    }

    /// Claim the single pass slot.
    pub fn try_begin(&mut self) -> Begin {
        if self.in_flight {
            return Begin::AlreadySyncing;
        }
        if !self.online {
            self.phase = SyncPhase::Offline;
            return Begin::Offline;
        }
        self.in_flight = true;
        self.phase = SyncPhase::Syncing;
        Begin::Started
    }

    /// Give the slot back without running a pass.
    pub fn cancel_begin(&mut self, phase: SyncPhase) {
        self.in_flight = false;
        self.phase = phase;
    }

    pub fn finish_success(&mut self, at: DateTime<Utc>) {
        self.in_flight = false;
        self.last_sync_time = Some(at);
        self.retry_count = 0;
        self.last_error = None;
        self.phase = if self.online {
            SyncPhase::Success
        } else {
            SyncPhase::Offline
        };
    }

    pub fn finish_error(&mut self, message: String) {
        self.in_flight = false;
        self.last_error = Some(message);
        self.phase = if self.online {
            SyncPhase::Error
        } else {
            SyncPhase::Offline
        };
    }

    /// Count a retry if the budget allows. Returns the attempt number.
    pub fn next_retry(&mut self, max_retries: u32) -> Option<u32> {
        if self.retry_count >= max_retries {
            return None;
        }
        self.retry_count += 1;
        Some(self.retry_count)
    }

    /// Record a connectivity change. Returns true if it changed anything.
    pub fn set_online(&mut self, online: bool) -> bool {
        if self.online == online {
            return false;
        }
        self.online = online;
        if online {
            if self.phase == SyncPhase::Offline {
                self.phase = SyncPhase::Idle;
            }
        } else {
            self.phase = SyncPhase::Offline;
        }
        true
    }
}

/// Notification delivered to listeners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    Syncing,
    Success {
        at: DateTime<Utc>,
    },
    Error {
        message: String,
    },
    Offline,
    /// A record created offline received its backend id.
    IdReassigned {
        data_type: DataType,
        tentative: String,
        confirmed: String,
    },
}

/// Callback registered with the manager.
pub type Listener = Arc<dyn Fn(&SyncEvent) + Send + Sync>;

/// Handle for removing a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Registered listeners, in registration order.
#[derive(Default)]
pub struct Listeners {
    next_id: u64,
    entries: Vec<(ListenerId, Listener)>,
}

impl Listeners {
    pub fn add(&mut self, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, listener));
        id
    }

    /// Returns false if the id was not registered.
    pub fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry_id, _)| *entry_id != id);
        self.entries.len() != before
    }

    /// Clone the callbacks so they can run without holding the registry lock.
    pub fn snapshot(&self) -> Vec<Listener> {
        self.entries.iter().map(|(_, l)| Arc::clone(l)).collect()
    }
}
