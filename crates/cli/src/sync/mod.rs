// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Client-side synchronization with the memorial backend.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   Manager   │────►│  RemoteApi  │────►│   Backend   │
//! │(SyncManager)│◄────│   (trait)   │◄────│  (HTTP/JSON)│
//! └─────────────┘     └─────────────┘     └─────────────┘
//!    │   ▲     ▲
//!    ▼   │     └──────────────┐
//! ┌─────────────┐     ┌───────┴───────┐
//! │ LocalStore  │     │ Scheduler and │
//! │ (+ queue)   │     │ NetworkMonitor│
//! └─────────────┘     └───────────────┘
//! ```
//!
//! - Writes land in the local store with a queued operation, then a pass
//!   replays the queue and merges the backend's collections back in
//! - Only one pass runs at a time; failed passes retry on a fixed delay
//! - Tentative ids are swapped for backend ids as creates are confirmed
//! - Without a usable store everything goes straight to the backend

mod http;
mod manager;
mod network;
mod remote;
mod scheduler;
mod state;
mod wire;

pub use http::{HttpRemote, DEFAULT_TIMEOUT};
pub use manager::{
    CollectionReport, PassOutcome, PassReport, SyncError, SyncManager, SyncResult, SyncSettings,
};
pub use network::{NetworkMonitor, NetworkProbe, ProbeFuture, TcpProbe, DEFAULT_PROBE_INTERVAL};
pub use remote::{BackendSchema, CreateReceipt, RemoteApi, RemoteError, RemoteFuture, RemoteResult};
pub use scheduler::{SyncScheduler, DEFAULT_INTERVAL};
pub use state::{Listener, ListenerId, SyncEvent, SyncPhase, SyncState};

#[cfg(test)]
mod test_helpers;






#[cfg(test)]
mod wire_tests;
