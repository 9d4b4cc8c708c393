// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Periodic sync trigger.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::manager::SyncManager;

/// Default period between passes.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(60);

/// Runs [`SyncManager::sync_all`] on a fixed interval until stopped.
///
/// The first tick fires immediately. Ticks are skipped while offline or
/// while a pass is already running, and the loop ends once the manager has
/// halted after a storage failure.
pub struct SyncScheduler {
    handle: Option<JoinHandle<()>>,
}

impl SyncScheduler {
    /// Spawn the interval loop on the current runtime.
    pub fn start(manager: Arc<SyncManager>, interval: Duration) -> Self {
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(interval_secs = interval.as_secs(), "sync scheduler started");

            loop {
                ticker.tick().await;
                if manager.is_halted() {
                    warn!("local store unavailable; sync scheduler stopping");
                    break;
                }
                if !manager.is_online() {
                    debug!("offline; skipping scheduled sync");
                    continue;
                }
                if manager.is_syncing() {
                    debug!("sync in flight; skipping scheduled sync");
                    continue;
                }
                // Spawned so that stopping the loop never cuts a pass short.
                if let Err(e) = tokio::spawn(manager.sync_all()).await {
                    warn!(error = %e, "scheduled sync task failed");
                }
            }
        });
        SyncScheduler {
            handle: Some(handle),
        }
    }

    /// True while the loop is still running.
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop the loop. A pass already running completes on its own.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            debug!("sync scheduler stopped");
        }
    }
}

impl Drop for SyncScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
