// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Foreground sync loop: scheduler plus connectivity monitor until Ctrl-C.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use fs2::FileExt;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::sync::{NetworkMonitor, SyncEvent, SyncScheduler, TcpProbe};

use super::Context;

/// Take the per-database watch lock. Held until the returned file is dropped.
pub fn acquire_lock(lock_path: &Path) -> Result<fs::File> {
    if let Some(parent) = lock_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(lock_path)?;
    file.try_lock_exclusive()
        .map_err(|_| Error::AlreadyWatching(lock_path.display().to_string()))?;
    Ok(file)
}

fn log_event(event: &SyncEvent) {
    match event {
        SyncEvent::Syncing => {}
        SyncEvent::Success { at } => info!(%at, "sync succeeded"),
        SyncEvent::Error { message } => warn!(error = %message, "sync failed"),
        SyncEvent::Offline => warn!("offline; changes will be queued"),
        SyncEvent::IdReassigned {
            data_type,
            tentative,
            confirmed,
        } => info!(%data_type, %tentative, %confirmed, "record confirmed"),
    }
}

pub async fn run(ctx: &Context) -> Result<()> {
    let _lock = match ctx.config.watch_lock_path() {
        Some(path) if ctx.manager.has_store() => Some(acquire_lock(&path)?),
        _ => None,
    };

    let listener = ctx.manager.add_listener(log_event);
    let mut scheduler = SyncScheduler::start(Arc::clone(&ctx.manager), ctx.config.sync_interval());

    let probe = TcpProbe::for_base_url(&ctx.config.api_base_url, ctx.config.request_timeout());
    let mut monitor = match probe {
        Some(probe) => {
            info!(addr = probe.addr(), "monitoring connectivity");
            Some(NetworkMonitor::start(
                Arc::clone(&ctx.manager),
                Arc::new(probe),
                ctx.config.probe_interval(),
            ))
        }
        None => {
            warn!(url = %ctx.config.api_base_url, "cannot probe backend address; connectivity not monitored");
            None
        }
    };

    eprintln!("watching {} (Ctrl-C to stop)", ctx.config.api_base_url);
    tokio::signal::ctrl_c().await?;

    if let Some(monitor) = monitor.as_mut() {
        monitor.stop();
    }
    scheduler.stop();
    ctx.manager.cancel_retry();
    ctx.manager.remove_listener(listener);
    info!("watch stopped");
    Ok(())
}

#[cfg(test)]
#[path = "watch_tests.rs"]
mod tests;
