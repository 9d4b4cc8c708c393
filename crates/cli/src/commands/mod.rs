// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

pub mod admin;
pub mod anniversary;
pub mod days;
pub mod message;
pub mod photos;
pub mod status;
pub mod sync;
pub mod watch;

use std::path::Path;
use std::sync::Arc;

use tracing::warn;

use mm_core::{LocalStore, OperationType};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::sync::{HttpRemote, PassOutcome, SyncManager};

/// Build the HTTP client for the configured backend.
pub fn build_remote(config: &Config) -> Result<Arc<HttpRemote>> {
    let remote = HttpRemote::new(&config.api_base_url, config.schema, config.request_timeout())?;
    Ok(Arc::new(remote))
}

/// Open the local store, or `None` to run remote-only.
///
/// A store that cannot be opened is reported and skipped rather than
/// failing the command.
pub fn open_store(config: &Config) -> Option<LocalStore> {
    let Some(path) = config.database_path() else {
        eprintln!("warning: no data directory found; continuing without a local store");
        return None;
    };
    match LocalStore::open(&path) {
        Ok(store) => Some(store),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "local store unavailable");
            eprintln!("warning: {e}; continuing without a local store");
            None
        }
    }
}

/// Everything a sync-backed command needs.
pub struct Context {
    pub config: Config,
    pub remote: Arc<HttpRemote>,
    pub manager: Arc<SyncManager>,
}

impl Context {
    /// Load config, open the store, and build the manager.
    pub async fn open(config: Config, offline: bool) -> Result<Self> {
        let remote = build_remote(&config)?;
        let store = open_store(&config);
        let manager = SyncManager::new(remote.clone(), store, config.sync_settings());
        if offline {
            manager.set_online(false).await;
        }
        Ok(Context {
            config,
            remote,
            manager,
        })
    }

    /// Load the config at `path` and open a context.
    pub async fn load(path: Option<&Path>, offline: bool) -> Result<Self> {
        let config = Config::load(path)?;
        Context::open(config, offline).await
    }

    /// Fetch from the backend when there is no local copy to read.
    ///
    /// With a local store this does nothing: list commands show what is
    /// stored and `memoria sync` refreshes it.
    pub async fn ensure_loaded(&self) -> Result<()> {
        if self.manager.has_store() || !self.manager.is_online() {
            return Ok(());
        }
        match self.manager.sync_all().await {
            PassOutcome::Failed { message, .. } => Err(Error::SyncFailed(message)),
            _ => Ok(()),
        }
    }
}

/// Tell the user whether a delete reached the backend or is still queued.
fn report_delete(ctx: &Context, kind: &str, id: &str) -> Result<()> {
    let queued = ctx
        .manager
        .queue()?
        .iter()
        .any(|op| op.operation_type == OperationType::Delete && op.record_id() == id);
    if queued {
        println!("Queued deletion of {kind} {id}");
    } else {
        println!("Deleted {kind} {id}");
    }
    Ok(())
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
