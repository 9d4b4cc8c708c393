// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Connectivity monitoring.
//!
//! A [`NetworkProbe`] answers "can we reach the backend right now?". The
//! [`NetworkMonitor`] polls it and feeds transitions into
//! [`SyncManager::set_online`], which marks the manager offline or runs a
//! pass when the network comes back.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::manager::SyncManager;

/// Default period between probes.
pub const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_secs(15);

/// Boxed future returned by [`NetworkProbe::probe`].
pub type ProbeFuture<'a> = Pin<Box<dyn Future<Output = bool> + Send + 'a>>;

/// Reachability check.
pub trait NetworkProbe: Send + Sync {
    fn probe(&self) -> ProbeFuture<'_>;
}

/// Probe that opens a TCP connection to the API host.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    addr: String,
    timeout: Duration,
}

impl TcpProbe {
    pub fn new(addr: impl Into<String>, timeout: Duration) -> Self {
        TcpProbe {
            addr: addr.into(),
            timeout,
        }
    }

    /// Probe the host and port of an `http(s)://` base URL.
    pub fn for_base_url(base_url: &str, timeout: Duration) -> Option<Self> {
        let url = reqwest::Url::parse(base_url).ok()?;
        let host = url.host_str()?;
        let port = url.port_or_known_default()?;
        // IPv6 hosts come back already bracketed.
        Some(TcpProbe::new(format!("{host}:{port}"), timeout))
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }
}

impl NetworkProbe for TcpProbe {
    fn probe(&self) -> ProbeFuture<'_> {
        Box::pin(async move {
            match tokio::time::timeout(self.timeout, TcpStream::connect(&self.addr)).await {
                Ok(Ok(_)) => true,
                Ok(Err(e)) => {
                    debug!(addr = %self.addr, error = %e, "probe failed");
                    false
                }
                Err(_) => {
                    debug!(addr = %self.addr, "probe timed out");
                    false
                }
            }
        })
    }
}

/// Polls a probe and reports transitions to the manager.
pub struct NetworkMonitor {
    handle: Option<JoinHandle<()>>,
}

impl NetworkMonitor {
    /// Spawn the polling loop on the current runtime.
    pub fn start(
        manager: Arc<SyncManager>,
        probe: Arc<dyn NetworkProbe>,
        interval: Duration,
    ) -> Self {
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let reachable = probe.probe().await;
                if reachable != manager.is_online() {
                    info!(online = reachable, "connectivity changed");
                    // Spawned so that stopping the monitor never cuts a pass short.
                    let manager = Arc::clone(&manager);
                    tokio::spawn(async move {
                        manager.set_online(reachable).await;
                    });
                }
            }
        });
        NetworkMonitor {
            handle: Some(handle),
        }
    }

    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for NetworkMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}
