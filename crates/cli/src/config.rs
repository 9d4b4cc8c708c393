// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! User configuration.
//!
//! Configuration is a flat TOML file looked up at `--config <path>`, then
//! `$MEMORIA_CONFIG`, then `<config_dir>/memoria/config.toml`. A missing
//! file means defaults; a file that exists but does not parse is an error.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::env;
use crate::error::{Error, Result};
use crate::sync::{BackendSchema, SyncSettings};

const APP_DIR_NAME: &str = "memoria";
const CONFIG_FILE_NAME: &str = "config.toml";
const DB_FILE_NAME: &str = "memoria.db";
const WATCH_LOCK_NAME: &str = "watch.lock";

/// Worker address used when nothing is configured.
pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8787";

/// Settings read from `config.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Base URL of the memorial backend, `http://` or `https://`.
    pub api_base_url: String,
    /// Row layout the backend uses.
    pub schema: BackendSchema,
    /// Day the couple got together; needed by `memoria days`.
    pub start_date: Option<NaiveDate>,
    pub sync_interval_secs: u64,
    pub retry_interval_secs: u64,
    pub max_retries: u32,
    pub request_timeout_secs: u64,
    pub probe_interval_secs: u64,
    /// SQLite file; relative paths resolve against the config file's directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            schema: BackendSchema::default(),
            start_date: None,
            sync_interval_secs: 60,
            retry_interval_secs: 30,
            max_retries: 5,
            request_timeout_secs: 10,
            probe_interval_secs: 15,
            database: None,
        }
    }
}

impl Config {
    /// Load the configuration, falling back to defaults when no file exists.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let Some(path) = config_path(explicit) else {
            return Ok(Config::default());
        };
        if !path.exists() {
            // An explicitly named file must exist.
            if explicit.is_some() {
                return Err(Error::Config(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            return Ok(Config::default());
        }

        let content = fs::read_to_string(&path)
            .map_err(|e| Error::Config(format!("failed to read {}: {}", path.display(), e)))?;
        let mut config = Config::parse(&content)?;
        if let (Some(database), Some(dir)) = (&config.database, path.parent()) {
            if database.is_relative() {
                config.database = Some(dir.join(database));
            }
        }
        Ok(config)
    }

    /// Parse and validate TOML text.
    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that would otherwise fail later and less clearly.
    pub fn validate(&self) -> Result<()> {
        let url = reqwest::Url::parse(&self.api_base_url).map_err(|e| {
            Error::Config(format!("invalid api_base_url '{}': {}", self.api_base_url, e))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "api_base_url must use http or https, got '{}'",
                url.scheme()
            )));
        }
        for (field, value) in [
            ("sync_interval_secs", self.sync_interval_secs),
            ("request_timeout_secs", self.request_timeout_secs),
            ("probe_interval_secs", self.probe_interval_secs),
        ] {
            if value == 0 {
                return Err(Error::Config(format!("{field} must be greater than zero")));
            }
        }
        Ok(())
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs)
    }

    pub fn probe_interval(&self) -> Duration {
        Duration::from_secs(self.probe_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Retry policy for the sync manager.
    pub fn sync_settings(&self) -> SyncSettings {
        SyncSettings {
            retry_interval: Duration::from_secs(self.retry_interval_secs),
            max_retries: self.max_retries,
        }
    }

    /// Where the local store lives. `None` if no data directory is known.
    pub fn database_path(&self) -> Option<PathBuf> {
        match &self.database {
            Some(path) => Some(path.clone()),
            None => state_dir().map(|dir| dir.join(DB_FILE_NAME)),
        }
    }

    /// Lock file that keeps a single `memoria watch` per database.
    pub fn watch_lock_path(&self) -> Option<PathBuf> {
        let db = self.database_path()?;
        let dir = db.parent()?;
        Some(dir.join(WATCH_LOCK_NAME))
    }
}

/// Resolve which config file to read.
pub fn config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Some(path) = env::config_path() {
        return Some(path);
    }
    dirs::config_dir().map(|dir| dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Directory for the database and lock files.
///
/// `$MEMORIA_STATE_DIR` wins over the platform data directory.
pub fn state_dir() -> Option<PathBuf> {
    env::state_dir().or_else(|| dirs::data_dir().map(|dir| dir.join(APP_DIR_NAME)))
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
