// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Tracing subscriber setup.

use std::fs;
use std::path::Path;

use tracing_subscriber::EnvFilter;

use crate::env;

/// Filter for one-shot commands when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "warn";

/// Filter for `memoria watch` when `RUST_LOG` is unset.
pub const WATCH_FILTER: &str = "info";

/// Install the global subscriber.
///
/// `RUST_LOG` overrides `default_filter`. Logs go to `log_file` when given
/// and openable, otherwise to stderr.
/// Calling this twice is harmless; the second call does nothing.
pub fn init(default_filter: &str, log_file: Option<&Path>) {
    let filter = env::log_filter()
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(default_filter));

    match log_file.and_then(|path| open_log_file(path).ok()) {
        Some(file) => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(file)
                .with_ansi(false)
                .try_init();
        }
        None => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .try_init();
        }
    }
}

/// Open `path` for appending, creating parent directories.
pub fn open_log_file(path: &Path) -> std::io::Result<fs::File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::OpenOptions::new().create(true).append(true).open(path)
}

#[cfg(test)]
#[path = "logging_tests.rs"]
mod tests;
