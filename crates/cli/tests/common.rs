// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

// Allow unused items: test helpers are shared across multiple test binaries,
// and not every test file uses every helper.
#![allow(dead_code)]
#![allow(unused_imports)]
#![allow(clippy::unwrap_used)]

use std::path::PathBuf;

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;

pub use predicates::prelude::*;
pub use tempfile::TempDir;

/// A scratch config and database. Commands built from it run offline.
pub struct Env {
    pub temp: TempDir,
}

impl Env {
    pub fn new() -> Self {
        Env::with_config("")
    }

    pub fn with_start_date(date: &str) -> Self {
        Env::with_config(&format!("start_date = \"{date}\"\n"))
    }

    /// Write `extra` after a config that points the database into the temp dir.
    pub fn with_config(extra: &str) -> Self {
        let temp = TempDir::new().unwrap();
        let config = format!(
            "api_base_url = \"http://127.0.0.1:9\"\ndatabase = \"memoria.db\"\n{extra}"
        );
        std::fs::write(temp.path().join("config.toml"), config).unwrap();
        Env { temp }
    }

    pub fn config_path(&self) -> PathBuf {
        self.temp.path().join("config.toml")
    }

    /// `memoria --config <tmp> --offline ...`
    pub fn memoria(&self) -> Command {
        let mut cmd = memoria();
        cmd.arg("--config").arg(self.config_path()).arg("--offline");
        cmd
    }

    pub fn add_anniversary(&self, name: &str, date: &str) -> String {
        let output = self
            .memoria()
            .args(["anniversary", "add", name, date])
            .output()
            .unwrap();
        assert!(output.status.success());
        queued_id(&output.stdout)
    }

    pub fn add_message(&self, name: &str, content: &str) -> String {
        let output = self
            .memoria()
            .args(["message", "add", "--name", name, content])
            .output()
            .unwrap();
        assert!(output.status.success());
        queued_id(&output.stdout)
    }
}

pub fn memoria() -> Command {
    let mut cmd = cargo_bin_cmd!("memoria");
    cmd.env_remove("MEMORIA_CONFIG")
        .env_remove("MEMORIA_STATE_DIR")
        .env_remove("RUST_LOG");
    cmd
}

/// Pull the `tmp-...` id out of a "Queued ..." line.
fn queued_id(stdout: &[u8]) -> String {
    String::from_utf8_lossy(stdout)
        .split_whitespace()
        .find(|s| s.starts_with("tmp-"))
        .unwrap()
        .trim_end_matches(':')
        .to_string()
}
