// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use std::io::Write;
use tempfile::TempDir;

#[test]
fn test_open_log_file_creates_parents_and_appends() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("logs").join("watch.log");

    let mut first = open_log_file(&path).unwrap();
    writeln!(first, "one").unwrap();
    drop(first);
    let mut second = open_log_file(&path).unwrap();
    writeln!(second, "two").unwrap();
    drop(second);

    assert_eq!(fs::read_to_string(&path).unwrap(), "one\ntwo\n");
}

#[test]
fn test_open_log_file_fails_on_directory() {
    let temp = TempDir::new().unwrap();
    assert!(open_log_file(temp.path()).is_err());
}

#[test]
fn test_init_twice_is_harmless() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("memoria.log");
    init(WATCH_FILTER, Some(&path));
    init(DEFAULT_FILTER, None);
    assert!(path.exists());
}
