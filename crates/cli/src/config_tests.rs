// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use tempfile::TempDir;
use yare::parameterized;

#[test]
fn test_defaults() {
    let config = Config::default();
    assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
    assert_eq!(config.schema, BackendSchema::Relational);
    assert_eq!(config.sync_interval(), Duration::from_secs(60));
    assert_eq!(config.request_timeout(), Duration::from_secs(10));
    assert_eq!(config.probe_interval(), Duration::from_secs(15));
    assert_eq!(
        config.sync_settings(),
        SyncSettings {
            retry_interval: Duration::from_secs(30),
            max_retries: 5,
        }
    );
    assert!(config.validate().is_ok());
}

#[test]
fn test_empty_file_is_defaults() {
    assert_eq!(Config::parse("").unwrap(), Config::default());
}

#[test]
fn test_parse_full_file() {
    let config = Config::parse(
        r#"
api_base_url = "https://memorial.example.workers.dev"
schema = "kv-array"
start_date = "2023-04-17"
sync_interval_secs = 120
retry_interval_secs = 5
max_retries = 2
request_timeout_secs = 3
probe_interval_secs = 30
database = "/var/lib/memoria/db.sqlite"
"#,
    )
    .unwrap();

    assert_eq!(config.api_base_url, "https://memorial.example.workers.dev");
    assert_eq!(config.schema, BackendSchema::KvArray);
    assert_eq!(config.start_date, NaiveDate::from_ymd_opt(2023, 4, 17));
    assert_eq!(config.sync_interval(), Duration::from_secs(120));
    assert_eq!(config.sync_settings().max_retries, 2);
    assert_eq!(config.sync_settings().retry_interval, Duration::from_secs(5));
    assert_eq!(
        config.database_path(),
        Some(PathBuf::from("/var/lib/memoria/db.sqlite"))
    );
    assert_eq!(
        config.watch_lock_path(),
        Some(PathBuf::from("/var/lib/memoria/watch.lock"))
    );
}

#[test]
fn test_unknown_field_rejected() {
    let err = Config::parse("api_url = \"http://x\"").unwrap_err();
    assert!(err.to_string().contains("api_url"));
}

#[parameterized(
    ftp = { "api_base_url = \"ftp://example.com\"", "http or https" },
    garbage = { "api_base_url = \"not a url\"", "invalid api_base_url" },
    zero_interval = { "sync_interval_secs = 0", "sync_interval_secs" },
    zero_timeout = { "request_timeout_secs = 0", "request_timeout_secs" },
    zero_probe = { "probe_interval_secs = 0", "probe_interval_secs" },
    bad_schema = { "schema = \"graph\"", "graph" },
    bad_date = { "start_date = \"17/04/2023\"", "start_date" },
)]
fn test_invalid_values(toml: &str, needle: &str) {
    let err = Config::parse(toml).unwrap_err();
    assert!(err.to_string().contains(needle), "{err}");
}

#[test]
fn test_load_explicit_missing_file_fails() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("nope.toml");
    let err = Config::load(Some(&path)).unwrap_err();
    assert!(err.to_string().contains("not found"));
}

#[test]
fn test_load_resolves_relative_database() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.toml");
    fs::write(&path, "database = \"data/memoria.db\"\n").unwrap();

    let config = Config::load(Some(&path)).unwrap();
    assert_eq!(
        config.database_path(),
        Some(temp.path().join("data").join("memoria.db"))
    );
}

#[test]
fn test_load_reports_parse_errors() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.toml");
    fs::write(&path, "max_retries = \"many\"\n").unwrap();

    let err = Config::load(Some(&path)).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[test]
fn test_explicit_path_wins() {
    let path = PathBuf::from("/etc/memoria.toml");
    assert_eq!(config_path(Some(&path)), Some(path));
}
