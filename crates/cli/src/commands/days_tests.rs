// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use mm_core::SyncStatus;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn record(id: &str, name: &str, when: NaiveDate) -> AnniversaryRecord {
    AnniversaryRecord {
        id: id.to_string(),
        name: name.to_string(),
        date: when,
        sync_status: SyncStatus::Synced,
    }
}

#[test]
fn test_upcoming_sorted_by_countdown() {
    let records = vec![
        record("1", "First date", date(2023, 4, 17)),
        record("2", "Trip", date(2023, 12, 24)),
        record("3", "Moved in", date(2024, 3, 1)),
    ];
    let list = upcoming(&records, date(2024, 3, 1));

    let names: Vec<&str> = list.iter().map(|u| u.name.as_str()).collect();
    assert_eq!(names, vec!["Moved in", "First date", "Trip"]);
    assert_eq!(list[0].days_until, 0);
    assert_eq!(list[0].years, 0);
    assert_eq!(list[1].next, date(2024, 4, 17));
    assert_eq!(list[1].years, 1);
}

#[test]
fn test_upcoming_leap_day_in_common_year() {
    let records = vec![record("1", "Leap", date(2024, 2, 29))];
    let list = upcoming(&records, date(2025, 2, 1));
    assert_eq!(list[0].next, date(2025, 3, 1));
    assert_eq!(list[0].days_until, 28);
}

#[test]
fn test_upcoming_ties_break_by_name() {
    let records = vec![
        record("1", "b", date(2023, 5, 1)),
        record("2", "a", date(2022, 5, 1)),
    ];
    let list = upcoming(&records, date(2024, 4, 1));
    assert_eq!(list[0].name, "a");
    assert_eq!(list[0].years, 2);
}
