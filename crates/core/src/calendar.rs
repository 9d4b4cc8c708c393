// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Day counting for the memorial front page.

use chrono::{Datelike, NaiveDate};

/// Whole days elapsed from `start` to `today`. Negative if `start` is in the future.
pub fn days_together(start: NaiveDate, today: NaiveDate) -> i64 {
    (today - start).num_days()
}

/// The anniversary of `date` that falls in `year`.
///
/// February 29 rolls over to March 1 in non-leap years.
pub fn anniversary_in_year(date: NaiveDate, year: i32) -> Option<NaiveDate> {
    date.with_year(year)
        .or_else(|| NaiveDate::from_ymd_opt(year, 3, 1).filter(|_| is_leap_day(date)))
}

/// Next anniversary of `date` on or after `today`.
pub fn next_occurrence(date: NaiveDate, today: NaiveDate) -> Option<NaiveDate> {
    let this_year = anniversary_in_year(date, today.year())?;
    if this_year >= today {
        Some(this_year)
    } else {
        anniversary_in_year(date, today.year() + 1)
    }
}

/// Days until the next anniversary of `date`; zero on the day itself.
pub fn days_until(date: NaiveDate, today: NaiveDate) -> Option<i64> {
    next_occurrence(date, today).map(|next| (next - today).num_days())
}

/// How many times the anniversary will have come around on its next occurrence.
pub fn years_at_next(date: NaiveDate, today: NaiveDate) -> Option<i32> {
    next_occurrence(date, today).map(|next| next.year() - date.year())
}

fn is_leap_day(date: NaiveDate) -> bool {
    date.month() == 2 && date.day() == 29
}

#[cfg(test)]
#[path = "calendar_tests.rs"]
mod tests;
