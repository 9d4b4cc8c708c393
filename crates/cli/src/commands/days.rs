// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use chrono::{Local, NaiveDate};
use serde::Serialize;

use mm_core::calendar::{days_together, days_until, next_occurrence, years_at_next};
use mm_core::AnniversaryRecord;

use crate::cli::OutputFormat;
use crate::display::{ordinal, relative_days};
use crate::error::{Error, Result};

use super::Context;

#[derive(Debug, Serialize, PartialEq)]
pub struct Upcoming {
    pub id: String,
    pub name: String,
    pub date: NaiveDate,
    pub next: NaiveDate,
    pub days_until: i64,
    pub years: i32,
}

#[derive(Debug, Serialize)]
struct DaysJson<'a> {
    start_date: NaiveDate,
    today: NaiveDate,
    days_together: i64,
    upcoming: &'a [Upcoming],
}

/// Anniversaries ordered by how soon they come around next.
pub fn upcoming(records: &[AnniversaryRecord], today: NaiveDate) -> Vec<Upcoming> {
    let mut upcoming: Vec<Upcoming> = records
        .iter()
        .filter_map(|record| {
            Some(Upcoming {
                id: record.id.clone(),
                name: record.name.clone(),
                date: record.date,
                next: next_occurrence(record.date, today)?,
                days_until: days_until(record.date, today)?,
                years: years_at_next(record.date, today)?,
            })
        })
        .collect();
    upcoming.sort_by(|a, b| a.days_until.cmp(&b.days_until).then_with(|| a.name.cmp(&b.name)));
    upcoming
}

pub async fn run(ctx: &Context, today: Option<NaiveDate>, format: OutputFormat) -> Result<()> {
    let start = ctx.config.start_date.ok_or(Error::StartDateMissing)?;
    let today = today.unwrap_or_else(|| Local::now().date_naive());

    ctx.ensure_loaded().await?;
    let records = ctx.manager.anniversaries()?;
    let upcoming = upcoming(&records, today);
    let together = days_together(start, today);

    match format {
        OutputFormat::Json => {
            let json = DaysJson {
                start_date: start,
                today,
                days_together: together,
                upcoming: &upcoming,
            };
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Text => {
            println!("Together for {together} days (since {start})");
            if !upcoming.is_empty() {
                println!();
                println!("Upcoming:");
                for item in &upcoming {
                    let label = if item.years > 0 {
                        format!("{} {}", ordinal(item.years), item.name)
                    } else {
                        item.name.clone()
                    };
                    println!("  {}  {label}  {}", item.next, relative_days(item.days_until));
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "days_tests.rs"]
mod tests;
