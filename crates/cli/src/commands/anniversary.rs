// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use chrono::{Local, NaiveDate};

use mm_core::{DataType, SyncStatus};

use crate::cli::OutputFormat;
use crate::display::format_anniversary_line;
use crate::error::Result;

use super::Context;

pub async fn add(ctx: &Context, name: &str, date: NaiveDate) -> Result<()> {
    let record = ctx.manager.add_anniversary(name, date).await?;
    match record.sync_status {
        SyncStatus::Synced => println!("Added anniversary {}: {}", record.id, record.name),
        _ => println!(
            "Queued anniversary {}: {} (will sync when the backend is reachable)",
            record.id, record.name
        ),
    }
    Ok(())
}

pub async fn list(ctx: &Context, format: OutputFormat) -> Result<()> {
    ctx.ensure_loaded().await?;
    let records = ctx.manager.anniversaries()?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&records)?),
        OutputFormat::Text => {
            let today = Local::now().date_naive();
            for record in &records {
                println!("{}", format_anniversary_line(record, today));
            }
        }
    }
    Ok(())
}

pub async fn remove(ctx: &Context, id: &str) -> Result<()> {
    ctx.manager.delete(DataType::Anniversary, id).await?;
    super::report_delete(ctx, "anniversary", id)
}
