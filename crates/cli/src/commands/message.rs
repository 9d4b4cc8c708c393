// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use mm_core::{DataType, SyncStatus};

use crate::cli::OutputFormat;
use crate::display::format_message;
use crate::error::Result;

use super::Context;

pub async fn add(ctx: &Context, name: &str, content: &str) -> Result<()> {
    let record = ctx.manager.add_message(name, content).await?;
    match record.sync_status {
        SyncStatus::Synced => println!("Added message {} from {}", record.id, record.name),
        _ => println!(
            "Queued message {} from {} (will sync when the backend is reachable)",
            record.id, record.name
        ),
    }
    Ok(())
}

pub async fn list(ctx: &Context, limit: Option<usize>, format: OutputFormat) -> Result<()> {
    ctx.ensure_loaded().await?;
    let mut records = ctx.manager.messages()?;
    if let Some(limit) = limit {
        records.truncate(limit);
    }
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&records)?),
        OutputFormat::Text => {
            for (i, record) in records.iter().enumerate() {
                if i > 0 {
                    println!();
                }
                for line in format_message(record) {
                    println!("{line}");
                }
            }
        }
    }
    Ok(())
}

pub async fn remove(ctx: &Context, id: &str) -> Result<()> {
    ctx.manager.delete(DataType::Message, id).await?;
    super::report_delete(ctx, "message", id)
}
