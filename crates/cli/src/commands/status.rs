// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use serde::Serialize;

use mm_core::PendingOperation;

use crate::cli::OutputFormat;
use crate::display::{format_queue_line, format_status};
use crate::error::Result;
use crate::sync::SyncState;

use super::Context;

#[derive(Debug, Serialize)]
struct StatusJson<'a> {
    #[serde(flatten)]
    state: &'a SyncState,
    queued: usize,
    local_store: bool,
    api_base_url: &'a str,
}

pub fn status(ctx: &Context, format: OutputFormat) -> Result<()> {
    let mut state = ctx.manager.state();
    // Retries from earlier runs are only known to the store.
    if let Some(meta) = ctx.manager.stored_meta()? {
        state.retry_count = state.retry_count.max(meta.retry_count);
    }
    let queued = ctx.manager.queue()?.len();
    let has_store = ctx.manager.has_store();

    match format {
        OutputFormat::Json => {
            let json = StatusJson {
                state: &state,
                queued,
                local_store: has_store,
                api_base_url: ctx.remote.base_url(),
            };
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Text => {
            for line in format_status(&state, queued, has_store) {
                println!("{line}");
            }
            println!("Backend: {}", ctx.remote.base_url());
        }
    }
    Ok(())
}

pub fn queue(ctx: &Context, format: OutputFormat) -> Result<()> {
    let ops: Vec<PendingOperation> = ctx.manager.queue()?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&ops)?),
        OutputFormat::Text => {
            if ops.is_empty() {
                println!("Queue is empty");
            }
            for op in &ops {
                println!("{}", format_queue_line(op));
            }
        }
    }
    Ok(())
}
