// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;

use mm_core::DataType;

use crate::cli::OutputFormat;
use crate::error::{Error, Result};
use crate::sync::{CollectionReport, PassOutcome, SyncEvent};

use super::Context;

#[derive(Debug, Clone, Serialize)]
struct Rename {
    data_type: DataType,
    tentative: String,
    confirmed: String,
}

#[derive(Debug, Serialize)]
struct CollectionJson {
    upserted: usize,
    removed: usize,
    kept_unconfirmed: usize,
}

impl From<CollectionReport> for CollectionJson {
    fn from(report: CollectionReport) -> Self {
        CollectionJson {
            upserted: report.upserted,
            removed: report.removed,
            kept_unconfirmed: report.kept_unconfirmed,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
enum SyncJson {
    Completed {
        replayed: usize,
        anniversaries: CollectionJson,
        messages: CollectionJson,
        renamed: Vec<Rename>,
    },
    AlreadySyncing,
    Offline {
        queued: usize,
    },
}

pub async fn run(ctx: &Context, format: OutputFormat) -> Result<()> {
    let renamed = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&renamed);
    let listener = ctx.manager.add_listener(move |event| {
        if let SyncEvent::IdReassigned {
            data_type,
            tentative,
            confirmed,
        } = event
        {
            sink.lock().unwrap_or_else(PoisonError::into_inner).push(Rename {
                data_type: *data_type,
                tentative: tentative.clone(),
                confirmed: confirmed.clone(),
            });
        }
    });

    let outcome = ctx.manager.sync_all().await;
    ctx.manager.remove_listener(listener);
    let renamed = renamed.lock().unwrap_or_else(PoisonError::into_inner).clone();

    let json = match outcome {
        PassOutcome::Failed { message, .. } => return Err(Error::SyncFailed(message)),
        PassOutcome::Completed(report) => SyncJson::Completed {
            replayed: report.replayed,
            anniversaries: report.anniversaries.into(),
            messages: report.messages.into(),
            renamed,
        },
        PassOutcome::AlreadySyncing => SyncJson::AlreadySyncing,
        PassOutcome::Offline => SyncJson::Offline {
            queued: ctx.manager.queue()?.len(),
        },
    };

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&json)?),
        OutputFormat::Text => print_text(&json),
    }
    Ok(())
}

fn print_text(json: &SyncJson) {
    match json {
        SyncJson::Completed {
            replayed,
            anniversaries,
            messages,
            renamed,
        } => {
            println!("Synced: {replayed} queued change(s) sent");
            println!(
                "  anniversaries: {} updated, {} removed",
                anniversaries.upserted, anniversaries.removed
            );
            println!(
                "  messages: {} updated, {} removed",
                messages.upserted, messages.removed
            );
            for rename in renamed {
                println!(
                    "  {} {} is now {}",
                    rename.data_type, rename.tentative, rename.confirmed
                );
            }
        }
        SyncJson::AlreadySyncing => println!("A sync is already running"),
        SyncJson::Offline { queued } => {
            println!("Offline: nothing sent, {queued} operation(s) queued");
        }
    }
}
