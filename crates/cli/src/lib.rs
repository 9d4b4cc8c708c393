// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! mmrs - offline-first client library behind the `memoria` CLI.
//!
//! Anniversaries and guestbook messages for the memorial site live in a
//! local SQLite store ([`mm_core::LocalStore`]); changes made without a
//! network are queued and replayed by the [`sync::SyncManager`].
//!
//! # Main Components
//!
//! - [`sync`] - backend client, sync manager, scheduler, connectivity monitor
//! - [`Config`] - user configuration (`config.toml`)
//! - [`Error`] - error type for all CLI operations
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use mmrs::sync::{BackendSchema, HttpRemote, SyncManager, SyncSettings, DEFAULT_TIMEOUT};
//!
//! let remote = HttpRemote::new("https://example.workers.dev", BackendSchema::Relational, DEFAULT_TIMEOUT)?;
//! let store = mm_core::LocalStore::open(Path::new("memoria.db")).ok();
//! let manager = SyncManager::new(Arc::new(remote), store, SyncSettings::default());
//! manager.add_message("Ana", "Happy anniversary!").await?;
//! ```

mod cli;
mod commands;
mod display;
pub mod env;
mod logging;

pub mod config;
pub mod error;
pub mod sync;

pub use cli::{AdminCommand, AnniversaryCommand, Cli, Command, MessageCommand, OutputFormat};
pub use config::Config;
pub use error::{Error, Result};

use clap::CommandFactory;
use clap_complete::generate;

use commands::Context;

/// Execute a parsed command line. This is the main entry point for the
/// binary and a testable way to run commands without process execution.
pub fn run(cli: Cli) -> Result<()> {
    match &cli.command {
        Command::Watch { log_file } => logging::init(logging::WATCH_FILTER, log_file.as_deref()),
        _ => logging::init(logging::DEFAULT_FILTER, None),
    }

    if let Command::Completion { shell } = cli.command {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "memoria", &mut std::io::stdout());
        return Ok(());
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(dispatch(cli))
}

async fn dispatch(cli: Cli) -> Result<()> {
    let Cli {
        config,
        offline,
        command,
    } = cli;
    let config_path = config.as_deref();

    match command {
        Command::Photos { output } => {
            let config = Config::load(config_path)?;
            commands::photos::run(&config, offline, output.format).await
        }
        Command::Admin(cmd) => {
            let config = Config::load(config_path)?;
            match cmd {
                AdminCommand::Login { username, password } => {
                    commands::admin::login(&config, offline, &username, &password).await
                }
                AdminCommand::Verify { token } => {
                    commands::admin::verify(&config, offline, &token).await
                }
            }
        }
        Command::Completion { .. } => Ok(()),
        command => {
            let ctx = Context::load(config_path, offline).await?;
            run_with_context(&ctx, command).await
        }
    }
}

async fn run_with_context(ctx: &Context, command: Command) -> Result<()> {
    match command {
        Command::Days { today, output } => commands::days::run(ctx, today, output.format).await,
        Command::Anniversary(cmd) => match cmd {
            AnniversaryCommand::Add { name, date } => {
                commands::anniversary::add(ctx, &name, date).await
            }
            AnniversaryCommand::List { output } => {
                commands::anniversary::list(ctx, output.format).await
            }
            AnniversaryCommand::Rm { id } => commands::anniversary::remove(ctx, &id).await,
        },
        Command::Message(cmd) => match cmd {
            MessageCommand::Add { name, content } => {
                commands::message::add(ctx, &name, &content).await
            }
            MessageCommand::List { limit, output } => {
                commands::message::list(ctx, limit, output.format).await
            }
            MessageCommand::Rm { id } => commands::message::remove(ctx, &id).await,
        },
        Command::Sync { output } => commands::sync::run(ctx, output.format).await,
        Command::Status { output } => commands::status::status(ctx, output.format),
        Command::Queue { output } => commands::status::queue(ctx, output.format),
        Command::Watch { .. } => commands::watch::run(ctx).await,
        // Handled before a context is built.
        Command::Photos { .. } | Command::Admin(_) | Command::Completion { .. } => Ok(()),
    }
}
