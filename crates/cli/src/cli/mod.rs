// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

mod args;

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use clap_complete::Shell;

pub use args::{OutputArgs, OutputFormat};

/// Parse a string that must not be empty or whitespace-only.
fn non_empty_string(s: &str) -> Result<String, String> {
    if s.trim().is_empty() {
        Err("cannot be empty".to_string())
    } else {
        Ok(s.to_string())
    }
}

/// Parse a calendar date in `YYYY-MM-DD` form.
pub fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| format!("invalid date '{s}', expected YYYY-MM-DD"))
}

#[derive(Parser)]
#[command(name = "memoria")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Offline-first client for the anniversary memorial site")]
#[command(
    long_about = "Offline-first client for the anniversary memorial site.\n\n\
    Anniversaries and guestbook messages are kept in a local SQLite store; \
    changes made offline are queued and replayed against the backend."
)]
pub struct Cli {
    /// Config file [default: $MEMORIA_CONFIG or <config dir>/memoria/config.toml]
    #[arg(long, global = true, value_name = "path")]
    pub config: Option<PathBuf>,

    /// Do not contact the backend; writes are queued for later
    #[arg(long, global = true)]
    pub offline: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show days together and countdowns to upcoming anniversaries
    #[command(after_help = "\
Examples:
  memoria days                       Count from start_date to today
  memoria days -o json               Output as JSON")]
    Days {
        /// Count as if today were this date
        #[arg(long, value_parser = parse_date, value_name = "YYYY-MM-DD", hide = true)]
        today: Option<NaiveDate>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Manage anniversaries
    #[command(subcommand)]
    Anniversary(AnniversaryCommand),

    /// Manage guestbook messages
    #[command(subcommand)]
    Message(MessageCommand),

    /// List gallery photos (read-only)
    Photos {
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Replay queued changes and refresh from the backend
    Sync {
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Show sync status, last sync time, and queue length
    Status {
        #[command(flatten)]
        output: OutputArgs,
    },

    /// List operations waiting for the backend
    Queue {
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Keep syncing in the foreground until interrupted
    #[command(after_help = "\
Examples:
  memoria watch                         Log to stderr
  memoria watch --log-file memoria.log  Log to a file")]
    Watch {
        /// Write logs here instead of stderr
        #[arg(long, value_name = "path")]
        log_file: Option<PathBuf>,
    },

    /// Site admin helpers
    #[command(subcommand)]
    Admin(AdminCommand),

    /// Generate shell completions
    #[command(
        arg_required_else_help = true,
        after_help = "\
Examples:
  memoria completion bash > ~/.local/share/bash-completion/completions/memoria
  memoria completion zsh > ~/.zfunc/_memoria
  memoria completion fish > ~/.config/fish/completions/memoria.fish"
    )]
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Anniversary commands.
#[derive(Subcommand)]
pub enum AnniversaryCommand {
    /// Add an anniversary
    #[command(
        arg_required_else_help = true,
        after_help = "\
Examples:
  memoria anniversary add \"First date\" 2023-04-17"
    )]
    Add {
        /// What is being remembered
        #[arg(value_parser = non_empty_string)]
        name: String,

        /// Date in YYYY-MM-DD form
        #[arg(value_parser = parse_date)]
        date: NaiveDate,
    },

    /// List anniversaries, earliest first
    List {
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Delete an anniversary
    #[command(arg_required_else_help = true)]
    Rm {
        /// Anniversary id
        id: String,
    },
}

/// Guestbook message commands.
#[derive(Subcommand)]
pub enum MessageCommand {
    /// Leave a message
    #[command(
        arg_required_else_help = true,
        after_help = "\
Examples:
  memoria message add --name Ana \"Happy anniversary!\""
    )]
    Add {
        /// Who the message is from
        #[arg(long, value_parser = non_empty_string)]
        name: String,

        /// Message text
        #[arg(value_parser = non_empty_string)]
        content: String,
    },

    /// List messages, newest first
    List {
        /// Maximum number of messages
        #[arg(short = 'n', long)]
        limit: Option<usize>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Delete a message
    #[command(arg_required_else_help = true)]
    Rm {
        /// Message id
        id: String,
    },
}

/// Admin commands.
#[derive(Subcommand)]
pub enum AdminCommand {
    /// Exchange credentials for a session token and print it
    Login {
        /// Admin user name
        #[arg(long, short)]
        username: String,

        /// Admin password
        #[arg(long, short)]
        password: String,
    },

    /// Check whether a token is still accepted
    #[command(arg_required_else_help = true)]
    Verify {
        /// Token printed by `memoria admin login`
        token: String,
    },
}

#[cfg(test)]
#[path = "../cli_tests/mod.rs"]
mod tests;
