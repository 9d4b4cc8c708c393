// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use crate::cli::OutputFormat;
use crate::config::Config;
use crate::display::format_photo_line;
use crate::error::{Error, Result};

use super::build_remote;

/// Photos are not cached; this always asks the backend.
pub async fn run(config: &Config, offline: bool, format: OutputFormat) -> Result<()> {
    if offline {
        return Err(Error::Offline("photos are not stored locally"));
    }
    let remote = build_remote(config)?;
    let photos = remote.fetch_photos().await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&photos)?),
        OutputFormat::Text => {
            if photos.is_empty() {
                println!("No photos yet");
            }
            for photo in &photos {
                println!("{}", format_photo_line(photo));
            }
        }
    }
    Ok(())
}
