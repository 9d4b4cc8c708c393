// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Admin token helpers. Tokens are printed for the caller and never stored.

use crate::config::Config;
use crate::error::{Error, Result};

use super::build_remote;

pub async fn login(config: &Config, offline: bool, username: &str, password: &str) -> Result<()> {
    if offline {
        return Err(Error::Offline("login needs the backend"));
    }
    let remote = build_remote(config)?;
    let token = remote.login(username, password).await?;
    println!("{token}");
    Ok(())
}

pub async fn verify(config: &Config, offline: bool, token: &str) -> Result<()> {
    if offline {
        return Err(Error::Offline("verify needs the backend"));
    }
    let remote = build_remote(config)?;
    if remote.verify(token).await? {
        println!("token is valid");
        Ok(())
    } else {
        Err(Error::TokenRejected)
    }
}
