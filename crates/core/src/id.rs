// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Record identifiers that do not come from the backend.
//!
//! Records created on the device get a tentative id until the backend
//! confirms them. Rows from the key-value backend carry no id at all, so a
//! stable one is derived from their content.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

/// Prefix marking an id the backend has never seen.
pub const TENTATIVE_PREFIX: &str = "tmp-";

/// Prefix marking an id derived from row content.
pub const DERIVED_PREFIX: &str = "kv-";

/// Generate a tentative id from a seed and creation time.
/// Format: tmp-{hash} where hash is first 8 hex chars of SHA256(seed + timestamp)
pub fn tentative_id(seed: &str, created_at: &DateTime<Utc>) -> String {
    let input = format!("{}{}", seed, created_at.to_rfc3339());
    let hash = Sha256::digest(input.as_bytes());
    format!("{}{}", TENTATIVE_PREFIX, hex::encode(&hash[..4]))
}

/// Generate a unique tentative id, handling collisions by appending an incrementing suffix.
pub fn generate_tentative_id<F>(seed: &str, created_at: &DateTime<Utc>, exists: F) -> String
where
    F: Fn(&str) -> bool,
{
    let base_id = tentative_id(seed, created_at);

    if !exists(&base_id) {
        return base_id;
    }

    let mut suffix = 2;
    loop {
        let id = format!("{}-{}", base_id, suffix);
        if !exists(&id) {
            return id;
        }
        suffix += 1;
    }
}

/// True if the backend never assigned this id.
pub fn is_tentative(id: &str) -> bool {
    id.starts_with(TENTATIVE_PREFIX)
}

/// Derive a stable id from the fields that identify a row.
///
/// Fields are length-prefixed before hashing so that ("ab", "c") and
/// ("a", "bc") do not collide.
pub fn derived_id(fields: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for field in fields {
        hasher.update((field.len() as u64).to_le_bytes());
        hasher.update(field.as_bytes());
    }
    let hash = hasher.finalize();
    format!("{}{}", DERIVED_PREFIX, hex::encode(&hash[..6]))
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
