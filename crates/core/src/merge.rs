// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Reconcile a local collection against the backend's copy.
//!
//! Merge rules, keyed by record id:
//! - Remote only: add locally as synced
//! - Both, local confirmed: remote wins
//! - Both, local unconfirmed (pending or error): local kept untouched
//! - Local only, confirmed: deleted remotely, remove locally
//! - Local only, unconfirmed: kept; it reaches the backend through the queue
//!
//! The backend has no trustworthy clock, so there is no timestamp
//! comparison: once a record is confirmed the server copy is authoritative.

use std::collections::{HashMap, HashSet};

use crate::record::{Record, SyncStatus};

/// Changes to apply to the local collection, as one batch.
#[derive(Debug, Clone, PartialEq)]
pub struct MergePlan<R> {
    /// Records to insert or overwrite, already marked synced.
    pub upserts: Vec<R>,
    /// Ids of confirmed local records the backend no longer has.
    pub removals: Vec<String>,
    /// Unconfirmed local records left alone.
    pub kept_unconfirmed: usize,
    /// Remote rows dropped because an earlier row had the same id.
    pub duplicates_collapsed: usize,
}

impl<R> MergePlan<R> {
    /// True if applying the plan changes nothing.
    pub fn is_empty(&self) -> bool {
        self.upserts.is_empty() && self.removals.is_empty()
    }
}

impl<R> Default for MergePlan<R> {
    fn default() -> Self {
        MergePlan {
            upserts: Vec::new(),
            removals: Vec::new(),
            kept_unconfirmed: 0,
            duplicates_collapsed: 0,
        }
    }
}

/// Plan the merge of `remote` into `local`.
pub fn plan_merge<R: Record>(local: &[R], remote: &[R]) -> MergePlan<R> {
    let mut plan = MergePlan::default();
    let local_by_id: HashMap<&str, &R> = local.iter().map(|r| (r.id(), r)).collect();
    let mut remote_ids: HashSet<&str> = HashSet::new();

    for remote_record in remote {
        if !remote_ids.insert(remote_record.id()) {
            plan.duplicates_collapsed += 1;
            continue;
        }

        let confirmed = remote_record.with_status(SyncStatus::Synced);
        match local_by_id.get(remote_record.id()) {
            None => plan.upserts.push(confirmed),
            Some(local_record) if !local_record.sync_status().is_confirmed() => {
                plan.kept_unconfirmed += 1;
            }
            Some(local_record) => {
                if **local_record != confirmed {
                    plan.upserts.push(confirmed);
                }
            }
        }
    }

    for local_record in local {
        if remote_ids.contains(local_record.id()) {
            continue;
        }
        if local_record.sync_status().is_confirmed() {
            plan.removals.push(local_record.id().to_string());
        } else {
            plan.kept_unconfirmed += 1;
        }
    }

    plan
}

#[cfg(test)]
#[path = "merge_tests.rs"]
mod tests;
