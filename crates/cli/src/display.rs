// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use chrono::{DateTime, Local, NaiveDate, Utc};

use mm_core::calendar::{days_until, years_at_next};
use mm_core::{AnniversaryRecord, MessageRecord, PendingOperation, PhotoRecord, SyncStatus};

use crate::sync::{SyncPhase, SyncState};

/// Maximum line width for wrapped message text (excluding the indent).
const WRAP_WIDTH: usize = 76;

/// Wrap text at word boundaries if it's a single line.
///
/// Multi-line text is returned untouched. Widths count characters, and a
/// word longer than `width` (common in CJK text) is split mid-word.
pub fn wrap_text(content: &str, width: usize) -> String {
    if content.contains('\n') || content.chars().count() <= width {
        return content.to_string();
    }

    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in content.split_whitespace() {
        for chunk in split_long_word(word, width) {
            let chunk_len = chunk.chars().count();
            if current_len == 0 {
                current = chunk;
                current_len = chunk_len;
            } else if current_len + 1 + chunk_len <= width {
                current.push(' ');
                current.push_str(&chunk);
                current_len += 1 + chunk_len;
            } else {
                lines.push(std::mem::take(&mut current));
                current = chunk;
                current_len = chunk_len;
            }
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines.join("\n")
}

fn split_long_word(word: &str, width: usize) -> Vec<String> {
    let chars: Vec<char> = word.chars().collect();
    if chars.len() <= width || width == 0 {
        return vec![word.to_string()];
    }
    chars.chunks(width).map(|c| c.iter().collect()).collect()
}

/// Suffix marking records the backend has not confirmed.
pub fn status_marker(status: SyncStatus) -> &'static str {
    match status {
        SyncStatus::Synced => "",
        SyncStatus::Pending => " (pending)",
        SyncStatus::Error => " (sync failed)",
    }
}

/// "today", "tomorrow", or "in N days".
pub fn relative_days(days: i64) -> String {
    match days {
        0 => "today".to_string(),
        1 => "tomorrow".to_string(),
        n => format!("in {n} days"),
    }
}

/// "1st", "2nd", "3rd", "11th", ...
pub fn ordinal(n: i32) -> String {
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{n}{suffix}")
}

/// One anniversary per line, with a countdown to its next occurrence.
///
/// ```text
/// 2023-04-17  First date  (2nd in 12 days)  [42]
/// ```
pub fn format_anniversary_line(record: &AnniversaryRecord, today: NaiveDate) -> String {
    let countdown = match (days_until(record.date, today), years_at_next(record.date, today)) {
        (Some(days), Some(years)) if years > 0 => {
            format!("  ({} {})", ordinal(years), relative_days(days))
        }
        (Some(days), _) => format!("  ({})", relative_days(days)),
        _ => String::new(),
    };
    format!(
        "{}  {}{}  [{}]{}",
        record.date.format("%Y-%m-%d"),
        record.name,
        countdown,
        record.id,
        status_marker(record.sync_status)
    )
}

/// A message as a header line plus indented, wrapped content.
///
/// ```text
/// 2024-05-01 12:00  Ana  [17]
///     Happy anniversary!
/// ```
pub fn format_message(record: &MessageRecord) -> Vec<String> {
    let mut lines = vec![format!(
        "{}  {}  [{}]{}",
        local_time(&record.timestamp),
        record.name,
        record.id,
        status_marker(record.sync_status)
    )];
    let wrapped = wrap_text(&record.content, WRAP_WIDTH);
    for line in wrapped.lines() {
        lines.push(format!("    {line}"));
    }
    lines
}

pub fn format_photo_line(photo: &PhotoRecord) -> String {
    let uploaded = photo
        .uploaded_at
        .map(|at| local_time(&at))
        .unwrap_or_else(|| "-".to_string());
    if photo.description.is_empty() {
        format!("{uploaded}  {}", photo.url)
    } else {
        format!("{uploaded}  {}  {}", photo.url, photo.description)
    }
}

/// `#3  create message tmp-1a2b3c4d  (queued 2024-05-01 12:00)`
pub fn format_queue_line(op: &PendingOperation) -> String {
    format!(
        "#{}  {} {} {}  (queued {})",
        op.id,
        op.operation_type,
        op.data_type,
        op.record_id(),
        local_time(&op.enqueued_at)
    )
}

/// Multi-line summary for `memoria status`.
pub fn format_status(state: &SyncState, queued: usize, has_store: bool) -> Vec<String> {
    let mut lines = Vec::new();
    lines.push(format!("Status: {}", state.phase));
    if state.phase == SyncPhase::Error {
        if let Some(error) = &state.last_error {
            lines.push(format!("Last error: {error}"));
        }
    }
    lines.push(format!(
        "Last sync: {}",
        state
            .last_sync_time
            .map(|at| local_time(&at))
            .unwrap_or_else(|| "never".to_string())
    ));
    if state.retry_count > 0 {
        lines.push(format!("Retries: {}", state.retry_count));
    }
    if has_store {
        lines.push(format!("Queued operations: {queued}"));
    } else {
        lines.push("Local store: unavailable (remote-only)".to_string());
    }
    lines
}

fn local_time(at: &DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

#[cfg(test)]
#[path = "display_tests.rs"]
mod tests;
