// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pure digest of a [`Worker`]'s activity record into the compact text the
//! judge is handed alongside a completed task. Deliberately has no side
//! effects and no async dependency on anything, so the scheduler can call it
//! inline before invoking the planner adapter's `judge`.

use std::collections::HashMap;

use fleet_core::{ActivityKind, Worker};

/// Maximum number of distinct file paths/commands called out by name before
/// the summary falls back to "and N more".
const MAX_NAMED_ITEMS: usize = 8;

/// Digest `worker`'s activity into a short multi-line summary: a per-kind
/// tally, followed by the file paths touched (create/edit) and, if present,
/// the worker's own terminal error.
pub fn summarize_activity(worker: &Worker) -> String {
    if worker.activity.is_empty() {
        return "(no recorded activity)".to_string();
    }

    let mut tally: HashMap<ActivityKind, usize> = HashMap::new();
    let mut touched_files: Vec<&str> = Vec::new();
    let mut last_error: Option<&str> = None;

    for entry in &worker.activity {
        *tally.entry(entry.kind).or_insert(0) += 1;
        match entry.kind {
            ActivityKind::FileEdit | ActivityKind::FileCreate => {
                if !touched_files.contains(&entry.summary.as_str()) {
                    touched_files.push(&entry.summary);
                }
            }
            ActivityKind::Error => last_error = Some(&entry.summary),
            _ => {}
        }
    }

    let mut lines = Vec::new();
    lines.push(format!("{} activity entries:", worker.activity.len()));
    for kind in [
        ActivityKind::ToolCall,
        ActivityKind::FileEdit,
        ActivityKind::FileCreate,
        ActivityKind::Bash,
        ActivityKind::Text,
        ActivityKind::Thinking,
        ActivityKind::Error,
    ] {
        if let Some(count) = tally.get(&kind) {
            lines.push(format!("  {count}x {kind}"));
        }
    }

    if !touched_files.is_empty() {
        let shown = touched_files.iter().take(MAX_NAMED_ITEMS).cloned().collect::<Vec<_>>().join(", ");
        let suffix = if touched_files.len() > MAX_NAMED_ITEMS {
            format!(" (+{} more)", touched_files.len() - MAX_NAMED_ITEMS)
        } else {
            String::new()
        };
        lines.push(format!("files touched: {shown}{suffix}"));
    }

    if let Some(error) = last_error {
        lines.push(format!("last error: {error}"));
    }

    lines.join("\n")
}

#[cfg(test)]
#[path = "activity_summary_tests.rs"]
mod tests;
