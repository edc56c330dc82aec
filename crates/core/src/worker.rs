// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker: a record of one worker-agent execution driving a single task.

use serde::{Deserialize, Serialize};

use crate::task::TaskId;

crate::define_id! {
    /// Identifies a [`Worker`].
    pub struct WorkerId("wkr-");
}

/// Lifecycle status of a [`Worker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerStatus {
    Running,
    Completed,
    Failed,
}

crate::simple_display! {
    WorkerStatus {
        Running => "running",
        Completed => "completed",
        Failed => "failed",
    }
}

/// The kind of one activity entry emitted by a running worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    ToolCall,
    FileEdit,
    FileCreate,
    Bash,
    Text,
    Error,
    Thinking,
}

crate::simple_display! {
    ActivityKind {
        ToolCall => "tool_call",
        FileEdit => "file_edit",
        FileCreate => "file_create",
        Bash => "bash",
        Text => "text",
        Error => "error",
        Thinking => "thinking",
    }
}

/// One structured record of what a worker did.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub kind: ActivityKind,
    pub summary: String,
    pub at_ms: u64,
}

impl ActivityEntry {
    pub fn new(kind: ActivityKind, summary: impl Into<String>, at_ms: u64) -> Self {
        Self { kind, summary: summary.into(), at_ms }
    }
}

/// Maximum log/activity entries retained per worker once persisted.
/// Older entries are dropped at save time; the in-memory record is unbounded.
pub const MAX_PERSISTED_ENTRIES: usize = 100;

/// One execution of the external worker-agent capability against a task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Worker {
    pub id: WorkerId,
    pub task_id: TaskId,
    pub status: WorkerStatus,
    #[serde(default)]
    pub logs: Vec<String>,
    #[serde(default)]
    pub activity: Vec<ActivityEntry>,
    pub started_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at_ms: Option<u64>,
}

impl Worker {
    pub fn new(task_id: TaskId, started_at_ms: u64) -> Self {
        Self {
            id: WorkerId::new(),
            task_id,
            status: WorkerStatus::Running,
            logs: Vec::new(),
            activity: Vec::new(),
            started_at_ms,
            completed_at_ms: None,
        }
    }

    pub fn push_log(&mut self, line: impl Into<String>) {
        self.logs.push(line.into());
    }

    pub fn push_activity(&mut self, entry: ActivityEntry) {
        self.activity.push(entry);
    }

    pub fn finish(&mut self, status: WorkerStatus, now_ms: u64) {
        self.status = status;
        self.completed_at_ms = Some(now_ms);
    }

    /// Truncate `logs`/`activity` to the most recent [`MAX_PERSISTED_ENTRIES`],
    /// as applied by the run store immediately before writing a snapshot.
    pub fn truncate_for_persistence(&mut self) {
        truncate_tail(&mut self.logs, MAX_PERSISTED_ENTRIES);
        truncate_tail(&mut self.activity, MAX_PERSISTED_ENTRIES);
    }
}

fn truncate_tail<T>(v: &mut Vec<T>, max: usize) {
    if v.len() > max {
        let drop = v.len() - max;
        v.drain(0..drop);
    }
}

#[cfg(any(test, feature = "test-support"))]
crate::builder! {
    pub struct WorkerBuilder => Worker {
        computed { id: WorkerId = WorkerId::new() }
        set { task_id: TaskId = TaskId::new() }
        set { status: WorkerStatus = WorkerStatus::Running }
        set { logs: Vec<String> = Vec::new() }
        set { activity: Vec<ActivityEntry> = Vec::new() }
        set { started_at_ms: u64 = 0 }
        option { completed_at_ms: u64 = None }
    }
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
