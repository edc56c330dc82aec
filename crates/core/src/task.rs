// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task: a unit of work inside a [`crate::run::Run`], executed by one worker.

use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Identifies a [`Task`] within its owning run.
    pub struct TaskId("tsk-");
}

crate::define_id! {
    /// Identifies a [`crate::judgement::Judgement`]; re-exported here so
    /// [`Task::spawned_by`] can reference it without a circular module.
    pub struct JudgementId("jdg-");
}

/// Lifecycle status of a [`Task`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    Cancelled,
}

crate::simple_display! {
    TaskStatus {
        Pending => "pending",
        InProgress => "in_progress",
        Completed => "completed",
        Failed => "failed",
        Cancelled => "cancelled",
    }
}

impl TaskStatus {
    /// A status from which no further transition is possible.
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled)
    }
}

/// Default priority assigned to judge-spawned tasks that don't specify one.
pub const DEFAULT_TASK_PRIORITY: i32 = 5;

/// A unit of work inside a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: i32,
    #[serde(default)]
    pub dependencies: Vec<TaskId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker_id: Option<crate::worker::WorkerId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spawned_by: Option<JudgementId>,
    pub created_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at_ms: Option<u64>,
}

impl Task {
    /// A freshly planned task: `pending`, no dependencies resolved yet.
    pub fn new(title: impl Into<String>, description: impl Into<String>, created_at_ms: u64) -> Self {
        Self {
            id: TaskId::new(),
            title: title.into(),
            description: description.into(),
            status: TaskStatus::Pending,
            priority: DEFAULT_TASK_PRIORITY,
            dependencies: Vec::new(),
            worker_id: None,
            result: None,
            error: None,
            spawned_by: None,
            created_at_ms,
            started_at_ms: None,
            completed_at_ms: None,
        }
    }

    /// True when every dependency is present in `completed` and this task is
    /// itself still pending.
    pub fn is_ready(&self, completed: &std::collections::HashSet<TaskId>) -> bool {
        self.status == TaskStatus::Pending && self.dependencies.iter().all(|d| completed.contains(d))
    }

    /// True when at least one dependency resolves to a failed or cancelled task.
    pub fn is_blocked(&self, tasks_by_id: &std::collections::HashMap<TaskId, Task>) -> bool {
        self.dependencies.iter().any(|dep| {
            tasks_by_id
                .get(dep)
                .map(|t| matches!(t.status, TaskStatus::Failed | TaskStatus::Cancelled))
                .unwrap_or(false)
        })
    }

    pub fn start(&mut self, worker_id: crate::worker::WorkerId, now_ms: u64) {
        self.status = TaskStatus::InProgress;
        self.worker_id = Some(worker_id);
        self.started_at_ms = Some(now_ms);
    }

    pub fn complete(&mut self, result: impl Into<String>, now_ms: u64) {
        self.status = TaskStatus::Completed;
        self.result = Some(result.into());
        self.completed_at_ms = Some(now_ms);
    }

    pub fn fail(&mut self, error: impl Into<String>, now_ms: u64) {
        self.status = TaskStatus::Failed;
        self.error = Some(error.into());
        self.completed_at_ms = Some(now_ms);
    }

    pub fn cancel(&mut self, reason: impl Into<String>) {
        self.status = TaskStatus::Cancelled;
        self.error = Some(reason.into());
    }

    /// Roll an in-progress task back to pending, as on pause/stop/reconcile.
    pub fn revert_to_pending(&mut self) {
        self.status = TaskStatus::Pending;
        self.worker_id = None;
        self.started_at_ms = None;
    }
}

#[cfg(any(test, feature = "test-support"))]
crate::builder! {
    pub struct TaskBuilder => Task {
        into { title: String = "untitled task" }
        into { description: String = "" }
        set { status: TaskStatus = TaskStatus::Pending }
        set { priority: i32 = DEFAULT_TASK_PRIORITY }
        set { dependencies: Vec<TaskId> = Vec::new() }
        option { worker_id: crate::worker::WorkerId = None }
        option { result: String = None }
        option { error: String = None }
        option { spawned_by: JudgementId = None }
        set { created_at_ms: u64 = 0 }
        option { started_at_ms: u64 = None }
        option { completed_at_ms: u64 = None }
        computed { id: TaskId = TaskId::new() }
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
