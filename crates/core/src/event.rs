// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event: a typed, broadcastable record of run/task/worker/judgement activity.

use serde::{Deserialize, Serialize};

use crate::judgement::{Judgement, JudgementId};
use crate::run::{Run, RunId, RunStatus};
use crate::task::{Task, TaskId};
use crate::worker::{Worker, WorkerId};

/// A broadcast record. Every variant is a fact about one run's lifecycle;
/// payloads are intentionally small (ids and status, not full records) so the
/// event bus stays cheap to fan out — subscribers that want detail query the
/// run manager by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    #[serde(rename = "run:created")]
    RunCreated { run_id: RunId, goal: String },

    #[serde(rename = "run:updated")]
    RunUpdated { run_id: RunId, status: RunStatus },

    #[serde(rename = "run:completed")]
    RunCompleted { run_id: RunId },

    #[serde(rename = "run:failed")]
    RunFailed { run_id: RunId, error: String },

    #[serde(rename = "task:updated")]
    TaskUpdated { run_id: RunId, task_id: TaskId, status: crate::task::TaskStatus },

    #[serde(rename = "worker:created")]
    WorkerCreated { run_id: RunId, worker_id: WorkerId, task_id: TaskId },

    #[serde(rename = "worker:updated")]
    WorkerUpdated { run_id: RunId, worker_id: WorkerId, status: crate::worker::WorkerStatus },

    #[serde(rename = "worker:log")]
    WorkerLog { run_id: RunId, worker_id: WorkerId, line: String },

    #[serde(rename = "judgement:created")]
    JudgementCreated { run_id: RunId, judgement_id: JudgementId, task_id: TaskId, goal_complete: bool },

    #[serde(rename = "log")]
    Log { run_id: Option<RunId>, level: LogLevel, message: String },

    /// Forward-compatibility catch-all: unrecognized events deserialize here
    /// instead of failing, matching the permissive-reader stance taken
    /// throughout this event set.
    #[serde(other, skip_serializing)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl Event {
    pub fn run_created(run: &Run) -> Self {
        Event::RunCreated { run_id: run.id, goal: run.goal.clone() }
    }

    pub fn run_updated(run: &Run) -> Self {
        Event::RunUpdated { run_id: run.id, status: run.status }
    }

    pub fn run_completed(run_id: RunId) -> Self {
        Event::RunCompleted { run_id }
    }

    pub fn run_failed(run_id: RunId, error: impl Into<String>) -> Self {
        Event::RunFailed { run_id, error: error.into() }
    }

    pub fn task_updated(run_id: RunId, task: &Task) -> Self {
        Event::TaskUpdated { run_id, task_id: task.id, status: task.status }
    }

    pub fn worker_created(run_id: RunId, worker: &Worker) -> Self {
        Event::WorkerCreated { run_id, worker_id: worker.id, task_id: worker.task_id }
    }

    pub fn worker_updated(run_id: RunId, worker: &Worker) -> Self {
        Event::WorkerUpdated { run_id, worker_id: worker.id, status: worker.status }
    }

    pub fn worker_log(run_id: RunId, worker_id: WorkerId, line: impl Into<String>) -> Self {
        Event::WorkerLog { run_id, worker_id, line: line.into() }
    }

    pub fn judgement_created(run_id: RunId, judgement: &Judgement) -> Self {
        Event::JudgementCreated {
            run_id,
            judgement_id: judgement.id,
            task_id: judgement.task_id,
            goal_complete: judgement.goal_complete,
        }
    }

    pub fn log(run_id: Option<RunId>, level: LogLevel, message: impl Into<String>) -> Self {
        Event::Log { run_id, level, message: message.into() }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
