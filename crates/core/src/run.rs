// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run: the top-level unit of orchestrated work over a goal and a target directory.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::judgement::Judgement;
use crate::task::Task;
use crate::worker::Worker;

crate::define_id! {
    /// Identifies a [`Run`].
    pub struct RunId("run-");
}

/// Lower bound (inclusive) on [`Run::max_workers`].
pub const MIN_MAX_WORKERS: u32 = 1;
/// Upper bound (inclusive) on [`Run::max_workers`].
pub const MAX_MAX_WORKERS: u32 = 10;
/// Default value of [`Run::max_workers`] when the caller doesn't specify one.
pub const DEFAULT_MAX_WORKERS: u32 = 3;

/// Clamp a requested worker cap into `[MIN_MAX_WORKERS, MAX_MAX_WORKERS]`.
pub fn clamp_max_workers(requested: Option<u32>) -> u32 {
    requested.unwrap_or(DEFAULT_MAX_WORKERS).clamp(MIN_MAX_WORKERS, MAX_MAX_WORKERS)
}

/// Lifecycle status of a [`Run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Idle,
    Planning,
    Executing,
    Judging,
    Paused,
    Completed,
    Failed,
    Stopped,
}

crate::simple_display! {
    RunStatus {
        Idle => "idle",
        Planning => "planning",
        Executing => "executing",
        Judging => "judging",
        Paused => "paused",
        Completed => "completed",
        Failed => "failed",
        Stopped => "stopped",
    }
}

impl RunStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::Failed | RunStatus::Stopped)
    }

    pub fn is_active(self) -> bool {
        matches!(self, RunStatus::Planning | RunStatus::Executing | RunStatus::Judging)
    }
}

/// A requested transition that the current status does not permit.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("cannot {action} a run in status {from}")]
pub struct IllegalTransition {
    pub action: &'static str,
    pub from: RunStatus,
}

/// The top-level unit of orchestrated work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub id: RunId,
    pub goal: String,
    pub target_dir: String,
    pub status: RunStatus,
    #[serde(default)]
    pub analysis: String,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub judgements: Vec<Judgement>,
    #[serde(default)]
    pub workers: Vec<Worker>,
    pub max_workers: u32,
    pub created_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Run {
    pub fn new(
        goal: impl Into<String>,
        target_dir: impl Into<String>,
        max_workers: Option<u32>,
        created_at_ms: u64,
    ) -> Self {
        Self {
            id: RunId::new(),
            goal: goal.into(),
            target_dir: target_dir.into(),
            status: RunStatus::Idle,
            analysis: String::new(),
            tasks: Vec::new(),
            judgements: Vec::new(),
            workers: Vec::new(),
            max_workers: clamp_max_workers(max_workers),
            created_at_ms,
            completed_at_ms: None,
            error: None,
        }
    }

    pub fn task_mut(&mut self, id: &crate::task::TaskId) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| &t.id == id)
    }

    pub fn task(&self, id: &crate::task::TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| &t.id == id)
    }

    pub fn worker_mut(&mut self, id: &crate::worker::WorkerId) -> Option<&mut Worker> {
        self.workers.iter_mut().find(|w| &w.id == id)
    }

    /// `start` is legal only from `idle` or `paused`.
    pub fn can_start(&self) -> Result<(), IllegalTransition> {
        match self.status {
            RunStatus::Idle | RunStatus::Paused => Ok(()),
            from => Err(IllegalTransition { action: "start", from }),
        }
    }

    /// `pause` is legal only while actively running.
    pub fn can_pause(&self) -> Result<(), IllegalTransition> {
        if self.status.is_active() {
            Ok(())
        } else {
            Err(IllegalTransition { action: "pause", from: self.status })
        }
    }

    /// `stop` is legal from any non-terminal state.
    pub fn can_stop(&self) -> Result<(), IllegalTransition> {
        if self.status.is_terminal() {
            Err(IllegalTransition { action: "stop", from: self.status })
        } else {
            Ok(())
        }
    }

    /// `resume` is legal from `paused` or `stopped`.
    pub fn can_resume(&self) -> Result<(), IllegalTransition> {
        match self.status {
            RunStatus::Paused | RunStatus::Stopped => Ok(()),
            from => Err(IllegalTransition { action: "resume", from }),
        }
    }

    /// Reopen a stopped/paused run for another `start`, per §4.2: resuming a
    /// stopped run clears its completion marker and reopens it as paused.
    pub fn reopen_for_resume(&mut self) {
        self.status = RunStatus::Paused;
        self.completed_at_ms = None;
    }

    /// Truncate every worker's persisted logs/activity, as applied before
    /// every snapshot write.
    pub fn truncate_for_persistence(&mut self) {
        for w in &mut self.workers {
            w.truncate_for_persistence();
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
crate::builder! {
    pub struct RunBuilder => Run {
        into { goal: String = "do the thing" }
        into { target_dir: String = "/tmp" }
        set { status: RunStatus = RunStatus::Idle }
        into { analysis: String = "" }
        set { tasks: Vec<Task> = Vec::new() }
        set { judgements: Vec<Judgement> = Vec::new() }
        set { workers: Vec<Worker> = Vec::new() }
        set { max_workers: u32 = DEFAULT_MAX_WORKERS }
        set { created_at_ms: u64 = 0 }
        option { completed_at_ms: u64 = None }
        option { error: String = None }
        computed { id: RunId = RunId::new() }
    }
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;
