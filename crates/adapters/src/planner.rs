// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The planner adapter: the only seam through which the scheduler talks to
//! the external LLM-backed planning/judging service.

use async_trait::async_trait;
use fleet_core::{Run, Task};
use thiserror::Error;

/// One task as proposed by the planner, before the scheduler resolves its
/// dependency titles into [`fleet_core::TaskId`]s and mints an id of its own.
#[derive(Debug, Clone)]
pub struct PlannedTask {
    pub title: String,
    pub description: String,
    pub priority: Option<i32>,
    pub dependency_titles: Vec<String>,
}

impl PlannedTask {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self { title: title.into(), description: description.into(), priority: None, dependency_titles: Vec::new() }
    }

    pub fn depends_on(mut self, titles: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.dependency_titles = titles.into_iter().map(Into::into).collect();
        self
    }
}

/// Result of an initial plan call.
#[derive(Debug, Clone)]
pub struct PlanResult {
    pub analysis: String,
    pub tasks: Vec<PlannedTask>,
}

/// Result of a judge call against one completed task.
#[derive(Debug, Clone)]
pub struct JudgeResult {
    pub assessment: String,
    pub goal_complete: bool,
    pub new_tasks: Vec<PlannedTask>,
}

#[derive(Debug, Error)]
pub enum PlannerAdapterError {
    #[error("planner request failed: {0}")]
    RequestFailed(String),
    #[error("planner returned an invalid response: {0}")]
    InvalidResponse(String),
}

/// External collaborator that turns a goal into tasks, and a completed task
/// into an assessment plus (optionally) follow-up tasks.
///
/// Neither method is given credentials or a model identifier directly — the
/// adapter implementation owns those, and [`PlannerAdapter::health`] is the
/// only signal the core ever reads back about them.
#[async_trait]
pub trait PlannerAdapter: Send + Sync + 'static {
    async fn plan(&self, run: &Run) -> Result<PlanResult, PlannerAdapterError>;

    /// `activity_summary` is the digest produced by
    /// [`fleet_engine::summarize_activity`] for the worker that ran `task`,
    /// or `"(no recorded activity)"` if none is available.
    async fn judge(&self, run: &Run, task: &Task, activity_summary: &str) -> Result<JudgeResult, PlannerAdapterError>;

    /// Whether the adapter considers itself configured (credentials/model
    /// present). Never interpreted by the core beyond surfacing it.
    async fn health(&self) -> bool {
        true
    }
}
