// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Judgement: an immutable record of one judge invocation.

use serde::{Deserialize, Serialize};

pub use crate::task::JudgementId;
use crate::task::TaskId;

/// One judge invocation over a single completed task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Judgement {
    pub id: JudgementId,
    pub task_id: TaskId,
    pub assessment: String,
    #[serde(default)]
    pub new_task_ids: Vec<TaskId>,
    pub goal_complete: bool,
    pub at_ms: u64,
}

impl Judgement {
    pub fn new(
        task_id: TaskId,
        assessment: impl Into<String>,
        new_task_ids: Vec<TaskId>,
        goal_complete: bool,
        at_ms: u64,
    ) -> Self {
        Self { id: JudgementId::new(), task_id, assessment: assessment.into(), new_task_ids, goal_complete, at_ms }
    }

    /// A synthetic judgement recorded when the judge call itself fails, so
    /// progress stays visible instead of silently stalling the task.
    pub fn synthetic_error(task_id: TaskId, error: impl std::fmt::Display, at_ms: u64) -> Self {
        Self::new(task_id, format!("Judge error: {error}"), Vec::new(), false, at_ms)
    }
}

#[cfg(any(test, feature = "test-support"))]
crate::builder! {
    pub struct JudgementBuilder => Judgement {
        computed { id: JudgementId = JudgementId::new() }
        set { task_id: TaskId = TaskId::new() }
        into { assessment: String = "looks good" }
        set { new_task_ids: Vec<TaskId> = Vec::new() }
        set { goal_complete: bool = false }
        set { at_ms: u64 = 0 }
    }
}

#[cfg(test)]
#[path = "judgement_tests.rs"]
mod tests;
