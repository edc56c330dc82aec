// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory planner/worker adapters for scheduler and run-manager tests.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use fleet_core::{RunId, Task, TaskId, Worker, WorkerStatus};
use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::planner::{JudgeResult, PlanResult, PlannerAdapter, PlannerAdapterError};
use crate::worker::{SpawnedWorker, WorkerAdapter, WorkerAdapterError, WorkerHandle, WorkerOutcome};

/// One call observed by a fake adapter, recorded for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlannerCall {
    Plan,
    Judge(TaskId),
}

/// One scripted judge response: an immediate result, or a hold that blocks
/// the call until the test releases it — used to land a judge call
/// mid-flight during a pause/stop race.
enum ScriptedJudge {
    Response(Result<JudgeResult, String>),
    Hold,
}

/// Scripted planner: returns queued responses in call order, and records
/// every call it receives.
#[derive(Default)]
pub struct FakePlannerAdapter {
    plan_response: Mutex<Option<Result<PlanResult, String>>>,
    plan_hold: Mutex<bool>,
    pending_plan: Mutex<Option<oneshot::Sender<PlanResult>>>,
    judge_responses: Mutex<VecDeque<ScriptedJudge>>,
    pending_judge: Mutex<Option<oneshot::Sender<JudgeResult>>>,
    calls: Mutex<Vec<PlannerCall>>,
}

impl FakePlannerAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_plan(self, plan: PlanResult) -> Self {
        *self.plan_response.lock() = Some(Ok(plan));
        self
    }

    pub fn with_plan_failure(self, message: impl Into<String>) -> Self {
        *self.plan_response.lock() = Some(Err(message.into()));
        self
    }

    /// The next `plan()` call blocks until [`FakePlannerAdapter::release_held_plan`]
    /// is called, instead of returning `with_plan`'s scripted result.
    pub fn hold_plan(self) -> Self {
        *self.plan_hold.lock() = true;
        self
    }

    /// Resolve the plan call currently blocked on [`FakePlannerAdapter::hold_plan`].
    /// A no-op if nothing is held.
    pub fn release_held_plan(&self, plan: PlanResult) {
        if let Some(tx) = self.pending_plan.lock().take() {
            let _ = tx.send(plan);
        }
    }

    /// Whether a `plan()` call is currently blocked awaiting
    /// [`FakePlannerAdapter::release_held_plan`].
    pub fn plan_is_held(&self) -> bool {
        self.pending_plan.lock().is_some()
    }

    pub fn push_judgement(&self, judgement: JudgeResult) {
        self.judge_responses.lock().push_back(ScriptedJudge::Response(Ok(judgement)));
    }

    pub fn push_judge_failure(&self, message: impl Into<String>) {
        self.judge_responses.lock().push_back(ScriptedJudge::Response(Err(message.into())));
    }

    /// Next `judge()` call blocks until [`FakePlannerAdapter::release_held_judge`]
    /// is called, instead of returning immediately.
    pub fn push_judge_hold(&self) {
        self.judge_responses.lock().push_back(ScriptedJudge::Hold);
    }

    /// Resolve the judge call currently blocked on a held response. A no-op
    /// if nothing is held.
    pub fn release_held_judge(&self, result: JudgeResult) {
        if let Some(tx) = self.pending_judge.lock().take() {
            let _ = tx.send(result);
        }
    }

    pub fn calls(&self) -> Vec<PlannerCall> {
        self.calls.lock().clone()
    }

    /// Whether a `judge()` call is currently blocked awaiting
    /// [`FakePlannerAdapter::release_held_judge`].
    pub fn judge_is_held(&self) -> bool {
        self.pending_judge.lock().is_some()
    }
}

#[async_trait]
impl PlannerAdapter for FakePlannerAdapter {
    async fn plan(&self, _run: &fleet_core::Run) -> Result<PlanResult, PlannerAdapterError> {
        self.calls.lock().push(PlannerCall::Plan);
        if *self.plan_hold.lock() {
            let (tx, rx) = oneshot::channel();
            *self.pending_plan.lock() = Some(tx);
            let plan = rx.await.unwrap_or_else(|_| PlanResult { analysis: String::new(), tasks: Vec::new() });
            return Ok(plan);
        }
        match self.plan_response.lock().take() {
            Some(Ok(plan)) => Ok(plan),
            Some(Err(e)) => Err(PlannerAdapterError::RequestFailed(e)),
            None => Ok(PlanResult { analysis: String::new(), tasks: Vec::new() }),
        }
    }

    async fn judge(&self, _run: &fleet_core::Run, task: &Task, _activity_summary: &str) -> Result<JudgeResult, PlannerAdapterError> {
        self.calls.lock().push(PlannerCall::Judge(task.id));
        let next = self.judge_responses.lock().pop_front();
        match next {
            Some(ScriptedJudge::Response(Ok(j))) => Ok(j),
            Some(ScriptedJudge::Response(Err(e))) => Err(PlannerAdapterError::RequestFailed(e)),
            Some(ScriptedJudge::Hold) => {
                let (tx, rx) = oneshot::channel();
                *self.pending_judge.lock() = Some(tx);
                let result = rx
                    .await
                    .unwrap_or_else(|_| JudgeResult { assessment: "held judge dropped".into(), goal_complete: false, new_tasks: vec![] });
                Ok(result)
            }
            None => Ok(JudgeResult { assessment: "no more scripted judgements".into(), goal_complete: true, new_tasks: Vec::new() }),
        }
    }
}

enum ScriptedOutcome {
    Immediate(WorkerOutcome),
    Held,
}

/// Worker adapter that resolves each spawn either immediately (with a
/// scripted or default outcome) or leaves it "held" until the test calls
/// [`FakeWorkerAdapter::release`] — used to drive parallelism-cap and
/// pause/cancel scenarios deterministically.
pub struct FakeWorkerAdapter {
    outcomes_by_title: Mutex<HashMap<String, ScriptedOutcomeKind>>,
    default_outcome: ScriptedOutcomeKind,
    senders: Mutex<HashMap<fleet_core::WorkerId, (TaskId, oneshot::Sender<WorkerOutcome>)>>,
    cancelled: Mutex<Vec<TaskId>>,
    spawned: Mutex<Vec<TaskId>>,
}

#[derive(Clone)]
enum ScriptedOutcomeKind {
    Completed(String),
    Failed(String),
    Held,
}

impl Default for FakeWorkerAdapter {
    fn default() -> Self {
        Self {
            outcomes_by_title: Mutex::new(HashMap::new()),
            default_outcome: ScriptedOutcomeKind::Completed("ok".to_string()),
            senders: Mutex::new(HashMap::new()),
            cancelled: Mutex::new(Vec::new()),
            spawned: Mutex::new(Vec::new()),
        }
    }
}

impl FakeWorkerAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every spawned worker is held until released (used for S4/S6-style tests).
    pub fn holding() -> Self {
        Self { default_outcome: ScriptedOutcomeKind::Held, ..Self::default() }
    }

    pub fn fail_by_default(message: impl Into<String>) -> Self {
        Self { default_outcome: ScriptedOutcomeKind::Failed(message.into()), ..Self::default() }
    }

    pub fn script_completion(&self, title: impl Into<String>, result: impl Into<String>) {
        self.outcomes_by_title.lock().insert(title.into(), ScriptedOutcomeKind::Completed(result.into()));
    }

    pub fn script_failure(&self, title: impl Into<String>, error: impl Into<String>) {
        self.outcomes_by_title.lock().insert(title.into(), ScriptedOutcomeKind::Failed(error.into()));
    }

    pub fn script_hold(&self, title: impl Into<String>) {
        self.outcomes_by_title.lock().insert(title.into(), ScriptedOutcomeKind::Held);
    }

    /// Resolve a previously held worker for `task_id` with the given outcome.
    pub fn release(&self, task_id: TaskId, outcome: WorkerOutcome) {
        let worker_id = {
            let senders = self.senders.lock();
            senders.iter().find(|(_, (t, _))| *t == task_id).map(|(w, _)| *w)
        };
        if let Some(worker_id) = worker_id {
            if let Some((_, tx)) = self.senders.lock().remove(&worker_id) {
                let _ = tx.send(outcome);
            }
        }
    }

    pub fn is_cancelled(&self, task_id: &TaskId) -> bool {
        self.cancelled.lock().contains(task_id)
    }

    pub fn spawned_task_ids(&self) -> Vec<TaskId> {
        self.spawned.lock().clone()
    }

    pub fn held_count(&self) -> usize {
        self.senders.lock().len()
    }
}

#[async_trait]
impl WorkerAdapter for FakeWorkerAdapter {
    async fn spawn(&self, _run_id: RunId, task: &Task, _target_dir: &str) -> Result<SpawnedWorker, WorkerAdapterError> {
        self.spawned.lock().push(task.id);
        let worker = Worker::new(task.id, 0);
        let handle = WorkerHandle::new(worker.id);
        let (tx, rx) = oneshot::channel();

        let kind = self.outcomes_by_title.lock().get(&task.title).cloned().unwrap_or_else(|| self.default_outcome.clone());

        match kind {
            ScriptedOutcomeKind::Completed(result) => {
                let _ = tx.send(WorkerOutcome::completed(result));
            }
            ScriptedOutcomeKind::Failed(error) => {
                let _ = tx.send(WorkerOutcome::failed(error));
            }
            ScriptedOutcomeKind::Held => {
                self.senders.lock().insert(handle.worker_id, (task.id, tx));
            }
        }

        Ok(SpawnedWorker { worker, handle, done: rx })
    }

    async fn cancel(&self, handle: &WorkerHandle) {
        handle.cancel();
        if let Some((task_id, tx)) = self.senders.lock().remove(&handle.worker_id) {
            let _ = tx.send(WorkerOutcome::failed("cancelled"));
            self.cancelled.lock().push(task_id);
        }
    }
}

#[cfg(test)]
#[path = "fakes_tests.rs"]
mod tests;
