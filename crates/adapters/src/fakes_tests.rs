// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::planner::PlannedTask;
use fleet_core::{Run, Task, WorkerStatus};

fn run() -> Run {
    Run::builder().build()
}

#[tokio::test]
async fn fake_planner_returns_scripted_plan() {
    let planner = FakePlannerAdapter::new().with_plan(PlanResult {
        analysis: "analysis text".into(),
        tasks: vec![PlannedTask::new("T1", "do thing")],
    });
    let result = planner.plan(&run()).await.expect("plan");
    assert_eq!(result.analysis, "analysis text");
    assert_eq!(result.tasks.len(), 1);
    assert_eq!(planner.calls(), vec![PlannerCall::Plan]);
}

#[tokio::test]
async fn fake_planner_plan_failure_propagates() {
    let planner = FakePlannerAdapter::new().with_plan_failure("boom");
    let err = planner.plan(&run()).await.unwrap_err();
    assert!(matches!(err, PlannerAdapterError::RequestFailed(_)));
}

#[tokio::test]
async fn fake_planner_judge_pops_queue_in_order() {
    let planner = FakePlannerAdapter::new();
    let task = Task::new("t", "d", 0);
    planner.push_judgement(JudgeResult { assessment: "first".into(), goal_complete: false, new_tasks: vec![] });
    planner.push_judgement(JudgeResult { assessment: "second".into(), goal_complete: true, new_tasks: vec![] });

    let first = planner.judge(&run(), &task, "(no recorded activity)").await.expect("judge");
    assert_eq!(first.assessment, "first");
    let second = planner.judge(&run(), &task, "(no recorded activity)").await.expect("judge");
    assert_eq!(second.assessment, "second");
}

#[tokio::test]
async fn fake_worker_default_completes_immediately() {
    let adapter = FakeWorkerAdapter::new();
    let task = Task::new("t", "d", 0);
    let mut spawned = adapter.spawn(fleet_core::RunId::new(), &task, "/tmp").await.expect("spawn");
    let outcome = spawned.done.try_recv().expect("already resolved");
    assert_eq!(outcome.status, WorkerStatus::Completed);
}

#[tokio::test]
async fn fake_worker_holding_waits_for_release() {
    let adapter = FakeWorkerAdapter::holding();
    let task = Task::new("t", "d", 0);
    let mut spawned = adapter.spawn(fleet_core::RunId::new(), &task, "/tmp").await.expect("spawn");
    assert!(spawned.done.try_recv().is_err());

    adapter.release(task.id, WorkerOutcome::completed("done"));
    let outcome = spawned.done.await.expect("released");
    assert_eq!(outcome.status, WorkerStatus::Completed);
}

#[tokio::test]
async fn fake_worker_cancel_resolves_as_failed() {
    let adapter = FakeWorkerAdapter::holding();
    let task = Task::new("t", "d", 0);
    let spawned = adapter.spawn(fleet_core::RunId::new(), &task, "/tmp").await.expect("spawn");
    adapter.cancel(&spawned.handle).await;
    let outcome = spawned.done.await.expect("cancelled resolves");
    assert_eq!(outcome.status, WorkerStatus::Failed);
    assert!(adapter.is_cancelled(&task.id));
}

#[tokio::test]
async fn fake_worker_scripted_per_title_outcome() {
    let adapter = FakeWorkerAdapter::new();
    adapter.script_failure("flaky", "disk full");
    let task = Task::new("flaky", "d", 0);
    let mut spawned = adapter.spawn(fleet_core::RunId::new(), &task, "/tmp").await.expect("spawn");
    let outcome = spawned.done.try_recv().expect("resolved");
    assert_eq!(outcome.status, WorkerStatus::Failed);
    assert_eq!(outcome.error.as_deref(), Some("disk full"));
}
