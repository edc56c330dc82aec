// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;
use std::time::Duration;

use fleet_adapters::{FakePlannerAdapter, FakeWorkerAdapter, JudgeResult, PlanResult, PlannedTask, WorkerOutcome};
use fleet_core::{EngineConfig, FakeClock, Run, RunId, RunStatus, TaskStatus};
use fleet_storage::RunStore;
use futures_util::FutureExt;

use super::*;
use crate::event_bus::EventBus;

fn manager(
    planner: Arc<FakePlannerAdapter>,
    worker_adapter: Arc<FakeWorkerAdapter>,
) -> (tempfile::TempDir, tempfile::TempDir, RunManager<FakeClock>) {
    let store_dir = tempfile::tempdir().expect("tempdir");
    let target_dir = tempfile::tempdir().expect("tempdir");
    let store = Arc::new(RunStore::new(store_dir.path()));
    let bus = Arc::new(EventBus::new(&EngineConfig::default()));
    let mgr = RunManager::new(FakeClock::new(), planner, worker_adapter, bus, store);
    (store_dir, target_dir, mgr)
}

async fn poll_until<F: FnMut() -> bool>(mut f: F) -> bool {
    for _ in 0..300 {
        if f() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    f()
}

async fn wait_for_status(mgr: &RunManager<FakeClock>, id: RunId, status: RunStatus) -> Run {
    for _ in 0..300 {
        if let Some(r) = mgr.get(id).await {
            if r.status == status {
                return r;
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("run {id} never reached status {status}");
}

#[tokio::test]
async fn create_persists_the_run_and_emits_run_created() {
    let (_store_dir, target_dir, mgr) = manager(Arc::new(FakePlannerAdapter::new()), Arc::new(FakeWorkerAdapter::new()));
    let mut sub = mgr.bus().subscribe();

    let run = mgr.create("do a thing", target_dir.path().to_string_lossy(), None).await.expect("create");
    assert_eq!(run.status, RunStatus::Idle);
    assert_eq!(run.max_workers, fleet_core::run::DEFAULT_MAX_WORKERS);

    let event = sub.recv().await.expect("run:created event");
    match event {
        fleet_core::Event::RunCreated { run_id, .. } => assert_eq!(run_id, run.id),
        other => panic!("expected RunCreated, got {other:?}"),
    }

    let reloaded = mgr.get(run.id).await.expect("run present");
    assert_eq!(reloaded.id, run.id);
}

#[tokio::test]
async fn create_rejects_a_missing_target_directory() {
    let (_store_dir, _target_dir, mgr) = manager(Arc::new(FakePlannerAdapter::new()), Arc::new(FakeWorkerAdapter::new()));
    let err = mgr.create("goal", "/no/such/path/definitely-not-real", None).await.unwrap_err();
    assert!(matches!(err, RunManagerError::TargetDirMissing(_)));
}

#[tokio::test]
async fn start_on_an_unknown_run_is_not_found() {
    let (_store_dir, _target_dir, mgr) = manager(Arc::new(FakePlannerAdapter::new()), Arc::new(FakeWorkerAdapter::new()));
    let err = mgr.start(RunId::new()).await.unwrap_err();
    assert!(matches!(err, RunManagerError::NotFound(_)));
}

#[tokio::test]
async fn a_run_completes_end_to_end() {
    let planner = Arc::new(
        FakePlannerAdapter::new()
            .with_plan(PlanResult { analysis: "one task".into(), tasks: vec![PlannedTask::new("do it", "")] }),
    );
    planner.push_judgement(JudgeResult { assessment: "done".into(), goal_complete: true, new_tasks: vec![] });
    let (_store_dir, target_dir, mgr) = manager(planner, Arc::new(FakeWorkerAdapter::new()));

    let run = mgr.create("goal", target_dir.path().to_string_lossy(), None).await.expect("create");
    mgr.start(run.id).await.expect("start");

    assert!(poll_until(|| matches!(mgr.get(run.id).now_or_never(), Some(Some(r)) if r.status == RunStatus::Completed)).await);
}

#[tokio::test]
async fn pause_reverts_in_progress_work_and_resume_picks_it_back_up() {
    let planner = Arc::new(
        FakePlannerAdapter::new()
            .with_plan(PlanResult { analysis: "one task".into(), tasks: vec![PlannedTask::new("long haul", "")] }),
    );
    let worker_adapter = Arc::new(FakeWorkerAdapter::holding());
    let (_store_dir, target_dir, mgr) = manager(planner.clone(), worker_adapter.clone());

    let run = mgr.create("goal", target_dir.path().to_string_lossy(), None).await.expect("create");
    mgr.start(run.id).await.expect("start");

    assert!(poll_until(|| worker_adapter.held_count() == 1).await);
    mgr.pause(run.id).await.expect("pause");

    assert!(poll_until(|| worker_adapter.is_cancelled(&worker_adapter.spawned_task_ids()[0])).await);
    let paused = mgr.get(run.id).await.expect("run present");
    assert_eq!(paused.status, RunStatus::Paused);
    assert_eq!(paused.tasks[0].status, TaskStatus::Pending);

    // Pausing again is illegal: the run is no longer active.
    assert!(matches!(mgr.pause(run.id).await, Err(RunManagerError::IllegalTransition(_))));

    planner.push_judgement(JudgeResult { assessment: "done".into(), goal_complete: true, new_tasks: vec![] });
    mgr.resume(run.id).await.expect("resume");

    assert!(poll_until(|| worker_adapter.held_count() == 1).await);
    let second_worker_task = worker_adapter.spawned_task_ids()[1];
    worker_adapter.release(second_worker_task, WorkerOutcome::completed("finished"));

    assert!(poll_until(|| matches!(mgr.get(run.id).now_or_never(), Some(Some(r)) if r.status == RunStatus::Completed)).await);
}

#[tokio::test]
async fn stop_marks_the_run_terminal_and_resume_reopens_it() {
    let planner = Arc::new(
        FakePlannerAdapter::new()
            .with_plan(PlanResult { analysis: "one task".into(), tasks: vec![PlannedTask::new("long haul", "")] }),
    );
    let worker_adapter = Arc::new(FakeWorkerAdapter::holding());
    let (_store_dir, target_dir, mgr) = manager(planner.clone(), worker_adapter.clone());

    let run = mgr.create("goal", target_dir.path().to_string_lossy(), None).await.expect("create");
    mgr.start(run.id).await.expect("start");
    assert!(poll_until(|| worker_adapter.held_count() == 1).await);

    mgr.stop(run.id).await.expect("stop");
    let stopped = mgr.get(run.id).await.expect("run present");
    assert_eq!(stopped.status, RunStatus::Stopped);
    assert!(stopped.completed_at_ms.is_some());

    planner.push_judgement(JudgeResult { assessment: "done".into(), goal_complete: true, new_tasks: vec![] });
    mgr.resume(run.id).await.expect("resume");
    let resumed = mgr.get(run.id).await.expect("run present");
    assert!(resumed.completed_at_ms.is_none() || resumed.status != RunStatus::Stopped);

    assert!(poll_until(|| worker_adapter.held_count() == 1).await);
    let task_id = worker_adapter.spawned_task_ids()[1];
    worker_adapter.release(task_id, WorkerOutcome::completed("finished"));

    assert!(poll_until(|| matches!(mgr.get(run.id).now_or_never(), Some(Some(r)) if r.status == RunStatus::Completed)).await);
}

#[tokio::test]
async fn shutdown_cancels_every_in_flight_worker() {
    let planner = Arc::new(
        FakePlannerAdapter::new()
            .with_plan(PlanResult { analysis: "one task".into(), tasks: vec![PlannedTask::new("long haul", "")] }),
    );
    let worker_adapter = Arc::new(FakeWorkerAdapter::holding());
    let (_store_dir, target_dir, mgr) = manager(planner, worker_adapter.clone());

    let run = mgr.create("goal", target_dir.path().to_string_lossy(), None).await.expect("create");
    mgr.start(run.id).await.expect("start");
    assert!(poll_until(|| worker_adapter.held_count() == 1).await);

    mgr.shutdown().await;

    assert!(worker_adapter.is_cancelled(&worker_adapter.spawned_task_ids()[0]));
}
