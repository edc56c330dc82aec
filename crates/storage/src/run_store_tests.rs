// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use fleet_core::{FakeClock, RunStatus, Task, TaskStatus, Worker, WorkerId, WorkerStatus};
use tempfile::tempdir;

#[test]
fn save_then_load_all_round_trips() {
    let dir = tempdir().expect("tempdir");
    let store = RunStore::new(dir.path());
    let clock = FakeClock::new();

    let run = Run::builder().goal("build the thing").created_at_ms(1).build();
    store.save(&run).expect("save");

    let loaded = store.load_all(&clock).expect("load_all");
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].id, run.id);
    assert_eq!(loaded[0].goal, "build the thing");
}

#[test]
fn load_all_on_empty_dir_is_empty() {
    let dir = tempdir().expect("tempdir");
    let store = RunStore::new(dir.path().join("does-not-exist-yet"));
    let clock = FakeClock::new();
    assert!(store.load_all(&clock).expect("load_all").is_empty());
}

#[test]
fn load_all_reconciles_in_flight_state() {
    let dir = tempdir().expect("tempdir");
    let store = RunStore::new(dir.path());
    let clock = FakeClock::new();
    clock.set_epoch_ms(999);

    let mut run = Run::builder().status(RunStatus::Executing).build();
    run.workers.push(Worker::new(fleet_core::TaskId::new(), 0));
    let mut task = Task::new("t", "d", 0);
    task.start(WorkerId::new(), 0);
    run.tasks.push(task);
    store.save(&run).expect("save");

    let loaded = store.load_all(&clock).expect("load_all");
    assert_eq!(loaded[0].status, RunStatus::Paused);
    assert_eq!(loaded[0].workers[0].status, WorkerStatus::Failed);
    assert_eq!(loaded[0].tasks[0].status, TaskStatus::Pending);
}

#[test]
fn save_truncates_worker_logs_before_persisting() {
    let dir = tempdir().expect("tempdir");
    let store = RunStore::new(dir.path());
    let clock = FakeClock::new();

    let mut run = Run::builder().build();
    let mut worker = Worker::new(fleet_core::TaskId::new(), 0);
    for i in 0..250 {
        worker.push_log(format!("line {i}"));
    }
    run.workers.push(worker);
    store.save(&run).expect("save");

    let loaded = store.load_all(&clock).expect("load_all");
    assert_eq!(loaded[0].workers[0].logs.len(), fleet_core::worker::MAX_PERSISTED_ENTRIES);
}

#[test]
fn save_keeps_original_run_untouched() {
    let dir = tempdir().expect("tempdir");
    let store = RunStore::new(dir.path());
    let mut run = Run::builder().build();
    let mut worker = Worker::new(fleet_core::TaskId::new(), 0);
    worker.push_log("only one entry");
    run.workers.push(worker);

    store.save(&run).expect("save");
    assert_eq!(run.workers[0].logs.len(), 1, "save must not mutate the caller's run");
}

#[test]
fn load_all_migrates_legacy_cycles_shape() {
    let dir = tempdir().expect("tempdir");
    std::fs::create_dir_all(dir.path()).unwrap();
    let legacy_path = dir.path().join("run-legacy.json");
    let legacy = serde_json::json!({
        "id": "run-legacy",
        "goal": "old goal",
        "target_dir": "/tmp",
        "status": "paused",
        "max_workers": 3,
        "created_at_ms": 1,
        "cycles": [
            {"plan": {"analysis": "a1", "tasks": []}, "judgement": "ok", "shouldContinue": false, "completedAt": 5}
        ]
    });
    std::fs::write(&legacy_path, serde_json::to_vec(&legacy).unwrap()).unwrap();

    let store = RunStore::new(dir.path());
    let clock = FakeClock::new();
    let loaded = store.load_all(&clock).expect("load_all");
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].analysis, "a1");
    assert_eq!(loaded[0].judgements.len(), 1);
    assert!(loaded[0].judgements[0].goal_complete);
}

#[test]
fn load_all_skips_unreadable_records() {
    let dir = tempdir().expect("tempdir");
    std::fs::create_dir_all(dir.path()).unwrap();
    std::fs::write(dir.path().join("garbage.json"), b"not json").unwrap();
    let store = RunStore::new(dir.path());
    let clock = FakeClock::new();
    assert!(store.load_all(&clock).expect("load_all should not fail").is_empty());
}

#[test]
fn load_all_sorts_by_created_at() {
    let dir = tempdir().expect("tempdir");
    let store = RunStore::new(dir.path());
    let clock = FakeClock::new();
    let later = Run::builder().created_at_ms(200).build();
    let earlier = Run::builder().created_at_ms(100).build();
    store.save(&later).expect("save");
    store.save(&earlier).expect("save");

    let loaded = store.load_all(&clock).expect("load_all");
    assert_eq!(loaded[0].created_at_ms, 100);
    assert_eq!(loaded[1].created_at_ms, 200);
}
