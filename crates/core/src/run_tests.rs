// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn new_run_is_idle_with_clamped_workers() {
    let r = Run::new("goal", "/tmp", None, 0);
    assert_eq!(r.status, RunStatus::Idle);
    assert_eq!(r.max_workers, DEFAULT_MAX_WORKERS);
}

#[test]
fn max_workers_clamps_to_bounds() {
    assert_eq!(clamp_max_workers(Some(0)), MIN_MAX_WORKERS);
    assert_eq!(clamp_max_workers(Some(100)), MAX_MAX_WORKERS);
    assert_eq!(clamp_max_workers(Some(5)), 5);
    assert_eq!(clamp_max_workers(None), DEFAULT_MAX_WORKERS);
}

#[test]
fn start_legal_from_idle_and_paused() {
    let mut r = Run::new("g", "/tmp", None, 0);
    assert!(r.can_start().is_ok());
    r.status = RunStatus::Paused;
    assert!(r.can_start().is_ok());
    r.status = RunStatus::Executing;
    assert!(r.can_start().is_err());
}

#[test]
fn pause_legal_only_while_active() {
    let mut r = Run::new("g", "/tmp", None, 0);
    assert!(r.can_pause().is_err());
    r.status = RunStatus::Executing;
    assert!(r.can_pause().is_ok());
    r.status = RunStatus::Judging;
    assert!(r.can_pause().is_ok());
    r.status = RunStatus::Completed;
    assert!(r.can_pause().is_err());
}

#[test]
fn stop_illegal_from_terminal_states() {
    let mut r = Run::new("g", "/tmp", None, 0);
    r.status = RunStatus::Completed;
    assert!(r.can_stop().is_err());
    r.status = RunStatus::Failed;
    assert!(r.can_stop().is_err());
    r.status = RunStatus::Stopped;
    assert!(r.can_stop().is_err());
    r.status = RunStatus::Executing;
    assert!(r.can_stop().is_ok());
}

#[test]
fn resume_legal_from_paused_and_stopped_only() {
    let mut r = Run::new("g", "/tmp", None, 0);
    r.status = RunStatus::Paused;
    assert!(r.can_resume().is_ok());
    r.status = RunStatus::Stopped;
    assert!(r.can_resume().is_ok());
    r.status = RunStatus::Idle;
    assert!(r.can_resume().is_err());
}

#[test]
fn reopen_for_resume_clears_completion_marker() {
    let mut r = Run::new("g", "/tmp", None, 0);
    r.status = RunStatus::Stopped;
    r.completed_at_ms = Some(99);
    r.reopen_for_resume();
    assert_eq!(r.status, RunStatus::Paused);
    assert!(r.completed_at_ms.is_none());
}

#[test]
fn truncate_for_persistence_applies_to_every_worker() {
    let mut r = Run::new("g", "/tmp", None, 0);
    let mut w = crate::worker::Worker::new(crate::task::TaskId::new(), 0);
    for i in 0..150 {
        w.push_log(format!("l{i}"));
    }
    r.workers.push(w);
    r.truncate_for_persistence();
    assert_eq!(r.workers[0].logs.len(), crate::worker::MAX_PERSISTED_ENTRIES);
}

#[test]
fn builder_allows_full_override() {
    let r = Run::builder().goal("custom goal").max_workers(7).status(RunStatus::Executing).build();
    assert_eq!(r.goal, "custom goal");
    assert_eq!(r.max_workers, 7);
    assert_eq!(r.status, RunStatus::Executing);
}
