// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Restart-time reconciliation: no Run may load back into an in-flight state
//! with no scheduler actually driving it.

use fleet_core::{Run, RunStatus, TaskStatus, WorkerStatus};

/// Force a freshly loaded run into a consistent, resumable shape:
/// - `planning|executing|judging` → `paused`
/// - every `running` worker → `failed` (with `completed_at_ms = now_ms`)
/// - every `in_progress` task → `pending` (clearing `started_at_ms`)
pub fn reconcile_loaded_run(run: &mut Run, now_ms: u64) {
    if run.status.is_active() {
        run.status = RunStatus::Paused;
    }

    for worker in &mut run.workers {
        if worker.status == WorkerStatus::Running {
            worker.finish(WorkerStatus::Failed, now_ms);
        }
    }

    for task in &mut run.tasks {
        if task.status == TaskStatus::InProgress {
            task.revert_to_pending();
        }
    }
}
