// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lifecycle Reaper: the two process-boundary hooks that keep a restart from
//! leaving phantom in-flight state, and keep a clean shutdown from leaving
//! orphaned workers behind.
//!
//! Neither hook is part of the scheduler's own loop — they run once, at
//! process start and process stop, around whatever embeds [`RunManager`].

use std::sync::Arc;

use fleet_core::{Clock, Event, RunStatus};
use fleet_storage::{RunStore, StorageError};

use crate::event_bus::EventBus;
use crate::run_manager::RunManager;

/// Load every run the store knows about, reconcile it (already done by
/// [`RunStore::load_all`]: any in-flight status → `paused`, any running
/// worker → `failed`, any in-progress task → `pending`), and adopt each into
/// `manager` so it shows up in `list`/`get` and can be resumed.
///
/// Adopted runs are not re-persisted here — `load_all` already reconciled
/// them in memory, and the next transition or periodic tick will flush the
/// reconciled shape to disk. A `run:updated` is emitted for any run whose
/// status was rewritten by reconciliation, so subscribers attached before
/// steady-state traffic resumes still see the corrected state.
pub async fn startup<C: Clock + 'static>(
    store: Arc<RunStore>,
    clock: &C,
    manager: &RunManager<C>,
    bus: &Arc<EventBus>,
) -> Result<usize, StorageError> {
    let runs = store.load_all(clock)?;
    let count = runs.len();
    for run in runs {
        // `load_all` already reconciled the run; it is never `is_active()`
        // (planning/executing/judging) by the time it reaches here (see
        // `fleet_storage::reconcile_loaded_run`), so a reconciled run is
        // always observable as `paused` and safe to adopt idle.
        if run.status != RunStatus::Idle {
            bus.emit(Event::run_updated(&run));
        }
        manager.adopt(run);
    }
    Ok(count)
}

/// Fire every active run's abort handle and await its scheduler task so no
/// worker keeps running after the embedding process exits. Per §7, a
/// shutdown-triggered abort sets a terminal status on any running worker but
/// never forces the run itself into a terminal status — that mirrors pause,
/// not stop, leaving every interrupted run resumable.
pub async fn shutdown<C: Clock + 'static>(manager: &RunManager<C>) {
    manager.shutdown().await;
}
