// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run Manager: the public façade over the engine. Owns the map of runs and
//! their abort handles, validates state transitions, and launches the
//! scheduler pipeline on `start`/`resume`.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex as SyncMutex;
use thiserror::Error;
use tokio::sync::Mutex as AsyncMutex;
use tokio_util::sync::CancellationToken;

use fleet_adapters::{PlannerAdapter, WorkerAdapter};
use fleet_core::{Clock, Event, IllegalTransition, Run, RunId, RunStatus};
use fleet_storage::RunStore;

use crate::event_bus::EventBus;
use crate::scheduler::{self, SchedulerHandles};

#[derive(Debug, Error)]
pub enum RunManagerError {
    #[error("run not found: {0}")]
    NotFound(RunId),
    #[error(transparent)]
    IllegalTransition(#[from] IllegalTransition),
    #[error("target directory does not exist: {0}")]
    TargetDirMissing(String),
}

struct RunEntry {
    run: Arc<AsyncMutex<Run>>,
    abort: SyncMutex<CancellationToken>,
    scheduler_task: AsyncMutex<Option<tokio::task::JoinHandle<()>>>,
}

/// Owns every [`Run`] known to this process and the handles needed to drive
/// or interrupt it. One instance per embedding process; cheap to share via
/// `Arc` since every public method takes `&self`.
pub struct RunManager<C: Clock + 'static> {
    clock: C,
    planner: Arc<dyn PlannerAdapter>,
    worker_adapter: Arc<dyn WorkerAdapter>,
    bus: Arc<EventBus>,
    store: Arc<RunStore>,
    entries: SyncMutex<HashMap<RunId, Arc<RunEntry>>>,
}

impl<C: Clock + 'static> RunManager<C> {
    pub fn new(
        clock: C,
        planner: Arc<dyn PlannerAdapter>,
        worker_adapter: Arc<dyn WorkerAdapter>,
        bus: Arc<EventBus>,
        store: Arc<RunStore>,
    ) -> Self {
        Self { clock, planner, worker_adapter, bus, store, entries: SyncMutex::new(HashMap::new()) }
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    /// Create a new run in `idle`. Fails precondition-only (no state
    /// mutated) if `target_dir` doesn't exist.
    pub async fn create(
        &self,
        goal: impl Into<String>,
        target_dir: impl Into<String>,
        max_workers: Option<u32>,
    ) -> Result<Run, RunManagerError> {
        let target_dir = target_dir.into();
        if !std::path::Path::new(&target_dir).exists() {
            return Err(RunManagerError::TargetDirMissing(target_dir));
        }
        let now = self.clock.epoch_ms();
        let run = Run::new(goal, target_dir, max_workers, now);
        if let Err(e) = self.store.save(&run) {
            tracing::error!("failed to persist newly created run {}: {e}", run.id);
        }
        self.bus.emit(Event::run_created(&run));
        self.insert_entry(run.clone());
        Ok(run)
    }

    /// Adopt a run already reconciled by [`crate::lifecycle::startup`] (e.g.
    /// on process restart). Does not persist or emit `run:created` — the run
    /// already exists on disk.
    pub fn adopt(&self, run: Run) {
        self.insert_entry(run);
    }

    fn insert_entry(&self, run: Run) {
        let entry = Arc::new(RunEntry {
            run: Arc::new(AsyncMutex::new(run.clone())),
            abort: SyncMutex::new(CancellationToken::new()),
            scheduler_task: AsyncMutex::new(None),
        });
        self.entries.lock().insert(run.id, entry);
    }

    /// `start` is legal only from `idle`/`paused`.
    pub async fn start(&self, run_id: RunId) -> Result<(), RunManagerError> {
        let entry = self.entry(run_id)?;
        {
            let run = entry.run.lock().await;
            run.can_start()?;
        }
        self.launch(run_id, entry).await;
        Ok(())
    }

    /// `pause` is legal only while actively running (`planning|executing|judging`).
    pub async fn pause(&self, run_id: RunId) -> Result<(), RunManagerError> {
        let entry = self.entry(run_id)?;
        let token = {
            let mut run = entry.run.lock().await;
            run.can_pause()?;
            run.status = RunStatus::Paused;
            self.bus.emit(Event::run_updated(&run));
            if let Err(e) = self.store.save(&run) {
                tracing::error!("failed to persist pause for run {run_id}: {e}");
            }
            entry.abort.lock().clone()
        };
        token.cancel();
        Ok(())
    }

    /// `stop` is legal from any non-terminal status; idempotent in the sense
    /// that a second call on an already-stopped run is a precondition error,
    /// never a partial mutation.
    pub async fn stop(&self, run_id: RunId) -> Result<(), RunManagerError> {
        let entry = self.entry(run_id)?;
        let token = {
            let mut run = entry.run.lock().await;
            run.can_stop()?;
            let now = self.clock.epoch_ms();
            run.status = RunStatus::Stopped;
            run.completed_at_ms = Some(now);
            self.bus.emit(Event::run_updated(&run));
            if let Err(e) = self.store.save(&run) {
                tracing::error!("failed to persist stop for run {run_id}: {e}");
            }
            entry.abort.lock().clone()
        };
        token.cancel();
        Ok(())
    }

    /// `resume` is legal from `paused`/`stopped`. Resuming a stopped run
    /// reopens it as `paused` (clearing `completed_at`) before restarting.
    pub async fn resume(&self, run_id: RunId) -> Result<(), RunManagerError> {
        let entry = self.entry(run_id)?;
        {
            let mut run = entry.run.lock().await;
            run.can_resume()?;
            if run.status == RunStatus::Stopped {
                run.reopen_for_resume();
            }
            self.bus.emit(Event::run_updated(&run));
            if let Err(e) = self.store.save(&run) {
                tracing::error!("failed to persist resume for run {run_id}: {e}");
            }
        }
        self.launch(run_id, entry).await;
        Ok(())
    }

    pub async fn get(&self, run_id: RunId) -> Option<Run> {
        let entry = self.entries.lock().get(&run_id).cloned()?;
        Some(entry.run.lock().await.clone())
    }

    /// Every known run, most recently created first.
    pub async fn list(&self) -> Vec<Run> {
        let entries: Vec<Arc<RunEntry>> = self.entries.lock().values().cloned().collect();
        let mut runs = Vec::with_capacity(entries.len());
        for e in entries {
            runs.push(e.run.lock().await.clone());
        }
        runs.sort_by(|a, b| b.created_at_ms.cmp(&a.created_at_ms));
        runs
    }

    /// Fire every active run's abort handle and await its scheduler task, so
    /// no worker is left running once the process exits.
    pub async fn shutdown(&self) {
        let entries: Vec<Arc<RunEntry>> = self.entries.lock().values().cloned().collect();
        for e in &entries {
            e.abort.lock().cancel();
        }
        for e in entries {
            let handle = e.scheduler_task.lock().await.take();
            if let Some(h) = handle {
                let _ = h.await;
            }
        }
    }

    fn entry(&self, run_id: RunId) -> Result<Arc<RunEntry>, RunManagerError> {
        self.entries.lock().get(&run_id).cloned().ok_or(RunManagerError::NotFound(run_id))
    }

    async fn launch(&self, run_id: RunId, entry: Arc<RunEntry>) {
        let token = CancellationToken::new();
        *entry.abort.lock() = token.clone();
        let ctx = SchedulerHandles {
            run_id,
            run: entry.run.clone(),
            abort: token,
            planner: self.planner.clone(),
            worker_adapter: self.worker_adapter.clone(),
            bus: self.bus.clone(),
            store: self.store.clone(),
            clock: self.clock.clone(),
        };
        let handle = tokio::spawn(scheduler::run_pipeline(ctx));
        *entry.scheduler_task.lock().await = Some(handle);
    }
}

#[cfg(test)]
#[path = "run_manager_tests.rs"]
mod tests;
