// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable per-run persistence: one JSON file per run under a root directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use fleet_core::{Clock, Run, RunId};
use serde_json::Value;
use tracing::{error, warn};

use crate::backup::atomic_write;
use crate::error::StorageError;
use crate::migration::migrate_legacy_cycles;
use crate::reconcile::reconcile_loaded_run;
use crate::record::StoredRun;

/// Durable store for [`Run`] records, one file per run.
pub struct RunStore {
    root: PathBuf,
}

impl RunStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, id: &RunId) -> PathBuf {
        self.root.join(format!("{}.json", id.as_str()))
    }

    /// Persist a run, truncating worker logs/activity to the most recent
    /// entries first so on-disk size stays bounded.
    pub fn save(&self, run: &Run) -> Result<(), StorageError> {
        let mut run = run.clone();
        run.truncate_for_persistence();
        let record = StoredRun::new(run.clone(), Utc::now());
        let json = serde_json::to_vec_pretty(&record)?;
        atomic_write(&self.path_for(&run.id), &json)?;
        Ok(())
    }

    /// Load every run found under the store root, migrating legacy records
    /// and reconciling any in-flight state left over from an unclean exit.
    /// Unreadable records are logged and skipped rather than failing the
    /// whole load.
    pub fn load_all(&self, clock: &impl Clock) -> Result<Vec<Run>, StorageError> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let mut runs = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    warn!("skipping unreadable directory entry: {e}");
                    continue;
                }
            };
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match self.load_one(&path) {
                Ok(mut run) => {
                    reconcile_loaded_run(&mut run, clock.epoch_ms());
                    runs.push(run);
                }
                Err(e) => error!("failed to load run record {}: {e}", path.display()),
            }
        }

        runs.sort_by_key(|r| r.created_at_ms);
        Ok(runs)
    }

    fn load_one(&self, path: &Path) -> Result<Run, StorageError> {
        let bytes = std::fs::read(path)?;
        let mut value: Value = serde_json::from_slice(&bytes)?;

        // Legacy records are bare Run-shaped JSON (no StoredRun wrapper).
        if migrate_if_legacy(&mut value)? {
            let run: Run = serde_json::from_value(value)?;
            return Ok(run);
        }

        let record: StoredRun = serde_json::from_value(value)?;
        Ok(record.run)
    }
}

/// Migrate `value` in place if it is in the legacy "cycles" shape. Returns
/// true when a migration was applied (meaning `value` is now a bare `Run`,
/// not a [`StoredRun`] wrapper).
fn migrate_if_legacy(value: &mut Value) -> Result<bool, StorageError> {
    if let Some(inner) = value.get_mut("run") {
        if crate::migration::is_legacy_shape(inner) {
            migrate_legacy_cycles(inner)?;
        }
        return Ok(false);
    }

    if crate::migration::is_legacy_shape(value) {
        migrate_legacy_cycles(value)?;
        return Ok(true);
    }
    Ok(false)
}

/// Spawn the periodic snapshot ticker described in the run store contract:
/// every [`tick`] interval, persist every run currently known to `runs`.
/// Saves triggered by state transitions happen separately, via direct calls
/// to [`RunStore::save`].
pub fn spawn_snapshot_ticker<F>(store: Arc<RunStore>, tick: Duration, snapshot_runs: F) -> tokio::task::JoinHandle<()>
where
    F: Fn() -> Vec<Run> + Send + Sync + 'static,
{
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(tick);
        loop {
            interval.tick().await;
            for run in snapshot_runs() {
                if let Err(e) = store.save(&run) {
                    error!("periodic snapshot failed for run {}: {e}", run.id);
                }
            }
        }
    })
}

#[cfg(test)]
#[path = "run_store_tests.rs"]
mod tests;
