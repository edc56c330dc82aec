// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The handful of knobs the orchestration engine itself owns. Everything else
//! (ports, auth, model selection) belongs to the out-of-scope HTTP/CLI layer
//! that embeds this crate.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::run::DEFAULT_MAX_WORKERS;

/// Number of recent events the bus replays to a new subscriber before live
/// delivery begins.
pub const DEFAULT_EVENT_CATCHUP: usize = 50;
/// Size of the bus's retained event ring.
pub const DEFAULT_EVENT_RING: usize = 1000;
/// How often the run store snapshots every known run, independent of
/// transition-triggered saves.
pub const DEFAULT_SNAPSHOT_TICK: Duration = Duration::from_secs(10);

/// Engine-owned configuration. Env-var/XDG resolution and every other
/// outer-surface concern belong to the embedding binary; this struct only
/// carries the knobs the engine itself reads, threaded into the run manager
/// at construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Default `max_workers` applied when a caller creates a run without
    /// specifying one. Always clamped into `[MIN_MAX_WORKERS, MAX_MAX_WORKERS]`.
    pub default_max_workers: u32,
    /// Event bus catch-up prelude size.
    pub event_catchup: usize,
    /// Event bus retained ring size.
    pub event_ring: usize,
    /// Run store periodic snapshot interval, in milliseconds (serde-friendly;
    /// use [`EngineConfig::snapshot_tick`] to get a [`Duration`]).
    pub snapshot_tick_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_max_workers: DEFAULT_MAX_WORKERS,
            event_catchup: DEFAULT_EVENT_CATCHUP,
            event_ring: DEFAULT_EVENT_RING,
            snapshot_tick_ms: DEFAULT_SNAPSHOT_TICK.as_millis() as u64,
        }
    }
}

impl EngineConfig {
    pub fn snapshot_tick(&self) -> Duration {
        Duration::from_millis(self.snapshot_tick_ms)
    }
}
