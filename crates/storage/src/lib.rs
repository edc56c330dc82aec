// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! fleet-storage: durable per-run persistence for the orchestration engine.

mod backup;
mod error;
mod migration;
mod record;
mod reconcile;
mod run_store;

pub use backup::{atomic_write, rotate_bak_path, MAX_BAK_FILES};
pub use error::StorageError;
pub use migration::{is_legacy_shape, migrate_legacy_cycles, MigrationError};
pub use record::{StoredRun, CURRENT_RUN_VERSION};
pub use reconcile::reconcile_loaded_run;
pub use run_store::{spawn_snapshot_ticker, RunStore};
