// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! On-disk shape of one persisted run.

use chrono::{DateTime, Utc};
use fleet_core::Run;
use serde::{Deserialize, Serialize};

/// Current schema version for [`StoredRun`].
pub const CURRENT_RUN_VERSION: u32 = 1;

/// Wraps a [`Run`] with the schema version needed to migrate older records
/// (including the legacy "cycles" shape, see [`crate::migration`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredRun {
    #[serde(rename = "v", default = "legacy_version")]
    pub version: u32,
    pub run: Run,
    pub saved_at: DateTime<Utc>,
}

/// Records with no `v` field predate versioning and are always legacy shape.
fn legacy_version() -> u32 {
    0
}

impl StoredRun {
    pub fn new(run: Run, saved_at: DateTime<Utc>) -> Self {
        Self { version: CURRENT_RUN_VERSION, run, saved_at }
    }
}
