// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared `tracing-subscriber` initialization. Every component in this crate
//! logs through `tracing` spans/events; this is the one place that wires a
//! subscriber to stderr, so an embedding binary (or a test) only has to call
//! this once instead of reaching for its own `env_logger`/`println!` setup.

use tracing_subscriber::EnvFilter;

/// Install a process-global `tracing` subscriber reading its filter from
/// `RUST_LOG` (defaulting to `info`). Idempotent: a second call is a no-op,
/// since `tracing` only permits one global subscriber per process.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_target(false).try_init();
}
