// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Atomic, backup-rotating writes for per-run snapshot files.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::StorageError;

/// Maximum number of rotated backups kept per run file: `.bak`, `.bak.2`, `.bak.3`.
pub const MAX_BAK_FILES: u32 = 3;

/// Pick the next `.bak` / `.bak.N` path, rotating older backups out.
///
/// Keeps up to [`MAX_BAK_FILES`] backups. The oldest backup is removed when
/// the limit is reached.
pub fn rotate_bak_path(path: &Path) -> PathBuf {
    let bak = |n: u32| {
        if n == 1 {
            path.with_extension("bak")
        } else {
            path.with_extension(format!("bak.{n}"))
        }
    };

    let oldest = bak(MAX_BAK_FILES);
    if oldest.exists() {
        let _ = fs::remove_file(&oldest);
    }

    for n in (1..MAX_BAK_FILES).rev() {
        let src = bak(n);
        if src.exists() {
            let _ = fs::rename(&src, bak(n + 1));
        }
    }

    bak(1)
}

/// Write `contents` to `path` atomically: write to a temporary sibling file,
/// rotate the previous file (if any) into the backup chain, then rename the
/// temporary file into place. A crash between the write and the rename never
/// corrupts the last good record; a bad write can be recovered from the
/// newest backup.
pub fn atomic_write(path: &Path, contents: &[u8]) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp_path = path.with_extension("tmp");
    fs::write(&tmp_path, contents)?;

    if path.exists() {
        let bak_path = rotate_bak_path(path);
        fs::rename(path, bak_path)?;
    }

    fs::rename(&tmp_path, path)?;
    Ok(())
}
