// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Migrates the legacy "cycles" record shape into the current tasks/judgements
//! shape.
//!
//! The legacy shape grouped every planning round into a `cycles` array, each
//! holding its own `plan` (with a nested `tasks` array and `analysis` text),
//! a `judgement` string, and a `shouldContinue` flag. The current shape
//! flattens all of that into top-level `tasks`/`judgements`/`analysis`.

use serde_json::{json, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("legacy record missing required field `{0}`")]
    MissingField(&'static str),
}

/// True when `value` is in the legacy shape: it carries `cycles` and no
/// top-level `tasks`.
pub fn is_legacy_shape(value: &Value) -> bool {
    value.get("cycles").is_some() && value.get("tasks").is_none()
}

/// Migrate a legacy "cycles" record into the current run shape, in place.
/// Idempotent: calling this on an already-migrated record (no `cycles` field)
/// is a no-op.
pub fn migrate_legacy_cycles(value: &mut Value) -> Result<(), MigrationError> {
    if !is_legacy_shape(value) {
        return Ok(());
    }

    let obj = value.as_object_mut().ok_or(MigrationError::MissingField("<root>"))?;
    let cycles = obj.remove("cycles").unwrap_or(Value::Array(Vec::new()));
    let cycles = cycles.as_array().cloned().unwrap_or_default();

    let mut tasks: Vec<Value> = Vec::new();
    let mut judgements: Vec<Value> = Vec::new();
    let mut analysis = String::new();

    for cycle in &cycles {
        if let Some(plan) = cycle.get("plan") {
            if analysis.is_empty() {
                if let Some(a) = plan.get("analysis").and_then(Value::as_str) {
                    if !a.is_empty() {
                        analysis = a.to_string();
                    }
                }
            }
            if let Some(cycle_tasks) = plan.get("tasks").and_then(Value::as_array) {
                tasks.extend(cycle_tasks.iter().cloned());
            }
        }

        if let Some(text) = cycle.get("judgement").and_then(Value::as_str) {
            let should_continue = cycle.get("shouldContinue").and_then(Value::as_bool).unwrap_or(true);
            let at_ms = cycle.get("completedAt").and_then(Value::as_u64).unwrap_or(0);
            judgements.push(json!({
                "id": format!("jdg-{}", judgements.len()),
                "task_id": Value::Null,
                "assessment": text,
                "new_task_ids": [],
                "goal_complete": !should_continue,
                "at_ms": at_ms,
            }));
        }
    }

    obj.insert("tasks".to_string(), Value::Array(tasks));
    obj.insert("judgements".to_string(), Value::Array(judgements));
    obj.entry("analysis").or_insert(Value::String(analysis));
    obj.entry("workers").or_insert(Value::Array(Vec::new()));
    obj.entry("max_workers").or_insert(json!(fleet_core::run::DEFAULT_MAX_WORKERS));
    obj.entry("error").or_insert(Value::Null);

    Ok(())
}
