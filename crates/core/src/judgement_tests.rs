// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::task::TaskId;

#[test]
fn new_judgement_carries_fields() {
    let task_id = TaskId::new();
    let j = Judgement::new(task_id, "looks fine", vec![], true, 7);
    assert_eq!(j.task_id, task_id);
    assert!(j.goal_complete);
    assert_eq!(j.at_ms, 7);
}

#[test]
fn synthetic_error_is_never_goal_complete() {
    let j = Judgement::synthetic_error(TaskId::new(), "timed out", 1);
    assert!(!j.goal_complete);
    assert!(j.assessment.contains("timed out"));
    assert!(j.new_task_ids.is_empty());
}

#[test]
fn builder_defaults_to_not_complete() {
    let j = Judgement::builder().build();
    assert!(!j.goal_complete);
}
