// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resume reconciliation: apply a loaded [`PersistedTask`] onto a freshly
//! built [`Task`] (performed by the Model/caller, not the Store itself).

use crate::PersistedTask;
use oj_core::{Status, Task};

/// Apply persisted step statuses onto `task` in place, following the
/// resume rules:
/// - `SUCCESS`/`FAILED`/`SKIPPED` are preserved as-is.
/// - `RUNNING` and `KILLED` are reset to `PENDING` (the step was interrupted).
/// - `PENDING` is preserved.
/// - Steps whose index exceeds the current step count are dropped.
/// - Steps missing from the persisted record default to `PENDING`.
pub fn reconcile(task: &mut Task, persisted: &PersistedTask) {
    for (i, step) in task.steps.iter_mut().enumerate() {
        let status = persisted.steps.get(i).copied().unwrap_or(Status::Pending);
        step.status = match status {
            Status::Success | Status::Failed | Status::Skipped | Status::Pending => status,
            Status::Running | Status::Killed => Status::Pending,
        };
    }
}
