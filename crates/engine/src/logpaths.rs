// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-step log file layout: `<logs_root>/<task_id>/step-<NN>.{stdout,stderr}.log`.

use oj_core::TaskId;
use std::path::{Path, PathBuf};

pub fn task_log_dir(logs_root: &Path, task_id: &TaskId) -> PathBuf {
    logs_root.join(task_id.as_str())
}

pub fn stdout_path(logs_root: &Path, task_id: &TaskId, step_idx: usize) -> PathBuf {
    task_log_dir(logs_root, task_id).join(format!("step-{step_idx:02}.stdout.log"))
}

pub fn stderr_path(logs_root: &Path, task_id: &TaskId, step_idx: usize) -> PathBuf {
    task_log_dir(logs_root, task_id).join(format!("step-{step_idx:02}.stderr.log"))
}
