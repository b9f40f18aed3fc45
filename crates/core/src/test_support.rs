// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test-only helpers for building tasks without a workflow file.

use crate::task::{Step, Task};

/// Build a task named `name` whose steps run `commands` in order, each
/// headed by `step-<n>`.
pub fn task_with_commands(name: &str, commands: &[&str]) -> Task {
    let steps = commands
        .iter()
        .enumerate()
        .map(|(i, cmd)| Step::new(format!("step-{i}"), Some((*cmd).to_string())))
        .collect();
    Task::new(name, "", steps)
}
