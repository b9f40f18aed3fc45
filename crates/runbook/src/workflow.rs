// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory workflow shape shared by both file formats.

use oj_core::{Step, Task};
use serde::{Deserialize, Serialize};

/// One task row as read from a workflow file: a name, free-form info, and
/// the ordered (header, command) pairs that make up its steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDef {
    pub name: String,
    #[serde(default)]
    pub info: String,
    /// Ordered (header, command) pairs. `None`/absent command is a no-op.
    pub steps: Vec<(String, Option<String>)>,
}

/// A parsed workflow: the step column order plus every task row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workflow {
    pub tasks: Vec<TaskDef>,
}

impl Workflow {
    /// Build the runtime [`Task`]s for this workflow. Task id and
    /// structural hash derivation live in `oj-core`.
    pub fn into_tasks(self) -> Vec<Task> {
        self.tasks
            .into_iter()
            .map(|def| {
                let steps = def
                    .steps
                    .into_iter()
                    .map(|(header, command)| Step::new(header, command))
                    .collect();
                Task::new(def.name, def.info, steps)
            })
            .collect()
    }
}
