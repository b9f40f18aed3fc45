// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task and step entities.

use crate::hash::{sanitize_name, short_hash, structural_hash};
use crate::ring::RingBuffer;
use crate::status::Status;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::time::Instant;

/// Default capacity of a step's output/debug ring buffer.
pub const DEFAULT_TAIL_CAP: usize = 2000;

/// Stable identifier for a task, invariant under row reordering.
///
/// Format: `<sanitized_name>_<8-hex-char short hash of name||info>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(pub String);

impl TaskId {
    pub fn derive(name: &str, info: &str) -> Self {
        Self(format!("{}_{}", sanitize_name(name), short_hash(name, info)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Borrow<str> for TaskId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// One shell command inside a task.
#[derive(Debug, Clone)]
pub struct Step {
    /// Column header / display name for this step.
    pub header: String,
    /// Shell command. `None` (or empty) means "no-op" (always `SKIPPED`).
    pub command: Option<String>,
    pub status: Status,
    pub output: RingBuffer,
    pub debug: RingBuffer,
    /// Set once the step has actually been dispatched to a child process.
    pub runtime: Option<StepRuntime>,
}

impl Step {
    pub fn new(header: impl Into<String>, command: Option<String>) -> Self {
        let command = command.filter(|c| !c.is_empty());
        Self {
            header: header.into(),
            command,
            status: Status::Pending,
            output: RingBuffer::new(DEFAULT_TAIL_CAP),
            debug: RingBuffer::new(DEFAULT_TAIL_CAP),
            runtime: None,
        }
    }

    pub fn is_noop(&self) -> bool {
        self.command.is_none()
    }

    /// Reset this step back to `PENDING`, clearing runtime fields and tails.
    pub fn reset(&mut self) {
        self.status = Status::Pending;
        self.runtime = None;
        self.output.clear();
        self.debug.clear();
    }
}

/// Transient fields valid only while a step is (or was) running.
#[derive(Debug, Clone, Copy)]
pub struct StepRuntime {
    pub pid: i32,
    pub pgid: i32,
    pub started_at: Instant,
    pub ended_at: Option<Instant>,
    /// Generation at which this run was dispatched.
    pub generation: u64,
}

/// One workflow row: a name, free-form info, and an ordered list of steps.
#[derive(Debug, Clone)]
pub struct Task {
    pub id: TaskId,
    pub name: String,
    pub info: String,
    pub steps: Vec<Step>,
    /// Monotonically increasing; bumped by every rerun/kill.
    pub generation: u64,
    /// Digest of the ordered (header, command) sequence.
    pub structural_hash: String,
}

impl Task {
    pub fn new(name: impl Into<String>, info: impl Into<String>, steps: Vec<Step>) -> Self {
        let name = name.into();
        let info = info.into();
        let id = TaskId::derive(&name, &info);
        let structural_hash = Self::compute_structural_hash(&steps);
        Self {
            id,
            name,
            info,
            steps,
            generation: 0,
            structural_hash,
        }
    }

    pub fn compute_structural_hash(steps: &[Step]) -> String {
        structural_hash(
            steps
                .iter()
                .map(|s| (s.header.as_str(), s.command.as_deref())),
        )
    }

    /// Index of the first non-terminal step, or `steps.len()` if all are terminal.
    pub fn frontier(&self) -> usize {
        self.steps
            .iter()
            .position(|s| !s.status.is_terminal())
            .unwrap_or(self.steps.len())
    }

    pub fn all_done(&self) -> bool {
        self.steps.iter().all(|s| s.status.is_terminal())
    }

    pub fn is_running(&self) -> bool {
        self.steps.iter().any(|s| s.status.is_running())
    }

    pub fn running_step_index(&self) -> Option<usize> {
        self.steps.iter().position(|s| s.status.is_running())
    }
}
