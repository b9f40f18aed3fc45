// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Step status state machine.

use serde::{Deserialize, Serialize};

/// Status of a single step.
///
/// Terminal: [`Status::Success`], [`Status::Failed`], [`Status::Killed`],
/// [`Status::Skipped`]. Non-terminal: [`Status::Pending`], [`Status::Running`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Pending,
    Running,
    Success,
    Failed,
    Killed,
    Skipped,
}

impl Status {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Status::Success | Status::Failed | Status::Killed | Status::Skipped
        )
    }

    pub fn is_running(self) -> bool {
        matches!(self, Status::Running)
    }
}

crate::simple_display! {
    Status {
        Pending => "pending",
        Running => "running",
        Success => "success",
        Failed => "failed",
        Killed => "killed",
        Skipped => "skipped",
    }
}
