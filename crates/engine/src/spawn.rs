// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process spawning in a fresh process group, and the escalating kill
//! protocol (`SIGTERM`, then `SIGKILL` after a grace period) used to tear
//! one down.

use command_group::{CommandGroup, GroupChild};
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use std::process::{Command, Stdio};
use std::time::Duration;

/// How long to wait after `SIGTERM` before escalating to `SIGKILL`.
pub const KILL_GRACE_PERIOD: Duration = Duration::from_secs(2);

/// Spawn `command` under `/bin/sh -c`, in its own process group so the
/// whole subtree can be torn down with a single signal to the group.
pub fn spawn(command: &str) -> std::io::Result<GroupChild> {
    let mut cmd = Command::new("/bin/sh");
    cmd.arg("-c")
        .arg(command)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    cmd.group_spawn()
}

/// Send `signal` to the process group led by `pgid`. Absence of the group
/// (already reaped) is not an error.
pub fn signal_group(pgid: i32, signal: Signal) {
    let target = Pid::from_raw(-pgid);
    if let Err(err) = signal::kill(target, signal) {
        tracing::debug!(pgid, %err, ?signal, "signal delivery to process group failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_runs_a_command_and_reports_success() {
        let mut child = spawn("true").unwrap();
        let status = child.wait().unwrap();
        assert!(status.success());
    }

    #[test]
    fn signal_group_on_dead_pgid_does_not_panic() {
        // An implausible pgid: delivering to it should fail quietly (ESRCH).
        signal_group(999_999, Signal::SIGTERM);
    }
}
