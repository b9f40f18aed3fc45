// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI argument surface for the `oj` binary.

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "oj",
    version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("BUILD_GIT_HASH"), ")"),
    about = "Run a workflow of independent tasks, watching progress live",
    styles = crate::color::styles()
)]
pub struct Cli {
    /// Workflow file to run (.csv, .yml, or .yaml).
    pub workflow: PathBuf,

    /// Maximum number of tasks to run in parallel. Defaults to the number
    /// of logical CPUs (falling back to 4 if that can't be detected).
    /// Values below 1 are clamped to 1.
    #[arg(long, default_value_t = default_workers())]
    pub workers: usize,

    /// Title shown in the dashboard header. Defaults to the workflow's
    /// file name.
    #[arg(long)]
    pub title: Option<String>,

    /// Convert a CSV workflow to the YAML format at this path, then exit
    /// without running anything.
    #[arg(long, value_name = "PATH")]
    pub to_yaml: Option<PathBuf>,

    /// Write logs here instead of `.oddjobs.log` beside the workflow file.
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Directory for state and per-step logs. Defaults to the workflow
    /// file's own directory.
    #[arg(long)]
    pub state_dir: Option<PathBuf>,

    /// Raise the tracing filter (stackable: -v, -vv).
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Number of logical CPUs, or 4 if detection fails.
fn default_workers() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4)
}
