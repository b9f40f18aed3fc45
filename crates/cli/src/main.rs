// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! `oj`: run a workflow of independent, multi-step tasks with bounded
//! parallelism, watching progress in a live terminal dashboard.

mod cli;
mod color;
mod dashboard;
mod exit_error;

use clap::Parser;
use cli::Cli;
use dashboard::{poll_crossterm_event, Controller, HeadlessView, TerminalView};
use exit_error::ExitError;
use oj_core::{Dispatch, Model};
use oj_engine::WorkerPool;
use oj_storage::StateStore;
use std::collections::HashMap;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Arc;

fn main() {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => {}
        Err(err) => {
            eprintln!("oj: {err}");
            std::process::exit(err.code);
        }
    }
}

fn run(cli: Cli) -> Result<(), ExitError> {
    init_tracing(&cli);

    if let Some(out_path) = &cli.to_yaml {
        oj_runbook::convert_to_yaml(&cli.workflow, out_path)
            .map_err(|e| ExitError::new(1, format!("failed to convert workflow: {e}")))?;
        return Ok(());
    }

    let workflow = oj_runbook::load(&cli.workflow)
        .map_err(|e| ExitError::new(1, format!("failed to load workflow: {e}")))?;
    let mut tasks = workflow.into_tasks();
    if tasks.is_empty() {
        return Err(ExitError::new(1, "workflow defines no tasks"));
    }

    let current_hashes: HashMap<String, String> = tasks
        .iter()
        .map(|t| (t.id.as_str().to_string(), t.structural_hash.clone()))
        .collect();

    let state_path = state_file_path(&cli, &cli.workflow);
    let store = StateStore::new(state_path);
    let persisted = store.load(&current_hashes);
    for task in &mut tasks {
        if let Some(p) = persisted.get(task.id.as_str()) {
            oj_storage::reconcile(task, p);
        }
    }

    let logs_root = logs_root_path(&cli, &cli.workflow);
    let model = Arc::new(Model::new(tasks));
    let pool = WorkerPool::new(model.clone(), logs_root, cli.workers)
        .map_err(|e| ExitError::new(2, format!("failed to start engine: {e}")))?;
    model.set_dispatcher(pool.clone() as Arc<dyn Dispatch>);
    model.start_all();

    let title = cli.title.clone().unwrap_or_else(|| workflow_title(&cli.workflow));

    if std::io::stdout().is_terminal() {
        let view = TerminalView::new(title)
            .map_err(|e| ExitError::new(2, format!("failed to initialize terminal: {e}")))?;
        let mut controller = Controller::new(model, pool.clone() as Arc<dyn Dispatch>, store, view);
        controller.run(poll_crossterm_event);
    } else {
        // No TTY (piped output, CI): run headless until every task is done.
        let mut controller =
            Controller::new(model.clone(), pool.clone() as Arc<dyn Dispatch>, store, HeadlessView::default());
        controller.run(move |timeout| {
            std::thread::sleep(timeout);
            if model.all_done() {
                Ok(Some(dashboard::ControllerEvent::Quit))
            } else {
                Ok(None)
            }
        });
    }

    Ok(())
}

fn init_tracing(cli: &Cli) {
    use tracing_subscriber::EnvFilter;

    let default_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_env("OJ_LOG").unwrap_or_else(|_| EnvFilter::new(default_level));

    let log_path = cli
        .log_file
        .clone()
        .unwrap_or_else(|| sibling_path(&cli.workflow, ".oddjobs.log"));
    let writer = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path);

    match writer {
        Ok(file) => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(move || clone_log_handle(&file))
                .try_init();
        }
        Err(_) => {
            // Can't open the log file (e.g. read-only directory): fall back
            // to stderr rather than silently dropping every log line.
            let _ = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init();
        }
    }
}

/// The log file was just opened successfully, so a clone of its handle is
/// expected to succeed too; if the OS is out of file descriptors there is
/// nothing more graceful to do than drop the line.
#[allow(clippy::expect_used)]
fn clone_log_handle(file: &std::fs::File) -> std::fs::File {
    file.try_clone().expect("clone log file handle")
}

fn sibling_path(workflow_path: &Path, file_name: &str) -> PathBuf {
    workflow_path.parent().unwrap_or_else(|| Path::new(".")).join(file_name)
}

fn state_file_path(cli: &Cli, workflow_path: &Path) -> PathBuf {
    match &cli.state_dir {
        Some(dir) => {
            let basename =
                workflow_path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
            dir.join(format!(".{basename}.state.json"))
        }
        None => oj_storage::state_path_for(workflow_path),
    }
}

fn logs_root_path(cli: &Cli, _workflow_path: &Path) -> PathBuf {
    match &cli.state_dir {
        Some(dir) => dir.join("logs"),
        None => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")).join(".logs"),
    }
}

fn workflow_title(workflow_path: &Path) -> String {
    workflow_path.file_stem().map(|n| n.to_string_lossy().into_owned()).unwrap_or_else(|| "oj".to_string())
}
