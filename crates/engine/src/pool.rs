// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The bounded worker pool: a fixed number of OS threads pull whole
//! task-runs off a queue and execute their steps sequentially, spawning
//! each command in its own process group and streaming its output into
//! the Model.
//!
//! This is the part of the system that actually does the work described
//! by [`oj_core::Dispatch`]. Every write into the Model is guarded by the
//! generation it was dispatched under, so a worker that is still running
//! a step the user has since killed or rerun simply finds its writes
//! dropped on the floor instead of corrupting newer state.

use crate::error::EngineError;
use crate::io_stream::{self, Sink};
use crate::logpaths;
use crate::spawn::{self, KILL_GRACE_PERIOD};
use command_group::GroupChild;
use nix::sys::signal::Signal;
use oj_core::{Dispatch, Model, Status};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Instant;

/// One unit of work handed from the Model to the pool: run `task_idx`
/// starting at `start_step`, under `generation`.
struct TaskRun {
    task_idx: usize,
    start_step: usize,
    generation: u64,
}

/// What we need to remember about a task's live process group in order to
/// service a later `request_kill`.
#[derive(Clone, Copy)]
struct RunningGroup {
    pgid: i32,
    generation: u64,
}

/// Bounded pool of worker threads executing task-runs against a shared
/// [`Model`].
pub struct WorkerPool {
    sender: mpsc::Sender<TaskRun>,
    running: Arc<Mutex<HashMap<usize, RunningGroup>>>,
}

impl WorkerPool {
    /// Spawn `max_workers` worker threads (clamped to at least 1) sharing
    /// `model` and writing step logs under `logs_root`.
    pub fn new(
        model: Arc<Model>,
        logs_root: PathBuf,
        max_workers: usize,
    ) -> Result<Arc<Self>, EngineError> {
        std::fs::create_dir_all(&logs_root).map_err(|source| EngineError::LogDir {
            path: logs_root.clone(),
            source,
        })?;

        let max_workers = max_workers.max(1);
        let (sender, receiver) = mpsc::channel::<TaskRun>();
        let receiver = Arc::new(Mutex::new(receiver));
        let running = Arc::new(Mutex::new(HashMap::new()));

        let pool = Arc::new(Self { sender, running: running.clone() });

        for worker_id in 0..max_workers {
            let receiver = receiver.clone();
            let model = model.clone();
            let logs_root = logs_root.clone();
            let running = running.clone();
            spawn_worker_thread(worker_id, receiver, model, logs_root, running);
        }

        Ok(pool)
    }
}

#[allow(clippy::expect_used)]
fn spawn_worker_thread(
    worker_id: usize,
    receiver: Arc<Mutex<mpsc::Receiver<TaskRun>>>,
    model: Arc<Model>,
    logs_root: PathBuf,
    running: Arc<Mutex<HashMap<usize, RunningGroup>>>,
) {
    // A failure here means the OS cannot create threads at all; nothing
    // useful can be done but to crash at startup.
    std::thread::Builder::new()
        .name(format!("oj-worker-{worker_id}"))
        .spawn(move || worker_loop(worker_id, receiver, model, logs_root, running))
        .expect("failed to spawn worker thread");
}

impl Dispatch for WorkerPool {
    fn dispatch(&self, task_index: usize, start_step: usize, generation: u64) {
        let _ = self.sender.send(TaskRun { task_idx: task_index, start_step, generation });
    }

    fn request_kill(&self, task_index: usize, generation: u64) {
        let group = self.running.lock().get(&task_index).copied();
        let Some(group) = group else {
            return;
        };
        if group.generation != generation {
            return;
        }
        let running = self.running.clone();
        std::thread::spawn(move || escalate_kill(task_index, group, running));
    }
}

fn escalate_kill(
    task_idx: usize,
    group: RunningGroup,
    running: Arc<Mutex<HashMap<usize, RunningGroup>>>,
) {
    spawn::signal_group(group.pgid, Signal::SIGTERM);
    std::thread::sleep(KILL_GRACE_PERIOD);
    let still_live = running
        .lock()
        .get(&task_idx)
        .is_some_and(|g| g.pgid == group.pgid && g.generation == group.generation);
    if still_live {
        spawn::signal_group(group.pgid, Signal::SIGKILL);
    }
}

fn worker_loop(
    worker_id: usize,
    receiver: Arc<Mutex<mpsc::Receiver<TaskRun>>>,
    model: Arc<Model>,
    logs_root: PathBuf,
    running: Arc<Mutex<HashMap<usize, RunningGroup>>>,
) {
    loop {
        let run = {
            let rx = receiver.lock();
            rx.recv()
        };
        let Ok(run) = run else {
            // Sender dropped: pool is shutting down.
            return;
        };
        tracing::debug!(worker_id, task_idx = run.task_idx, generation = run.generation, "picked up task-run");
        run_task(&model, &logs_root, &running, run);
    }
}

fn run_task(
    model: &Arc<Model>,
    logs_root: &std::path::Path,
    running: &Mutex<HashMap<usize, RunningGroup>>,
    run: TaskRun,
) {
    let TaskRun { task_idx, start_step, generation } = run;

    let (task_id, step_count) = match model.with_tasks(|tasks| {
        tasks.get(task_idx).map(|t| (t.id.clone(), t.steps.len()))
    }) {
        Some(v) => v,
        None => return,
    };

    for step_idx in start_step..step_count {
        if model.current_generation(task_idx) != Some(generation) {
            return;
        }

        let command = model
            .with_tasks(|tasks| tasks[task_idx].steps[step_idx].command.clone());

        let Some(command) = command else {
            model.skip_noop(task_idx, step_idx, generation);
            continue;
        };

        match run_step(model, logs_root, running, task_idx, &task_id, step_idx, generation, &command) {
            Status::Success => continue,
            _ => return,
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn run_step(
    model: &Arc<Model>,
    logs_root: &std::path::Path,
    running: &Mutex<HashMap<usize, RunningGroup>>,
    task_idx: usize,
    task_id: &oj_core::TaskId,
    step_idx: usize,
    generation: u64,
    command: &str,
) -> Status {
    let mut child: GroupChild = match spawn::spawn(command) {
        Ok(child) => child,
        Err(err) => {
            model.append_debug(task_idx, step_idx, generation, format!("spawn error: {err}"));
            model.transition(task_idx, step_idx, generation, Status::Failed);
            return Status::Failed;
        }
    };

    let pid = child.id() as i32;
    model.begin_running(task_idx, step_idx, generation, pid, pid, Instant::now());
    running.lock().insert(task_idx, RunningGroup { pgid: pid, generation });

    let stdout = child.inner().stdout.take();
    let stderr = child.inner().stderr.take();
    let stdout_handle = stdout.map(|r| {
        io_stream::spawn_tail_thread(
            r,
            logpaths::stdout_path(logs_root, task_id, step_idx),
            model.clone(),
            task_idx,
            step_idx,
            generation,
            Sink::Output,
        )
    });
    let stderr_handle = stderr.map(|r| {
        io_stream::spawn_tail_thread(
            r,
            logpaths::stderr_path(logs_root, task_id, step_idx),
            model.clone(),
            task_idx,
            step_idx,
            generation,
            Sink::Debug,
        )
    });

    let wait_result = child.wait();

    {
        let mut guard = running.lock();
        if guard.get(&task_idx).is_some_and(|g| g.pgid == pid && g.generation == generation) {
            guard.remove(&task_idx);
        }
    }

    if let Some(h) = stdout_handle {
        let _ = h.join();
    }
    if let Some(h) = stderr_handle {
        let _ = h.join();
    }

    let new_status = match wait_result {
        Ok(status) => status_from_exit(status),
        Err(err) => {
            model.append_debug(task_idx, step_idx, generation, format!("wait error: {err}"));
            Status::Failed
        }
    };

    model.transition(task_idx, step_idx, generation, new_status);
    new_status
}

fn status_from_exit(status: std::process::ExitStatus) -> Status {
    use std::os::unix::process::ExitStatusExt;
    if status.signal().is_some() {
        Status::Killed
    } else if status.success() {
        Status::Success
    } else {
        Status::Failed
    }
}
