// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The canonical task/step state and its snapshot/command surface.
//!
//! All mutation flows through [`Model`]'s re-entrant mutex so that a status
//! transition can itself trigger a nested mutation (e.g. marking downstream
//! steps `SKIPPED`) inside the same critical section without deadlocking.

use crate::status::Status;
use crate::task::{StepRuntime, Task, TaskId};
use parking_lot::{ReentrantMutex, ReentrantMutexGuard};
use std::cell::RefCell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Engine-side hook the Model uses to request process-level work.
///
/// Implemented by the Execution Engine; injected into the Model at startup
/// so the Model never has to know how a task-run is actually carried out.
pub trait Dispatch: Send + Sync {
    /// Ask the engine to run `task_index` starting at `start_step` under
    /// the given generation. The engine must abort silently if by the time
    /// it acts the task's generation has advanced past `generation`.
    fn dispatch(&self, task_index: usize, start_step: usize, generation: u64);

    /// Ask the engine to terminate the task's active process group, if any.
    /// `generation` is the generation the still-running step was dispatched
    /// under (i.e. the generation *before* the caller's own bump), matching
    /// whatever the engine recorded at dispatch time. A no-op if nothing is
    /// running for that task under that generation.
    fn request_kill(&self, task_index: usize, generation: u64);
}

struct Inner {
    tasks: Vec<Task>,
    dispatcher: Option<Arc<dyn Dispatch>>,
}

/// The canonical task/step state, shared between the Controller and the
/// Execution Engine.
pub struct Model {
    inner: ReentrantMutex<RefCell<Inner>>,
    dirty: AtomicBool,
}

/// Immutable, cheap-to-clone projection of one step for rendering.
#[derive(Debug, Clone)]
pub struct StepSnapshot {
    pub header: String,
    pub status: Status,
    pub output_tail: Vec<String>,
    pub debug_tail: Vec<String>,
}

/// Immutable, cheap-to-clone projection of one task for rendering.
#[derive(Debug, Clone)]
pub struct TaskSnapshot {
    pub id: TaskId,
    pub name: String,
    pub info: String,
    pub generation: u64,
    pub steps: Vec<StepSnapshot>,
}

impl TaskSnapshot {
    pub fn all_done(&self) -> bool {
        self.steps.iter().all(|s| s.status.is_terminal())
    }
}

/// Immutable projection of the whole Model, consumed by the View.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub tasks: Vec<TaskSnapshot>,
}

impl Snapshot {
    pub fn all_done(&self) -> bool {
        self.tasks.iter().all(TaskSnapshot::all_done)
    }
}

impl Model {
    pub fn new(tasks: Vec<Task>) -> Self {
        Self {
            inner: ReentrantMutex::new(RefCell::new(Inner {
                tasks,
                dispatcher: None,
            })),
            dirty: AtomicBool::new(true),
        }
    }

    fn lock(&self) -> ReentrantMutexGuard<'_, RefCell<Inner>> {
        self.inner.lock()
    }

    pub fn set_dispatcher(&self, dispatcher: Arc<dyn Dispatch>) {
        self.lock().borrow_mut().dispatcher = Some(dispatcher);
    }

    fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::Release);
    }

    /// Returns whether the model changed since the last call, clearing the flag.
    pub fn take_dirty(&self) -> bool {
        self.dirty.swap(false, Ordering::AcqRel)
    }

    pub fn task_count(&self) -> usize {
        self.lock().borrow().tasks.len()
    }

    /// Dispatch every task that isn't already fully done, starting at its
    /// current frontier. Called once at startup after reconciliation.
    pub fn start_all(&self) {
        let guard = self.lock();
        let inner = guard.borrow();
        let Some(dispatcher) = inner.dispatcher.clone() else {
            return;
        };
        for (idx, task) in inner.tasks.iter().enumerate() {
            if !task.all_done() {
                dispatcher.dispatch(idx, task.frontier(), task.generation);
            }
        }
        drop(inner);
        drop(guard);
        self.mark_dirty();
    }

    /// Increment `task_idx`'s generation, reset `step_idx..` to `PENDING`,
    /// cancel any live run, and schedule a fresh run from `step_idx`.
    pub fn rerun(&self, task_idx: usize, step_idx: usize) {
        let guard = self.lock();
        let mut inner = guard.borrow_mut();
        let Some(task) = inner.tasks.get_mut(task_idx) else {
            return;
        };
        if step_idx > task.steps.len() {
            return;
        }
        let prior_generation = task.generation;
        task.generation += 1;
        let generation = task.generation;
        for step in &mut task.steps[step_idx..] {
            step.reset();
        }
        let dispatcher = inner.dispatcher.clone();
        drop(inner);
        drop(guard);
        self.mark_dirty();
        if let Some(dispatcher) = dispatcher {
            // The registry keys a running process group by the generation
            // it was dispatched under, which is `prior_generation` here —
            // not the freshly-bumped one a new dispatch will run under.
            dispatcher.request_kill(task_idx, prior_generation);
            dispatcher.dispatch(task_idx, step_idx, generation);
        }
    }

    /// Increment `task_idx`'s generation, ask the engine to terminate its
    /// process group, and immediately commit `KILLED` for the running step.
    pub fn kill(&self, task_idx: usize) {
        let guard = self.lock();
        let mut inner = guard.borrow_mut();
        let Some(task) = inner.tasks.get_mut(task_idx) else {
            return;
        };
        let prior_generation = task.generation;
        task.generation += 1;
        let running = task.running_step_index();
        if let Some(i) = running {
            task.steps[i].status = Status::Killed;
            task.steps[i].runtime = None;
        }
        let dispatcher = inner.dispatcher.clone();
        drop(inner);
        drop(guard);
        self.mark_dirty();
        if let Some(dispatcher) = dispatcher {
            // See the comment in `rerun`: the registry keys on the
            // generation the process group was dispatched under.
            dispatcher.request_kill(task_idx, prior_generation);
        }
    }

    /// Record that `step_idx` has started running under `generation`.
    /// No-op if `generation` is stale.
    pub fn begin_running(
        &self,
        task_idx: usize,
        step_idx: usize,
        generation: u64,
        pid: i32,
        pgid: i32,
        started_at: Instant,
    ) {
        let guard = self.lock();
        let mut inner = guard.borrow_mut();
        let Some(task) = inner.tasks.get_mut(task_idx) else {
            return;
        };
        if task.generation != generation {
            return;
        }
        let Some(step) = task.steps.get_mut(step_idx) else {
            return;
        };
        step.status = Status::Running;
        step.runtime = Some(StepRuntime {
            pid,
            pgid,
            started_at,
            ended_at: None,
            generation,
        });
        drop(inner);
        drop(guard);
        self.mark_dirty();
    }

    /// Commit a terminal transition for `step_idx`. If the new status is not
    /// `SUCCESS` (and not itself `SKIPPED` from an empty command), every
    /// later step in the task is marked `SKIPPED` in the same operation.
    /// No-op if `generation` is stale (the zombie-writer guard).
    pub fn transition(&self, task_idx: usize, step_idx: usize, generation: u64, new_status: Status) {
        let guard = self.lock();
        let mut inner = guard.borrow_mut();
        let Some(task) = inner.tasks.get_mut(task_idx) else {
            return;
        };
        if task.generation != generation {
            return;
        }
        let Some(step) = task.steps.get_mut(step_idx) else {
            return;
        };
        step.status = new_status;
        if let Some(rt) = &mut step.runtime {
            rt.ended_at = Some(Instant::now());
        }
        let should_skip_rest = new_status != Status::Success;
        drop(inner);
        drop(guard);
        if should_skip_rest {
            // Re-entrant: we already released the outer borrow, but the
            // mutex itself may still be held by an engine callback further
            // up the call stack — this is exactly the nesting the
            // re-entrant lock exists for.
            self.skip_from(task_idx, step_idx + 1, generation);
        }
        self.mark_dirty();
    }

    fn skip_from(&self, task_idx: usize, from: usize, generation: u64) {
        let guard = self.lock();
        let mut inner = guard.borrow_mut();
        let Some(task) = inner.tasks.get_mut(task_idx) else {
            return;
        };
        if task.generation != generation {
            return;
        }
        for step in &mut task.steps[from.min(task.steps.len())..] {
            step.status = Status::Skipped;
            step.runtime = None;
        }
    }

    /// Append a line to `step_idx`'s output tail. No-op if `generation` is stale.
    pub fn append_output(&self, task_idx: usize, step_idx: usize, generation: u64, line: String) {
        self.append(task_idx, step_idx, generation, line, false);
    }

    /// Append a line to `step_idx`'s debug tail. No-op if `generation` is stale.
    pub fn append_debug(&self, task_idx: usize, step_idx: usize, generation: u64, line: String) {
        self.append(task_idx, step_idx, generation, line, true);
    }

    fn append(&self, task_idx: usize, step_idx: usize, generation: u64, line: String, debug: bool) {
        let guard = self.lock();
        let mut inner = guard.borrow_mut();
        let Some(task) = inner.tasks.get_mut(task_idx) else {
            return;
        };
        if task.generation != generation {
            return;
        }
        let Some(step) = task.steps.get_mut(step_idx) else {
            return;
        };
        if debug {
            step.debug.push(line);
        } else {
            step.output.push(line);
        }
        drop(inner);
        drop(guard);
        self.mark_dirty();
    }

    /// Mark `step_idx` `SKIPPED` without spawning (empty command). No-op if
    /// `generation` is stale.
    pub fn skip_noop(&self, task_idx: usize, step_idx: usize, generation: u64) {
        let guard = self.lock();
        let mut inner = guard.borrow_mut();
        let Some(task) = inner.tasks.get_mut(task_idx) else {
            return;
        };
        if task.generation != generation {
            return;
        }
        let Some(step) = task.steps.get_mut(step_idx) else {
            return;
        };
        step.status = Status::Skipped;
        drop(inner);
        drop(guard);
        self.mark_dirty();
    }

    pub fn current_generation(&self, task_idx: usize) -> Option<u64> {
        self.lock().borrow().tasks.get(task_idx).map(|t| t.generation)
    }

    pub fn all_done(&self) -> bool {
        self.lock().borrow().tasks.iter().all(Task::all_done)
    }

    /// Mark every currently-`RUNNING` step `KILLED`, without touching the
    /// generation counter or issuing a dispatch. Used on clean exit after
    /// the engine has signaled all process groups.
    pub fn kill_all_running(&self) {
        let guard = self.lock();
        let mut inner = guard.borrow_mut();
        for task in &mut inner.tasks {
            for step in &mut task.steps {
                if step.status == Status::Running {
                    step.status = Status::Killed;
                    step.runtime = None;
                }
            }
        }
        drop(inner);
        drop(guard);
        self.mark_dirty();
    }

    pub fn snapshot(&self) -> Snapshot {
        let guard = self.lock();
        let inner = guard.borrow();
        let tasks = inner
            .tasks
            .iter()
            .map(|t| TaskSnapshot {
                id: t.id.clone(),
                name: t.name.clone(),
                info: t.info.clone(),
                generation: t.generation,
                steps: t
                    .steps
                    .iter()
                    .map(|s| StepSnapshot {
                        header: s.header.clone(),
                        status: s.status,
                        output_tail: s.output.to_vec(),
                        debug_tail: s.debug.to_vec(),
                    })
                    .collect(),
            })
            .collect();
        Snapshot { tasks }
    }

    /// Run a closure with read access to the raw tasks (used by the State
    /// Store on checkpoint/flush; not part of the public command surface).
    pub fn with_tasks<R>(&self, f: impl FnOnce(&[Task]) -> R) -> R {
        let guard = self.lock();
        let inner = guard.borrow();
        f(&inner.tasks)
    }

    /// Apply a mutation to the raw tasks (used once at startup to reconcile
    /// loaded state before the engine starts dispatching).
    pub fn with_tasks_mut<R>(&self, f: impl FnOnce(&mut [Task]) -> R) -> R {
        let guard = self.lock();
        let mut inner = guard.borrow_mut();
        let r = f(&mut inner.tasks);
        drop(inner);
        drop(guard);
        self.mark_dirty();
        r
    }
}

#[cfg(test)]
#[path = "model_tests.rs"]
mod tests;
