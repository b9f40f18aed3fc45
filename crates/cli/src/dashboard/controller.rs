// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The event loop: drains input events, issues rerun/kill against the
//! Model, ticks the View, and commits state on exit.

use crate::dashboard::view::{RenderState, View};
use oj_core::{Dispatch, Model};
use oj_storage::StateStore;
use std::sync::Arc;
use std::time::Duration;

/// Smart-refresh cadence: redraw at most this often (§4.E).
const TICK: Duration = Duration::from_millis(66);

pub struct Controller<V: View> {
    model: Arc<Model>,
    dispatcher: Arc<dyn Dispatch>,
    store: StateStore,
    view: V,
    selected: usize,
    show_debug: bool,
    output_scroll: usize,
    debug_scroll: usize,
}

impl<V: View> Controller<V> {
    pub fn new(model: Arc<Model>, dispatcher: Arc<dyn Dispatch>, store: StateStore, view: V) -> Self {
        Self {
            model,
            dispatcher,
            store,
            view,
            selected: 0,
            show_debug: false,
            output_scroll: 0,
            debug_scroll: 0,
        }
    }

    /// Run until the user quits or every task reaches a terminal state and
    /// `exit_when_done` is set. Flushes state and tears down the View
    /// before returning.
    pub fn run(&mut self, poll_events: impl Fn(Duration) -> std::io::Result<Option<ControllerEvent>>) {
        loop {
            match poll_events(TICK) {
                Ok(Some(event)) => {
                    if self.handle_event(event) {
                        break;
                    }
                }
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!(%err, "input poll failed");
                }
            }
            if self.model.take_dirty() {
                self.checkpoint();
            }
            self.redraw();
        }
        self.shutdown();
    }

    fn redraw(&mut self) {
        let snapshot = self.model.snapshot();
        let state = RenderState {
            selected: self.selected,
            show_debug: self.show_debug,
            output_scroll: self.output_scroll,
            debug_scroll: self.debug_scroll,
        };
        self.view.render(&snapshot, &state);
    }

    /// Returns `true` if the event requests shutdown.
    fn handle_event(&mut self, event: ControllerEvent) -> bool {
        let count = self.model.task_count();
        match event {
            ControllerEvent::Up => self.selected = self.selected.saturating_sub(1),
            ControllerEvent::Down => {
                if count > 0 {
                    self.selected = (self.selected + 1).min(count - 1);
                }
            }
            ControllerEvent::Home => self.output_scroll = 0,
            ControllerEvent::End => self.output_scroll = 0,
            ControllerEvent::PageUp => self.output_scroll = self.output_scroll.saturating_add(10),
            ControllerEvent::PageDown => self.output_scroll = self.output_scroll.saturating_sub(10),
            ControllerEvent::Rerun => self.rerun_selected(),
            ControllerEvent::Kill => self.model.kill(self.selected),
            ControllerEvent::ToggleDebug => self.show_debug = !self.show_debug,
            ControllerEvent::ScrollOutputUp => self.output_scroll = self.output_scroll.saturating_add(1),
            ControllerEvent::ScrollOutputDown => self.output_scroll = self.output_scroll.saturating_sub(1),
            ControllerEvent::ScrollDebugUp => self.debug_scroll = self.debug_scroll.saturating_add(1),
            ControllerEvent::ScrollDebugDown => self.debug_scroll = self.debug_scroll.saturating_sub(1),
            ControllerEvent::Quit => return true,
        }
        false
    }

    fn rerun_selected(&mut self) {
        let frontier = self
            .model
            .with_tasks(|tasks| tasks.get(self.selected).map(|t| t.frontier()));
        if let Some(step_idx) = frontier {
            self.model.rerun(self.selected, step_idx);
        }
    }

    fn checkpoint(&self) {
        self.model.with_tasks(|tasks| {
            if let Err(err) = self.store.save(tasks) {
                tracing::warn!(%err, "failed to checkpoint state");
            }
        });
    }

    fn shutdown(&mut self) {
        self.model.with_tasks(|tasks| {
            for (idx, task) in tasks.iter().enumerate() {
                if task.is_running() {
                    self.dispatcher.request_kill(idx, task.generation);
                }
            }
        });
        self.model.kill_all_running();
        self.checkpoint();
        self.view.teardown();
    }
}

/// Terminal-agnostic input event. Translating `crossterm::event::Event`
/// into this is the only place that knows about a real terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerEvent {
    Up,
    Down,
    Home,
    End,
    PageUp,
    PageDown,
    Rerun,
    Kill,
    ToggleDebug,
    ScrollOutputUp,
    ScrollOutputDown,
    ScrollDebugUp,
    ScrollDebugDown,
    Quit,
}

/// Poll real terminal input via `crossterm` and translate it (§6 keybindings).
pub fn poll_crossterm_event(timeout: Duration) -> std::io::Result<Option<ControllerEvent>> {
    use crossterm::event::{self, Event, KeyCode, KeyEventKind};

    if !event::poll(timeout)? {
        return Ok(None);
    }
    let Event::Key(key) = event::read()? else {
        return Ok(None);
    };
    if key.kind != KeyEventKind::Press {
        return Ok(None);
    }
    Ok(match key.code {
        KeyCode::Up => Some(ControllerEvent::Up),
        KeyCode::Down => Some(ControllerEvent::Down),
        KeyCode::Home => Some(ControllerEvent::Home),
        KeyCode::End => Some(ControllerEvent::End),
        KeyCode::PageUp => Some(ControllerEvent::PageUp),
        KeyCode::PageDown => Some(ControllerEvent::PageDown),
        KeyCode::Char('r') => Some(ControllerEvent::Rerun),
        KeyCode::Char('k') => Some(ControllerEvent::Kill),
        KeyCode::Char('d') => Some(ControllerEvent::ToggleDebug),
        KeyCode::Char('[') => Some(ControllerEvent::ScrollOutputUp),
        KeyCode::Char(']') => Some(ControllerEvent::ScrollOutputDown),
        KeyCode::Char('{') => Some(ControllerEvent::ScrollDebugUp),
        KeyCode::Char('}') => Some(ControllerEvent::ScrollDebugDown),
        KeyCode::Char('q') | KeyCode::Esc => Some(ControllerEvent::Quit),
        _ => None,
    })
}
