// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The rendering contract and its two implementations. Full layout,
//! scrolling, and paging are out of scope here — the Controller owns the
//! state to scroll/page, and this module only ever paints what it's told.

use oj_core::{Snapshot, Status, TaskSnapshot};

/// What the Controller wants painted on the next frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderState {
    pub selected: usize,
    pub show_debug: bool,
    pub output_scroll: usize,
    pub debug_scroll: usize,
}

pub trait View {
    fn render(&mut self, snapshot: &Snapshot, state: &RenderState);

    /// Restore the terminal to its pre-dashboard state. Called once, on exit.
    fn teardown(&mut self) {}
}

/// Records every frame it was given; used by Controller tests so they don't
/// need a real terminal.
#[derive(Default)]
pub struct HeadlessView {
    pub frames: Vec<(Snapshot, RenderState)>,
}

impl View for HeadlessView {
    fn render(&mut self, snapshot: &Snapshot, state: &RenderState) {
        self.frames.push((snapshot.clone(), *state));
    }
}

/// Thin `crossterm`-based painter: one line per task, then the selected
/// task's output (and, if toggled, debug) tail below.
pub struct TerminalView {
    out: std::io::Stdout,
    title: String,
}

impl TerminalView {
    pub fn new(title: String) -> std::io::Result<Self> {
        use crossterm::{cursor, execute, terminal};
        terminal::enable_raw_mode()?;
        let mut out = std::io::stdout();
        execute!(out, terminal::EnterAlternateScreen, cursor::Hide)?;
        Ok(Self { out, title })
    }

    fn paint(&mut self, snapshot: &Snapshot, state: &RenderState) -> std::io::Result<()> {
        use crossterm::{cursor, queue, style::Print, terminal::{Clear, ClearType}};
        use std::io::Write;

        queue!(self.out, Clear(ClearType::All), cursor::MoveTo(0, 0))?;
        queue!(self.out, Print(format!("{}\r\n\r\n", crate::color::header(&self.title))))?;

        for (idx, task) in snapshot.tasks.iter().enumerate() {
            let marker = if idx == state.selected { '>' } else { ' ' };
            let glyphs: String =
                task.steps.iter().map(|s| status_glyph(s.status)).collect::<Vec<_>>().join(" ");
            let name = crate::color::literal(&task.name);
            let info =
                if task.info.is_empty() { String::new() } else { crate::color::context(&format!("  {}", task.info)) };
            queue!(self.out, Print(format!("{marker} {name:<24} {glyphs}{info}\r\n")))?;
        }

        if let Some(task) = snapshot.tasks.get(state.selected) {
            let divider = crate::color::muted(&format!("-- {} / output --", task.name));
            queue!(self.out, Print(format!("\r\n{divider}\r\n")))?;
            for line in windowed(current_output(task), state.output_scroll) {
                queue!(self.out, Print(format!("{line}\r\n")))?;
            }
            if state.show_debug {
                queue!(self.out, Print(format!("\r\n{}\r\n", crate::color::muted("-- debug --"))))?;
                for line in windowed(current_debug(task), state.debug_scroll) {
                    queue!(self.out, Print(format!("{line}\r\n")))?;
                }
            }
        }

        self.out.flush()
    }
}

impl View for TerminalView {
    fn render(&mut self, snapshot: &Snapshot, state: &RenderState) {
        if let Err(err) = self.paint(snapshot, state) {
            tracing::warn!(%err, "failed to paint frame");
        }
    }

    fn teardown(&mut self) {
        use crossterm::{cursor, execute, terminal};
        let _ = execute!(self.out, cursor::Show, terminal::LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();
    }
}

fn status_glyph(status: Status) -> char {
    match status {
        Status::Pending => '.',
        Status::Running => '>',
        Status::Success => '+',
        Status::Failed => 'x',
        Status::Killed => '!',
        Status::Skipped => '-',
    }
}

/// The most recently touched step's output tail — the one a viewer of a
/// single-task row would actually want to see.
fn current_output(task: &TaskSnapshot) -> &[String] {
    task.steps
        .iter()
        .rev()
        .find(|s| !s.output_tail.is_empty() || s.status == Status::Running)
        .map(|s| s.output_tail.as_slice())
        .unwrap_or(&[])
}

fn current_debug(task: &TaskSnapshot) -> &[String] {
    task.steps
        .iter()
        .rev()
        .find(|s| !s.debug_tail.is_empty() || s.status == Status::Running)
        .map(|s| s.debug_tail.as_slice())
        .unwrap_or(&[])
}

const WINDOW: usize = 12;

fn windowed(lines: &[String], scroll: usize) -> &[String] {
    let end = lines.len().saturating_sub(scroll);
    let start = end.saturating_sub(WINDOW);
    &lines[start..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use oj_core::StepSnapshot;

    fn task(steps: Vec<StepSnapshot>) -> TaskSnapshot {
        TaskSnapshot { id: oj_core::TaskId::derive("A", ""), name: "A".into(), info: "".into(), generation: 0, steps }
    }

    #[test]
    fn current_output_prefers_the_running_step() {
        let t = task(vec![
            StepSnapshot { header: "a".into(), status: Status::Success, output_tail: vec!["done".into()], debug_tail: vec![] },
            StepSnapshot { header: "b".into(), status: Status::Running, output_tail: vec![], debug_tail: vec![] },
        ]);
        assert!(current_output(&t).is_empty());
    }

    #[test]
    fn windowed_clamps_to_available_lines() {
        let lines: Vec<String> = (0..5).map(|i| i.to_string()).collect();
        assert_eq!(windowed(&lines, 0), &lines[..]);
        assert_eq!(windowed(&lines, 2), &lines[..3]);
    }

    #[test]
    fn headless_view_records_frames() {
        let mut v = HeadlessView::default();
        let snap = Snapshot { tasks: vec![] };
        v.render(&snap, &RenderState::default());
        assert_eq!(v.frames.len(), 1);
    }
}
