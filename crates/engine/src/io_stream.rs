// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One subthread per stream (stdout/stderr): copies lines into the step's
//! stable log file and into the Model's ring buffer for live display.

use oj_core::Model;
use std::fs::File;
use std::io::{BufRead, BufReader, Read, Write};
use std::path::Path;
use std::sync::Arc;
use std::thread::JoinHandle;

/// Which ring buffer a stream's lines feed. Stdout is the step's primary
/// output; stderr is folded into the debug tail alongside engine diagnostics.
#[derive(Clone, Copy)]
pub enum Sink {
    Output,
    Debug,
}

/// Spawn a thread that copies `reader` line-by-line to `log_path` and to
/// the Model's matching tail buffer, until EOF.
pub fn spawn_tail_thread(
    reader: impl Read + Send + 'static,
    log_path: std::path::PathBuf,
    model: Arc<Model>,
    task_idx: usize,
    step_idx: usize,
    generation: u64,
    sink: Sink,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        let mut log_file = match open_log(&log_path) {
            Ok(f) => Some(f),
            Err(err) => {
                tracing::warn!(path = %log_path.display(), %err, "failed to open step log file");
                None
            }
        };
        let mut buf = BufReader::new(reader);
        let mut line = String::new();
        loop {
            line.clear();
            match buf.read_line(&mut line) {
                Ok(0) => break,
                Ok(_) => {
                    let text = line.trim_end_matches(['\n', '\r']);
                    if let Some(f) = log_file.as_mut() {
                        let _ = writeln!(f, "{text}");
                    }
                    match sink {
                        Sink::Output => {
                            model.append_output(task_idx, step_idx, generation, text.to_string())
                        }
                        Sink::Debug => {
                            model.append_debug(task_idx, step_idx, generation, text.to_string())
                        }
                    }
                }
                Err(_) => break,
            }
        }
    })
}

fn open_log(path: &Path) -> std::io::Result<File> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    File::create(path)
}
