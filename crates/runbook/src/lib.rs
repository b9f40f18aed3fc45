// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! oj-runbook: workflow file loading (CSV and YAML). Thin by design — this
//! is an external collaborator of the execution engine, described only by
//! its contract: a path in, a [`Workflow`] out.

pub mod csv_loader;
pub mod error;
pub mod workflow;
pub mod yaml_loader;

pub use error::LoadError;
pub use workflow::{TaskDef, Workflow};

use std::path::Path;

/// Load a workflow, dispatching on file extension (`.csv` vs `.yml`/`.yaml`).
pub fn load(path: &Path) -> Result<Workflow, LoadError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("yml") | Some("yaml") => yaml_loader::load(path),
        _ => csv_loader::load(path),
    }
}

/// Convert a CSV workflow to YAML and write it to `out_path` (`--to-yaml`).
pub fn convert_to_yaml(csv_path: &Path, out_path: &Path) -> Result<(), LoadError> {
    let workflow = csv_loader::load(csv_path)?;
    yaml_loader::save(&workflow, out_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn dispatches_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("wf.csv");
        std::fs::write(&csv_path, "TaskName,Info,build\nA,,cargo build\n").unwrap();
        let wf = load(&csv_path).unwrap();
        assert_eq!(wf.tasks[0].name, "A");

        let yaml_path = dir.path().join("wf.yaml");
        let mut f = std::fs::File::create(&yaml_path).unwrap();
        f.write_all(b"steps: [build]\ntasks:\n  - name: A\n    steps:\n      build: cargo build\n")
            .unwrap();
        let wf = load(&yaml_path).unwrap();
        assert_eq!(wf.tasks[0].name, "A");
    }

    #[test]
    fn convert_to_yaml_round_trips_tasks() {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("wf.csv");
        std::fs::write(&csv_path, "TaskName,Info,build,test\nA,x,cargo build,cargo test\n").unwrap();
        let yaml_path = dir.path().join("wf.yaml");
        convert_to_yaml(&csv_path, &yaml_path).unwrap();

        let converted = yaml_loader::load(&yaml_path).unwrap();
        assert_eq!(converted.tasks[0].name, "A");
        assert_eq!(converted.tasks[0].steps[0].1, Some("cargo build".into()));
    }
}
