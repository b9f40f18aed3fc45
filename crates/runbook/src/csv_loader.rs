// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CSV workflow format: `TaskName,Info,<step1>,<step2>,...` header, one
//! task per subsequent row. Missing trailing cells default to empty.

use crate::error::LoadError;
use crate::workflow::{TaskDef, Workflow};
use std::path::Path;

pub fn load(path: &Path) -> Result<Workflow, LoadError> {
    if !path.exists() {
        return Err(LoadError::NotFound(path.to_path_buf()));
    }
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|source| LoadError::Csv {
            path: path.to_path_buf(),
            source,
        })?;

    let headers = reader
        .headers()
        .map_err(|source| LoadError::Csv {
            path: path.to_path_buf(),
            source,
        })?
        .clone();
    if headers.len() < 2 {
        return Err(LoadError::Schema(
            "csv header must have at least TaskName and Info columns".into(),
        ));
    }
    let step_headers: Vec<String> = headers.iter().skip(2).map(str::to_string).collect();

    let mut tasks = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|source| LoadError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        let name = record.get(0).unwrap_or("").to_string();
        let info = record.get(1).unwrap_or("").to_string();
        let steps = step_headers
            .iter()
            .enumerate()
            .map(|(i, header)| {
                let cell = record.get(i + 2).unwrap_or("");
                let command = if cell.is_empty() {
                    None
                } else {
                    Some(cell.to_string())
                };
                (header.clone(), command)
            })
            .collect();
        tasks.push(TaskDef { name, info, steps });
    }
    Ok(Workflow { tasks })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(contents: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f
    }

    #[test]
    fn parses_header_and_rows() {
        let f = write_csv("TaskName,Info,build,test\nA,first,cargo build,cargo test\n");
        let wf = load(f.path()).unwrap();
        assert_eq!(wf.tasks.len(), 1);
        assert_eq!(wf.tasks[0].name, "A");
        assert_eq!(wf.tasks[0].steps[0], ("build".into(), Some("cargo build".into())));
    }

    #[test]
    fn empty_cell_is_noop() {
        let f = write_csv("TaskName,Info,build,test\nA,,cargo build,\n");
        let wf = load(f.path()).unwrap();
        assert_eq!(wf.tasks[0].steps[1].1, None);
    }

    #[test]
    fn missing_trailing_cells_default_to_empty() {
        let f = write_csv("TaskName,Info,build,test,deploy\nA,,cargo build\n");
        let wf = load(f.path()).unwrap();
        assert_eq!(wf.tasks[0].steps[1].1, None);
        assert_eq!(wf.tasks[0].steps[2].1, None);
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = load(Path::new("/does/not/exist.csv")).unwrap_err();
        assert!(matches!(err, LoadError::NotFound(_)));
    }
}
