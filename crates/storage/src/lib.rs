// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! oj-storage: atomic persistence of step statuses across process restarts.
//!
//! The file written is a sidecar of the workflow file
//! (`.{workflow_basename}.state.json`). It is only ever replaced whole, via
//! a temp-file-plus-rename in the same directory, so a crash at any point
//! leaves either the previous file or the new one intact — never a partial
//! write.

use oj_core::{Status, Task};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

pub mod reconcile;

pub use reconcile::reconcile;

#[derive(Debug, thiserror::Error)]
pub enum StateStoreError {
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize state: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// On-disk shape of the state file (see spec §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateFile {
    pub version: u32,
    pub tasks: HashMap<String, PersistedTask>,
}

const CURRENT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedTask {
    pub structural_hash: String,
    pub steps: Vec<Status>,
}

/// Sidecar path for a workflow file: `.{basename}.state.json` next to it.
pub fn state_path_for(workflow_path: &Path) -> PathBuf {
    let dir = workflow_path.parent().unwrap_or_else(|| Path::new("."));
    let basename = workflow_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    dir.join(format!(".{basename}.state.json"))
}

pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load the persisted projection, keeping only tasks whose structural
    /// hash matches `current_hashes` (selective invalidation). A missing or
    /// malformed file is treated as empty, never an error (§7).
    pub fn load(&self, current_hashes: &HashMap<String, String>) -> HashMap<String, PersistedTask> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return HashMap::new(),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to read state file, treating as empty");
                return HashMap::new();
            }
        };
        let file: StateFile = match serde_json::from_slice(&bytes) {
            Ok(f) => f,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "malformed state file, treating as empty");
                return HashMap::new();
            }
        };
        file.tasks
            .into_iter()
            .filter(|(task_id, persisted)| {
                current_hashes.get(task_id) == Some(&persisted.structural_hash)
            })
            .collect()
    }

    /// Atomically write the full projection of `tasks`.
    pub fn save(&self, tasks: &[Task]) -> Result<(), StateStoreError> {
        let file = StateFile {
            version: CURRENT_VERSION,
            tasks: tasks
                .iter()
                .map(|t| {
                    (
                        t.id.as_str().to_string(),
                        PersistedTask {
                            structural_hash: t.structural_hash.clone(),
                            steps: t.steps.iter().map(|s| s.status).collect(),
                        },
                    )
                })
                .collect(),
        };
        self.write_atomically(&file)
    }

    fn write_atomically(&self, file: &StateFile) -> Result<(), StateStoreError> {
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let bytes = serde_json::to_vec_pretty(file)?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|source| StateStoreError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        tmp.write_all(&bytes).map_err(|source| StateStoreError::Io {
            path: self.path.clone(),
            source,
        })?;
        tmp.as_file().sync_all().map_err(|source| StateStoreError::Io {
            path: self.path.clone(),
            source,
        })?;
        tmp.persist(&self.path)
            .map_err(|e| StateStoreError::Io {
                path: self.path.clone(),
                source: e.error,
            })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oj_core::test_support::task_with_commands;
    use std::collections::HashMap;

    #[test]
    fn state_path_is_dotfile_sibling() {
        let p = state_path_for(Path::new("/a/b/workflow.csv"));
        assert_eq!(p, Path::new("/a/b/.workflow.csv.state.json"));
    }

    #[test]
    fn round_trip_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().join(".wf.csv.state.json"));
        let mut task = task_with_commands("A", &["true", "true"]);
        task.steps[0].status = oj_core::Status::Success;
        task.steps[1].status = oj_core::Status::Success;

        store.save(&[task.clone()]).unwrap();

        let mut hashes = HashMap::new();
        hashes.insert(task.id.as_str().to_string(), task.structural_hash.clone());
        let loaded = store.load(&hashes);

        assert_eq!(loaded.len(), 1);
        let persisted = &loaded[task.id.as_str()];
        assert_eq!(persisted.steps, vec![oj_core::Status::Success, oj_core::Status::Success]);
    }

    #[test]
    fn load_drops_exactly_the_task_whose_hash_changed() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().join(".wf.csv.state.json"));
        let a = task_with_commands("A", &["true"]);
        let b = task_with_commands("B", &["true"]);
        store.save(&[a.clone(), b.clone()]).unwrap();

        let mut hashes = HashMap::new();
        hashes.insert(a.id.as_str().to_string(), a.structural_hash.clone());
        hashes.insert(b.id.as_str().to_string(), "changed".to_string());

        let loaded = store.load(&hashes);
        assert_eq!(loaded.len(), 1);
        assert!(loaded.contains_key(a.id.as_str()));
        assert!(!loaded.contains_key(b.id.as_str()));
    }

    #[test]
    fn missing_file_loads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().join(".missing.state.json"));
        assert!(store.load(&HashMap::new()).is_empty());
    }

    #[test]
    fn malformed_file_loads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".wf.csv.state.json");
        std::fs::write(&path, b"not json").unwrap();
        let store = StateStore::new(path);
        assert!(store.load(&HashMap::new()).is_empty());
    }

    #[test]
    fn old_file_survives_if_save_is_interrupted_before_rename() {
        // Simulates "crash between fsync and rename": the temp file is
        // dropped without ever being persisted, so the target is untouched.
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join(".wf.csv.state.json");
        std::fs::write(&target, b"{\"version\":1,\"tasks\":{}}").unwrap();

        let tmp = tempfile::NamedTempFile::new_in(dir.path()).unwrap();
        drop(tmp);

        let contents = std::fs::read_to_string(&target).unwrap();
        assert_eq!(contents, "{\"version\":1,\"tasks\":{}}");
    }
}
