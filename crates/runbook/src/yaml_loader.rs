// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! YAML workflow format. Unknown top-level or per-task keys are rejected.

use crate::error::LoadError;
use crate::workflow::{TaskDef, Workflow};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct RawWorkflow {
    #[serde(default)]
    steps: Option<Vec<String>>,
    tasks: Vec<RawTask>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct RawTask {
    name: String,
    #[serde(default)]
    info: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    steps: IndexMap<String, Option<String>>,
}

pub fn load(path: &Path) -> Result<Workflow, LoadError> {
    if !path.exists() {
        return Err(LoadError::NotFound(path.to_path_buf()));
    }
    let bytes = std::fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let raw: RawWorkflow = serde_yaml::from_slice(&bytes).map_err(|source| LoadError::Yaml {
        path: path.to_path_buf(),
        source,
    })?;
    build(raw)
}

fn build(raw: RawWorkflow) -> Result<Workflow, LoadError> {
    let mut seen_names = HashSet::new();
    for task in &raw.tasks {
        if !seen_names.insert(task.name.clone()) {
            return Err(LoadError::Schema(format!(
                "duplicate task name: {}",
                task.name
            )));
        }
    }

    let step_order: Vec<String> = match raw.steps {
        Some(order) => order,
        None => {
            let mut order = Vec::new();
            let mut seen = HashSet::new();
            for task in &raw.tasks {
                for key in task.steps.keys() {
                    if seen.insert(key.clone()) {
                        order.push(key.clone());
                    }
                }
            }
            order
        }
    };

    let tasks = raw
        .tasks
        .into_iter()
        .map(|t| {
            let info = t.description.or(t.info).unwrap_or_default();
            let steps = step_order
                .iter()
                .map(|header| {
                    let command = t.steps.get(header).cloned().flatten();
                    (header.clone(), command)
                })
                .collect();
            TaskDef {
                name: t.name,
                info,
                steps,
            }
        })
        .collect();

    Ok(Workflow { tasks })
}

/// Write `workflow` out in this format (used by `--to-yaml`).
pub fn save(workflow: &Workflow, path: &Path) -> Result<(), LoadError> {
    let steps: Vec<String> = workflow
        .tasks
        .first()
        .map(|t| t.steps.iter().map(|(h, _)| h.clone()).collect())
        .unwrap_or_default();
    let raw = RawWorkflow {
        steps: Some(steps),
        tasks: workflow
            .tasks
            .iter()
            .map(|t| RawTask {
                name: t.name.clone(),
                info: if t.info.is_empty() {
                    None
                } else {
                    Some(t.info.clone())
                },
                description: None,
                steps: t.steps.iter().cloned().collect(),
            })
            .collect(),
    };
    let yaml = serde_yaml::to_string(&raw).map_err(|source| LoadError::Yaml {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, yaml).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_step_order_is_honored() {
        let raw = RawWorkflow {
            steps: Some(vec!["test".into(), "lint".into()]),
            tasks: vec![RawTask {
                name: "A".into(),
                info: None,
                description: None,
                steps: IndexMap::from([
                    ("lint".to_string(), Some("clippy".to_string())),
                    ("test".to_string(), Some("cargo test".to_string())),
                ]),
            }],
        };
        let wf = build(raw).unwrap();
        assert_eq!(wf.tasks[0].steps[0].0, "test");
        assert_eq!(wf.tasks[0].steps[1].0, "lint");
    }

    #[test]
    fn inferred_order_follows_first_appearance() {
        let raw = RawWorkflow {
            steps: None,
            tasks: vec![
                RawTask {
                    name: "A".into(),
                    info: None,
                    description: None,
                    steps: IndexMap::from([("build".to_string(), None)]),
                },
                RawTask {
                    name: "B".into(),
                    info: None,
                    description: None,
                    steps: IndexMap::from([
                        ("build".to_string(), None),
                        ("deploy".to_string(), None),
                    ]),
                },
            ],
        };
        let wf = build(raw).unwrap();
        let order: Vec<&str> = wf.tasks[1].steps.iter().map(|(h, _)| h.as_str()).collect();
        assert_eq!(order, vec!["build", "deploy"]);
    }

    #[test]
    fn description_replaces_info() {
        let raw = RawWorkflow {
            steps: Some(vec![]),
            tasks: vec![RawTask {
                name: "A".into(),
                info: Some("short".into()),
                description: Some("multi\nline".into()),
                steps: IndexMap::new(),
            }],
        };
        let wf = build(raw).unwrap();
        assert_eq!(wf.tasks[0].info, "multi\nline");
    }

    #[test]
    fn duplicate_task_name_is_schema_error() {
        let raw = RawWorkflow {
            steps: Some(vec![]),
            tasks: vec![
                RawTask { name: "A".into(), info: None, description: None, steps: IndexMap::new() },
                RawTask { name: "A".into(), info: None, description: None, steps: IndexMap::new() },
            ],
        };
        assert!(matches!(build(raw), Err(LoadError::Schema(_))));
    }

    #[test]
    fn unknown_top_level_key_is_rejected() {
        let yaml = "unexpected: true\ntasks: []\n";
        let err = serde_yaml::from_str::<RawWorkflow>(yaml).unwrap_err();
        assert!(err.to_string().contains("unknown field"));
    }
}
