// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end scenarios exercising the same load -> reconcile -> run
//! wiring `main()` does, plus a couple of real invocations of the built
//! `oj` binary.

use assert_cmd::Command;
use std::collections::HashMap;

fn write_workflow(dir: &std::path::Path, name: &str, csv: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, csv).unwrap();
    path
}

#[test]
fn crash_recovery_with_selective_invalidation() {
    let dir = tempfile::tempdir().unwrap();
    let workflow_path = write_workflow(
        &dir,
        "wf.csv",
        "TaskName,Info,build,test\nA,,true,true\nB,,true,true\n",
    );

    let workflow = oj_runbook::load(&workflow_path).unwrap();
    let tasks = workflow.into_tasks();

    let mut completed = tasks.clone();
    for task in &mut completed {
        for step in &mut task.steps {
            step.status = oj_core::Status::Success;
        }
    }
    let state_path = oj_storage::state_path_for(&workflow_path);
    let store = oj_storage::StateStore::new(state_path);
    store.save(&completed).unwrap();

    // Edit B's command list: its structural hash changes, A's does not.
    let workflow_path = write_workflow(
        &dir,
        "wf.csv",
        "TaskName,Info,build,test\nA,,true,true\nB,,true,false\n",
    );
    let workflow = oj_runbook::load(&workflow_path).unwrap();
    let mut tasks = workflow.into_tasks();
    let hashes: HashMap<_, _> =
        tasks.iter().map(|t| (t.id.as_str().to_string(), t.structural_hash.clone())).collect();
    let persisted = store.load(&hashes);

    for task in &mut tasks {
        if let Some(p) = persisted.get(task.id.as_str()) {
            oj_storage::reconcile(task, p);
        }
    }

    let a = tasks.iter().find(|t| t.name == "A").unwrap();
    assert!(a.steps.iter().all(|s| s.status == oj_core::Status::Success));

    let b = tasks.iter().find(|t| t.name == "B").unwrap();
    assert!(b.steps.iter().all(|s| s.status == oj_core::Status::Pending));
}

#[test]
fn interrupted_mid_run_resets_only_the_running_step() {
    let dir = tempfile::tempdir().unwrap();
    let workflow_path = write_workflow(
        &dir,
        "wf.csv",
        "TaskName,Info,s0,s1,s2,s3\nA,,true,true,sleep 5,true\n",
    );

    let workflow = oj_runbook::load(&workflow_path).unwrap();
    let tasks = workflow.into_tasks();
    let hashes: HashMap<_, _> =
        tasks.iter().map(|t| (t.id.as_str().to_string(), t.structural_hash.clone())).collect();

    let mut mid_run = tasks.clone();
    mid_run[0].steps[0].status = oj_core::Status::Success;
    mid_run[0].steps[1].status = oj_core::Status::Success;
    mid_run[0].steps[2].status = oj_core::Status::Running;

    let state_path = oj_storage::state_path_for(&workflow_path);
    let store = oj_storage::StateStore::new(state_path);
    store.save(&mid_run).unwrap();

    let mut reloaded = tasks;
    let persisted = store.load(&hashes);
    for task in &mut reloaded {
        if let Some(p) = persisted.get(task.id.as_str()) {
            oj_storage::reconcile(task, p);
        }
    }

    let steps = &reloaded[0].steps;
    assert_eq!(steps[0].status, oj_core::Status::Success);
    assert_eq!(steps[1].status, oj_core::Status::Success);
    assert_eq!(steps[2].status, oj_core::Status::Pending);
    assert_eq!(steps[3].status, oj_core::Status::Pending);
}

#[test]
fn to_yaml_conversion_exits_cleanly_without_running_anything() {
    let dir = tempfile::tempdir().unwrap();
    let csv_path = write_workflow(&dir, "wf.csv", "TaskName,Info,build\nA,,true\n");
    let yaml_path = dir.path().join("wf.yaml");

    Command::cargo_bin("oj")
        .unwrap()
        .arg(&csv_path)
        .arg("--to-yaml")
        .arg(&yaml_path)
        .assert()
        .success();

    assert!(yaml_path.exists());
    let converted = oj_runbook::load(&yaml_path).unwrap();
    assert_eq!(converted.tasks[0].name, "A");
}
