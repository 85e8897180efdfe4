// SPDX-License-Identifier: MIT OR Apache-2.0
//! A task in `draft` deletes cleanly; the same task moved to `review`
//! refuses deletion with a `WorkflowError` carrying an educational hint
//! that points back at rejecting the task to draft first.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;

fn gitgov() -> Command {
    Command::cargo_bin("gitgov").expect("binary `gitgov` should be built")
}

fn init_repo() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::process::Command::new("git").args(["init", "-q"]).current_dir(dir.path()).status().unwrap();
    std::process::Command::new("git").args(["config", "user.name", "Test"]).current_dir(dir.path()).status().unwrap();
    std::process::Command::new("git").args(["config", "user.email", "test@example.com"]).current_dir(dir.path()).status().unwrap();
    std::fs::write(dir.path().join("README.md"), "hello").unwrap();
    std::process::Command::new("git").args(["add", "."]).current_dir(dir.path()).status().unwrap();
    std::process::Command::new("git").args(["commit", "-q", "-m", "initial commit"]).current_dir(dir.path()).status().unwrap();
    dir
}

fn new_task(repo: &std::path::Path, home: &std::path::Path, title: &str) -> String {
    let output = gitgov()
        .env("GITGOV_HOME", home)
        .args(["--repo-root", repo.to_str().unwrap(), "--format", "json", "task", "new", title, "a task description"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let v: Value = serde_json::from_slice(&output).unwrap();
    v["id"].as_str().unwrap().to_string()
}

#[test]
fn draft_task_deletes_but_review_task_does_not() {
    let repo = init_repo();
    let home = tempfile::tempdir().unwrap();

    gitgov()
        .env("GITGOV_HOME", home.path())
        .args(["--repo-root", repo.path().to_str().unwrap(), "init", "--project-name", "Demo", "--actor-name", "Alice"])
        .assert()
        .success();

    let draft_id = new_task(repo.path(), home.path(), "Write the README");
    gitgov()
        .env("GITGOV_HOME", home.path())
        .args(["--repo-root", repo.path().to_str().unwrap(), "task", "delete", &draft_id])
        .assert()
        .success()
        .stdout(predicate::str::contains("deleted"));

    let review_id = new_task(repo.path(), home.path(), "Ship the release");
    gitgov()
        .env("GITGOV_HOME", home.path())
        .args(["--repo-root", repo.path().to_str().unwrap(), "task", "submit", &review_id])
        .assert()
        .success();

    gitgov()
        .env("GITGOV_HOME", home.path())
        .args(["--repo-root", repo.path().to_str().unwrap(), "--format", "json", "task", "delete", &review_id])
        .assert()
        .failure()
        .code(4)
        .stderr(predicate::str::contains("WORKFLOW_ERROR"))
        .stderr(predicate::str::contains("reject"));
}
