// SPDX-License-Identifier: MIT OR Apache-2.0
//! Two clones edit the same task's description; the second clone's
//! `sync push` stops mid-rebase with conflict markers. After the markers
//! are cleaned up, `sync resolve` continues the rebase, pushes, and
//! records an audit feedback entry.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::path::Path;

use gitgov_git::Repo;

fn gitgov() -> Command {
    Command::cargo_bin("gitgov").expect("binary `gitgov` should be built")
}

fn bare_remote() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::process::Command::new("git").args(["init", "-q", "--bare"]).current_dir(dir.path()).status().unwrap();
    dir
}

fn clone_with_remote(remote: &Path) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::process::Command::new("git").args(["clone", "-q", remote.to_str().unwrap(), "."]).current_dir(dir.path()).status().unwrap();
    std::process::Command::new("git").args(["config", "user.name", "Test"]).current_dir(dir.path()).status().unwrap();
    std::process::Command::new("git").args(["config", "user.email", "test@example.com"]).current_dir(dir.path()).status().unwrap();
    std::fs::write(dir.path().join("README.md"), "hello").unwrap();
    std::process::Command::new("git").args(["add", "."]).current_dir(dir.path()).status().unwrap();
    std::process::Command::new("git").args(["commit", "-q", "-m", "initial commit"]).current_dir(dir.path()).status().unwrap();
    std::process::Command::new("git").args(["push", "-q", "-u", "origin", "HEAD"]).current_dir(dir.path()).status().unwrap();
    dir
}

fn worktree_path(repo: &Path, home: &Path) -> std::path::PathBuf {
    let realpath = std::fs::canonicalize(repo).unwrap();
    std::env::set_var(gitgov_config::HOME_OVERRIDE_ENV, home);
    let path = gitgov_config::worktree_path(&realpath).unwrap();
    std::env::remove_var(gitgov_config::HOME_OVERRIDE_ENV);
    path
}

#[test]
fn conflicting_edits_stop_the_rebase_and_resolve_completes_it() {
    let remote = bare_remote();

    let first_repo = clone_with_remote(remote.path());
    let first_home = tempfile::tempdir().unwrap();
    gitgov()
        .env("GITGOV_HOME", first_home.path())
        .args(["--repo-root", first_repo.path().to_str().unwrap(), "init", "--project-name", "Conflict", "--actor-name", "Alice"])
        .assert()
        .success();
    let output = gitgov()
        .env("GITGOV_HOME", first_home.path())
        .args(["--repo-root", first_repo.path().to_str().unwrap(), "--format", "json", "task", "new", "Shared task", "original description"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let task_id = serde_json::from_slice::<Value>(&output).unwrap()["id"].as_str().unwrap().to_string();
    gitgov()
        .env("GITGOV_HOME", first_home.path())
        .args(["--repo-root", first_repo.path().to_str().unwrap(), "sync", "push"])
        .assert()
        .success();

    let second_repo = clone_with_remote(remote.path());
    let second_home = tempfile::tempdir().unwrap();
    gitgov()
        .env("GITGOV_HOME", second_home.path())
        .args(["--repo-root", second_repo.path().to_str().unwrap(), "sync", "pull"])
        .assert()
        .success();

    // First clone edits the task's description and pushes first.
    gitgov()
        .env("GITGOV_HOME", first_home.path())
        .args(["--repo-root", first_repo.path().to_str().unwrap(), "task", "edit", &task_id, "--description", "edited by clone A"])
        .assert()
        .success();
    gitgov()
        .env("GITGOV_HOME", first_home.path())
        .args(["--repo-root", first_repo.path().to_str().unwrap(), "sync", "push"])
        .assert()
        .success();

    // Second clone edits the same task's description and its push hits a conflict.
    gitgov()
        .env("GITGOV_HOME", second_home.path())
        .args(["--repo-root", second_repo.path().to_str().unwrap(), "task", "edit", &task_id, "--description", "edited by clone B"])
        .assert()
        .success();
    gitgov()
        .env("GITGOV_HOME", second_home.path())
        .args(["--repo-root", second_repo.path().to_str().unwrap(), "--format", "json", "sync", "push"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("CONFLICT_ERROR"));

    let second_worktree = worktree_path(second_repo.path(), second_home.path());
    let repo = Repo::open(&second_worktree);
    assert!(repo.rebase_in_progress());
    let conflicted = repo.conflicted_files().unwrap();
    assert_eq!(conflicted.len(), 1);

    let path = second_worktree.join(&conflicted[0]);
    let content = std::fs::read_to_string(&path).unwrap();
    let resolved = content.split("=======\n").nth(1).unwrap().split(">>>>>>>").next().unwrap().to_string();
    std::fs::write(&path, resolved).unwrap();

    gitgov()
        .env("GITGOV_HOME", second_home.path())
        .args(["--repo-root", second_repo.path().to_str().unwrap(), "sync", "resolve", "--reason", "kept B"])
        .assert()
        .success()
        .stdout(predicate::str::contains("audit record:"));

    assert!(!repo.rebase_in_progress());
}
