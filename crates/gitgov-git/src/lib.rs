// SPDX-License-Identifier: MIT OR Apache-2.0
#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]
#![warn(missing_docs)]

//! Git primitives for the `gitgov-state` storage engine. Every operation
//! shells out to the `git` binary with `current_dir` pinned at
//! construction, covering the fuller primitive set the sync protocol
//! needs: branch and worktree management, rebase, and conflict detection.

use std::path::{Path, PathBuf};
use std::process::Command;

use gitgov_error::GitGovError;

/// A path in the worktree with conflict markers left by a stopped rebase.
pub type ConflictFile = PathBuf;

/// A thin handle over a single git working directory (either the code
/// repository or a `gitgov-state` worktree).
#[derive(Debug, Clone)]
pub struct Repo {
    root: PathBuf,
}

fn run(dir: &Path, args: &[&str]) -> Result<std::process::Output, GitGovError> {
    Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .map_err(|e| GitGovError::io(format!("run git {args:?}"), e))
}

fn ok_stdout(out: std::process::Output, op: &str) -> Result<String, GitGovError> {
    if !out.status.success() {
        return Err(GitGovError::io(
            op.to_string(),
            std::io::Error::other(format!(
                "git exited {:?}: {}",
                out.status.code(),
                String::from_utf8_lossy(&out.stderr)
            )),
        ));
    }
    Ok(String::from_utf8_lossy(&out.stdout).into_owned())
}

impl Repo {
    /// Open an existing repository rooted at `root`, without creating it.
    #[must_use]
    pub fn open(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The repository's working directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn git(&self, args: &[&str]) -> Result<std::process::Output, GitGovError> {
        run(&self.root, args)
    }

    /// `git init` at `root`, creating the directory first if absent.
    ///
    /// # Errors
    ///
    /// Returns [`GitGovError::IoError`] on failure.
    pub fn init(root: impl Into<PathBuf>) -> Result<Self, GitGovError> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|e| GitGovError::io("create repo directory", e))?;
        let out = run(&root, &["init", "-q"])?;
        ok_stdout(out, "git init")?;
        Ok(Self { root })
    }

    /// Whether `root` is already a commit-bearing git repository (has a
    /// `.git` directory and at least one ref).
    #[must_use]
    pub fn exists(root: &Path) -> bool {
        root.join(".git").exists()
    }

    /// Whether `branch` has at least one commit. Callers use this to
    /// distinguish a genuinely empty branch from [`GitGovError::NoCommitsError`].
    ///
    /// # Errors
    ///
    /// Returns [`GitGovError::IoError`] if git cannot be invoked at all
    /// (a missing branch is `Ok(false)`, not an error).
    pub fn has_commits(&self, branch: &str) -> Result<bool, GitGovError> {
        let out = self.git(&["rev-parse", "--verify", "--quiet", branch])?;
        Ok(out.status.success())
    }

    /// Create `branch` as an orphan (no parent, no working-tree content)
    /// if it does not already exist.
    ///
    /// # Errors
    ///
    /// Returns [`GitGovError::IoError`] on git failure.
    pub fn create_orphan_branch(&self, branch: &str) -> Result<(), GitGovError> {
        if self.has_commits(branch)? {
            return Ok(());
        }
        ok_stdout(self.git(&["checkout", "--orphan", branch])?, "git checkout --orphan")?;
        ok_stdout(self.git(&["rm", "-rf", "--cached", "."])?, "git rm --cached")?;
        Ok(())
    }

    /// The branch currently checked out in this working directory
    /// (`git branch --show-current`), including an unborn branch on a
    /// repository with no commits yet.
    ///
    /// # Errors
    ///
    /// Returns [`GitGovError::IoError`] on git failure.
    pub fn current_branch(&self) -> Result<String, GitGovError> {
        let out = ok_stdout(self.git(&["branch", "--show-current"])?, "git branch --show-current")?;
        Ok(out.trim().to_string())
    }

    /// `git checkout <branch>`.
    ///
    /// # Errors
    ///
    /// Returns [`GitGovError::IoError`] on git failure.
    pub fn checkout(&self, branch: &str) -> Result<(), GitGovError> {
        ok_stdout(self.git(&["checkout", branch])?, "git checkout")?;
        Ok(())
    }

    /// `git worktree add <path> <branch>`; if `<branch>` doesn't exist yet
    /// locally, creates it tracking `origin/<branch>` when that exists,
    /// otherwise as a fresh orphan.
    ///
    /// # Errors
    ///
    /// Returns [`GitGovError::IoError`] on git failure.
    pub fn worktree_add(&self, path: &Path, branch: &str) -> Result<(), GitGovError> {
        let path_str = path.to_string_lossy().into_owned();
        ok_stdout(self.git(&["worktree", "add", &path_str, branch])?, "git worktree add")?;
        Ok(())
    }

    /// `git worktree remove --force <path>`.
    ///
    /// # Errors
    ///
    /// Returns [`GitGovError::IoError`] on git failure.
    pub fn worktree_remove(&self, path: &Path) -> Result<(), GitGovError> {
        let path_str = path.to_string_lossy().into_owned();
        ok_stdout(self.git(&["worktree", "remove", "--force", &path_str])?, "git worktree remove")?;
        Ok(())
    }

    /// List registered worktree paths (`git worktree list --porcelain`,
    /// `worktree` lines only).
    ///
    /// # Errors
    ///
    /// Returns [`GitGovError::IoError`] on git failure.
    pub fn worktree_list(&self) -> Result<Vec<PathBuf>, GitGovError> {
        let out = ok_stdout(self.git(&["worktree", "list", "--porcelain"])?, "git worktree list")?;
        Ok(out
            .lines()
            .filter_map(|line| line.strip_prefix("worktree "))
            .map(PathBuf::from)
            .collect())
    }

    /// `git add -A` then `git commit -m <message>` in this repo's working
    /// directory. Returns `Ok(false)` (no error) if there was nothing to
    /// commit.
    ///
    /// # Errors
    ///
    /// Returns [`GitGovError::IoError`] on git failure other than "nothing
    /// to commit".
    pub fn add_commit(&self, message: &str) -> Result<bool, GitGovError> {
        ok_stdout(self.git(&["add", "-A"])?, "git add")?;
        let out = self.git(&["commit", "-q", "-m", message])?;
        if out.status.success() {
            return Ok(true);
        }
        let stderr = String::from_utf8_lossy(&out.stderr);
        if stderr.contains("nothing to commit") {
            return Ok(false);
        }
        Err(GitGovError::io("git commit", std::io::Error::other(stderr.into_owned())))
    }

    /// Whether a remote named `remote` is configured.
    ///
    /// # Errors
    ///
    /// Returns [`GitGovError::IoError`] if git cannot be invoked.
    pub fn has_remote(&self, remote: &str) -> Result<bool, GitGovError> {
        let out = ok_stdout(self.git(&["remote"])?, "git remote")?;
        Ok(out.lines().any(|l| l == remote))
    }

    /// `git fetch <remote> <branch>`.
    ///
    /// # Errors
    ///
    /// Returns [`GitGovError::IoError`] on git failure.
    pub fn fetch(&self, remote: &str, branch: &str) -> Result<(), GitGovError> {
        ok_stdout(self.git(&["fetch", "-q", remote, branch])?, "git fetch")?;
        Ok(())
    }

    /// `git push <remote> <branch>`.
    ///
    /// # Errors
    ///
    /// Returns [`GitGovError::IoError`] on git failure.
    pub fn push(&self, remote: &str, branch: &str) -> Result<(), GitGovError> {
        ok_stdout(self.git(&["push", "-q", remote, branch])?, "git push")?;
        Ok(())
    }

    /// Whether `local_branch` has commits not present on `remote_ref`
    /// (i.e. whether a push is needed).
    ///
    /// # Errors
    ///
    /// Returns [`GitGovError::IoError`] on git failure.
    pub fn has_unpushed_commits(&self, local_branch: &str, remote_ref: &str) -> Result<bool, GitGovError> {
        let range = format!("{remote_ref}..{local_branch}");
        let out = ok_stdout(self.git(&["rev-list", "--count", &range])?, "git rev-list")?;
        Ok(out.trim().parse::<u64>().unwrap_or(0) > 0)
    }

    /// Whether `remote_ref` has commits not present on `local_branch`
    /// (i.e. whether an implicit pull is needed before pushing).
    ///
    /// # Errors
    ///
    /// Returns [`GitGovError::IoError`] on git failure.
    pub fn has_unpulled_commits(&self, local_branch: &str, remote_ref: &str) -> Result<bool, GitGovError> {
        let range = format!("{local_branch}..{remote_ref}");
        let out = ok_stdout(self.git(&["rev-list", "--count", &range])?, "git rev-list")?;
        Ok(out.trim().parse::<u64>().unwrap_or(0) > 0)
    }

    /// `git rebase <upstream> <branch>`. Returns `Ok(Vec::new())` on a
    /// clean rebase, or the list of conflicting file paths (parsed from
    /// `git status --porcelain=v1`) if the rebase stopped on conflicts —
    /// the rebase itself is left in progress in that case, matching the
    /// spec's "exit leaving rebase in progress" requirement (§4.7 step 2).
    ///
    /// # Errors
    ///
    /// Returns [`GitGovError::IoError`] if git could not be invoked at
    /// all.
    pub fn rebase_onto(&self, upstream: &str, branch: &str) -> Result<Vec<ConflictFile>, GitGovError> {
        let out = self.git(&["rebase", upstream, branch])?;
        if out.status.success() {
            return Ok(Vec::new());
        }
        self.conflicted_files()
    }

    /// Parse `git status --porcelain=v1` for unmerged paths (`U?` codes),
    /// returning their repo-relative paths.
    ///
    /// # Errors
    ///
    /// Returns [`GitGovError::IoError`] on git failure.
    pub fn conflicted_files(&self) -> Result<Vec<ConflictFile>, GitGovError> {
        let out = ok_stdout(self.git(&["status", "--porcelain=v1"])?, "git status")?;
        Ok(out
            .lines()
            .filter(|line| {
                let code = line.get(..2).unwrap_or("");
                code.contains('U') || code == "AA" || code == "DD"
            })
            .filter_map(|line| line.get(3..))
            .map(PathBuf::from)
            .collect())
    }

    /// `git add -A`, staging conflict resolutions before `rebase_continue`.
    ///
    /// # Errors
    ///
    /// Returns [`GitGovError::IoError`] on git failure.
    pub fn stage_all(&self) -> Result<(), GitGovError> {
        ok_stdout(self.git(&["add", "-A"])?, "git add")?;
        Ok(())
    }

    /// `git rebase --continue`, after the caller has resolved conflicts
    /// and staged them.
    ///
    /// # Errors
    ///
    /// Returns [`GitGovError::ConflictError`] if conflicts remain, or
    /// [`GitGovError::IoError`] on other git failure.
    pub fn rebase_continue(&self) -> Result<(), GitGovError> {
        let out = self.git(&["rebase", "--continue"])?;
        if out.status.success() {
            return Ok(());
        }
        let remaining = self.conflicted_files()?;
        if !remaining.is_empty() {
            return Err(GitGovError::ConflictError { files: remaining });
        }
        Err(GitGovError::io(
            "git rebase --continue",
            std::io::Error::other(String::from_utf8_lossy(&out.stderr).into_owned()),
        ))
    }

    /// `git rebase --abort`.
    ///
    /// # Errors
    ///
    /// Returns [`GitGovError::IoError`] on git failure.
    pub fn rebase_abort(&self) -> Result<(), GitGovError> {
        ok_stdout(self.git(&["rebase", "--abort"])?, "git rebase --abort")?;
        Ok(())
    }

    /// Whether a rebase is currently in progress in this working
    /// directory (`.git/rebase-merge` or `.git/rebase-apply` present).
    #[must_use]
    pub fn rebase_in_progress(&self) -> bool {
        let git_dir = self.root.join(".git");
        git_dir.join("rebase-merge").exists() || git_dir.join("rebase-apply").exists()
    }

    /// `git ls-tree -r --name-only <remote_ref>`: every file path present
    /// on a remote branch, without checking it out.
    ///
    /// # Errors
    ///
    /// Returns [`GitGovError::IoError`] on git failure.
    pub fn ls_tree(&self, remote_ref: &str) -> Result<Vec<String>, GitGovError> {
        let out = ok_stdout(self.git(&["ls-tree", "-r", "--name-only", remote_ref])?, "git ls-tree")?;
        Ok(out.lines().map(str::to_string).collect())
    }

    /// Whether `remote_ref` (e.g. `origin/gitgov-state`) currently
    /// resolves to a commit — i.e. whether the state branch exists on the
    /// remote at all.
    ///
    /// # Errors
    ///
    /// Returns [`GitGovError::IoError`] if git cannot be invoked.
    pub fn remote_ref_exists(&self, remote_ref: &str) -> Result<bool, GitGovError> {
        let out = self.git(&["rev-parse", "--verify", "--quiet", remote_ref])?;
        Ok(out.status.success())
    }

    /// `git status --porcelain=v1`, raw.
    ///
    /// # Errors
    ///
    /// Returns [`GitGovError::IoError`] on git failure.
    pub fn status_porcelain(&self) -> Result<String, GitGovError> {
        ok_stdout(self.git(&["status", "--porcelain=v1"])?, "git status")
    }

    /// Configure `user.name`/`user.email` for commits made in this repo
    /// (test fixtures and fresh worktrees otherwise have no identity).
    ///
    /// # Errors
    ///
    /// Returns [`GitGovError::IoError`] on git failure.
    pub fn configure_identity(&self, name: &str, email: &str) -> Result<(), GitGovError> {
        ok_stdout(self.git(&["config", "user.name", name])?, "git config user.name")?;
        ok_stdout(self.git(&["config", "user.email", email])?, "git config user.email")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init_repo() -> (tempfile::TempDir, Repo) {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repo::init(dir.path()).unwrap();
        repo.configure_identity("Test", "test@example.com").unwrap();
        (dir, repo)
    }

    #[test]
    fn init_creates_git_directory() {
        let (dir, _repo) = init_repo();
        assert!(dir.path().join(".git").exists());
    }

    #[test]
    fn has_commits_false_before_first_commit() {
        let (_dir, repo) = init_repo();
        assert!(!repo.has_commits("HEAD").unwrap());
    }

    #[test]
    fn add_commit_creates_commit_and_reports_nothing_on_repeat() {
        let (dir, repo) = init_repo();
        std::fs::write(dir.path().join("a.txt"), "hi").unwrap();
        assert!(repo.add_commit("first").unwrap());
        assert!(repo.has_commits("HEAD").unwrap());
        // Nothing changed since: second commit attempt is a no-op, not an error.
        assert!(!repo.add_commit("second").unwrap());
    }

    #[test]
    fn has_remote_false_when_none_configured() {
        let (_dir, repo) = init_repo();
        assert!(!repo.has_remote("origin").unwrap());
    }

    #[test]
    fn orphan_branch_has_no_parent_history() {
        let (dir, repo) = init_repo();
        std::fs::write(dir.path().join("a.txt"), "hi").unwrap();
        repo.add_commit("first").unwrap();
        repo.create_orphan_branch("gitgov-state").unwrap();
        std::fs::write(dir.path().join(".gitgov-marker"), "x").unwrap();
        repo.add_commit("state init").unwrap();
        let out = run(dir.path(), &["rev-list", "--count", "gitgov-state"]).unwrap();
        let count: u64 = String::from_utf8_lossy(&out.stdout).trim().parse().unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn rebase_in_progress_false_on_clean_repo() {
        let (_dir, repo) = init_repo();
        assert!(!repo.rebase_in_progress());
    }

    #[test]
    fn worktree_add_and_list_round_trip() {
        let (dir, repo) = init_repo();
        std::fs::write(dir.path().join("a.txt"), "hi").unwrap();
        repo.add_commit("first").unwrap();
        let initial_branch = ok_stdout(repo.git(&["branch", "--show-current"]).unwrap(), "branch").unwrap();
        let initial_branch = initial_branch.trim().to_string();
        repo.create_orphan_branch("gitgov-state").unwrap();
        std::fs::write(dir.path().join(".gitgov-marker"), "x").unwrap();
        repo.add_commit("state init").unwrap();
        ok_stdout(repo.git(&["checkout", &initial_branch]).unwrap(), "checkout back").unwrap();

        let wt_dir = tempfile::tempdir().unwrap();
        let wt_path = wt_dir.path().join("state");
        repo.worktree_add(&wt_path, "gitgov-state").unwrap();
        let worktrees = repo.worktree_list().unwrap();
        assert!(worktrees.iter().any(|p| p == &wt_path));
    }

    #[test]
    fn current_branch_reports_unborn_branch_before_first_commit() {
        let (_dir, repo) = init_repo();
        let branch = repo.current_branch().unwrap();
        assert!(!branch.is_empty());
    }

    #[test]
    fn checkout_switches_branches() {
        let (dir, repo) = init_repo();
        std::fs::write(dir.path().join("a.txt"), "hi").unwrap();
        repo.add_commit("first").unwrap();
        let original = repo.current_branch().unwrap();
        repo.create_orphan_branch("gitgov-state").unwrap();
        assert_eq!(repo.current_branch().unwrap(), "gitgov-state");
        repo.checkout(&original).unwrap();
        assert_eq!(repo.current_branch().unwrap(), original);
    }
}
