// SPDX-License-Identifier: MIT OR Apache-2.0
#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]
#![warn(missing_docs)]

//! Sync state & worktree sync: push/pull/resolve over the
//! `gitgov-state` branch, implicit pull, and key preservation.

use std::ffi::OsStr;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};

use gitgov_config::ProjectConfig;
use gitgov_core::{Record, RecordType};
use gitgov_error::GitGovError;
use gitgov_eventbus::{EventBus, Topic};
use gitgov_factory::CreateContext;
use gitgov_git::{ConflictFile, Repo};
use gitgov_identity::Session;
use gitgov_store::{FsRecordStore, RecordStore};

const STATE_BRANCH: &str = "gitgov-state";

/// Events [`WorktreeSync`] publishes over its own bus, independent of the
/// backlog/lifecycle event topics — there is no shared event supertype.
#[derive(Debug, Clone)]
pub enum SyncEvent {
    /// Local changes were committed and pushed to the remote.
    Pushed,
    /// The remote was rebased onto cleanly (no conflicts).
    Pulled,
    /// A worktree was materialized from `origin/gitgov-state` for the
    /// first time.
    Bootstrapped,
    /// A rebase stopped with unresolved conflicts in the listed files.
    ConflictDetected(Vec<ConflictFile>),
    /// A previously conflicted rebase was continued and pushed.
    Resolved,
}

impl Topic for SyncEvent {
    fn topic(&self) -> &str {
        match self {
            Self::Pushed => "sync.pushed",
            Self::Pulled => "sync.pulled",
            Self::Bootstrapped => "sync.bootstrapped",
            Self::ConflictDetected(_) => "sync.conflict_detected",
            Self::Resolved => "sync.resolved",
        }
    }
}

/// Everything a sync operation needs beyond the operation's own
/// parameters: where the code repository lives, which remote to talk to,
/// and what time to stamp any audit record with.
#[derive(Debug, Clone)]
pub struct SyncContext<'a> {
    /// The code repository's root directory.
    pub repo_root: &'a Path,
    /// The git remote name to fetch from and push to (typically
    /// `"origin"`).
    pub remote: &'a str,
    /// The wall-clock time to stamp any audit record this operation
    /// writes with.
    pub now: DateTime<Utc>,
}

/// The result of a successful [`WorktreeSync::push`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PushOutcome {
    /// Whether an implicit pull (rebase) happened before the push.
    pub pulled: bool,
    /// Whether anything was actually pushed (`false` if there was nothing
    /// new to send after the implicit pull).
    pub pushed: bool,
}

/// The result of a successful [`WorktreeSync::pull`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PullOutcome {
    /// Whether this call materialized the worktree for the first time
    /// from `origin/gitgov-state`.
    pub bootstrapped: bool,
    /// Whether a rebase actually moved any commits onto the local branch.
    pub pulled: bool,
}

/// The result of a successful [`WorktreeSync::resolve`].
#[derive(Debug, Clone)]
pub struct ResolveOutcome {
    /// The id of the audit feedback record written to document the
    /// resolution.
    pub audit_record_id: String,
}

/// A newtype over a shared cancellation flag, checked at named suspension
/// points inside [`WorktreeSync`]'s long-running operations, giving callers
/// explicit cancellation rather than relying on a runtime-managed task.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    /// A fresh, not-yet-cancelled token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether [`Self::cancel`] has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), GitGovError> {
        if self.is_cancelled() {
            return Err(GitGovError::io("sync", std::io::Error::other("cancelled")));
        }
        Ok(())
    }
}

/// An advisory, `fd_lock`-based lock over a worktree's `.lock` file, held
/// for the duration of any git mutation or batched store write
/// taken around any Git mutation or batched store write.
pub struct WorktreeLock {
    inner: fd_lock::RwLock<File>,
}

impl WorktreeLock {
    /// Open (creating if absent) the lock file at `<worktree>/.lock`.
    ///
    /// # Errors
    ///
    /// Returns [`GitGovError::IoError`] if the file cannot be opened.
    pub fn open(worktree_path: &Path) -> Result<Self, GitGovError> {
        let path = worktree_path.join(".lock");
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|e| GitGovError::io("open worktree lock", e))?;
        Ok(Self { inner: fd_lock::RwLock::new(file) })
    }

    /// Acquire an exclusive lock, blocking until it is available. The
    /// returned guard releases the lock on drop.
    ///
    /// # Errors
    ///
    /// Returns [`GitGovError::IoError`] if the lock cannot be taken.
    pub fn acquire(&mut self) -> Result<fd_lock::RwLockWriteGuard<'_, File>, GitGovError> {
        self.inner.write().map_err(|e| GitGovError::io("acquire worktree lock", e))
    }
}

fn snapshot_local_only(worktree_path: &Path) -> Result<Vec<(PathBuf, Vec<u8>)>, GitGovError> {
    let mut snapshots = Vec::new();
    let keys_dir = worktree_path.join("keys");
    if keys_dir.exists() {
        let entries = std::fs::read_dir(&keys_dir).map_err(|e| GitGovError::io("read keys directory", e))?;
        for entry in entries {
            let entry = entry.map_err(|e| GitGovError::io("read keys directory entry", e))?;
            let path = entry.path();
            if path.extension() == Some(OsStr::new("key")) {
                let bytes = std::fs::read(&path).map_err(|e| GitGovError::io("snapshot key file", e))?;
                snapshots.push((path, bytes));
            }
        }
    }
    let session = worktree_path.join(".session.json");
    if session.exists() {
        let bytes = std::fs::read(&session).map_err(|e| GitGovError::io("snapshot session file", e))?;
        snapshots.push((session, bytes));
    }
    Ok(snapshots)
}

fn restore_local_only(snapshots: &[(PathBuf, Vec<u8>)]) -> Result<(), GitGovError> {
    for (path, bytes) in snapshots {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| GitGovError::io("restore local-only directory", e))?;
        }
        std::fs::write(path, bytes).map_err(|e| GitGovError::io("restore local-only file", e))?;
    }
    Ok(())
}

fn load_category(worktree_path: &Path, dir: &str) -> Result<Vec<(String, Record)>, GitGovError> {
    let store: FsRecordStore<Record> = FsRecordStore::new(worktree_path.join(dir));
    let mut out = Vec::new();
    for id in store.list()? {
        if let Some(record) = store.get(&id)? {
            out.push((id, record));
        }
    }
    Ok(out)
}

/// Regenerate `<worktree>/index.json` from the records currently on disk.
/// Called after any pull, bootstrap, or rebase that may have changed
/// files. The projection is a regenerable cache, never a source of truth.
///
/// # Errors
///
/// Returns [`GitGovError::IoError`] if records cannot be read or the
/// index cannot be written.
pub fn regenerate_index(worktree_path: &Path, now: DateTime<Utc>) -> Result<(), GitGovError> {
    let tasks = load_category(worktree_path, RecordType::Task.directory())?;
    let cycles = load_category(worktree_path, RecordType::Cycle.directory())?;
    let executions = load_category(worktree_path, RecordType::Execution.directory())?;
    let feedback = load_category(worktree_path, RecordType::Feedback.directory())?;
    let changelogs = load_category(worktree_path, RecordType::Changelog.directory())?;
    let index = gitgov_projection::build_index_with_ids(&tasks, &cycles, &executions, &feedback, &changelogs, now);
    gitgov_projection::save(&index, &worktree_path.join("index.json"))
}

fn resolve_worktree_path(repo_root: &Path) -> Result<PathBuf, GitGovError> {
    let repo_realpath = std::fs::canonicalize(repo_root).map_err(|e| GitGovError::io("resolve repository realpath", e))?;
    gitgov_config::worktree_path(&repo_realpath)
}

/// Owns nothing stateful itself beyond an optional event bus; every
/// operation takes an explicit [`SyncContext`] — session and project root
/// are passed explicitly, never looked up from process-wide state.
pub struct WorktreeSync<'a> {
    events: Option<&'a EventBus<SyncEvent>>,
}

impl<'a> WorktreeSync<'a> {
    /// Construct a sync coordinator, optionally wired to an event bus.
    #[must_use]
    pub fn new(events: Option<&'a EventBus<SyncEvent>>) -> Self {
        Self { events }
    }

    fn publish(&self, event: SyncEvent) {
        if let Some(bus) = self.events {
            bus.publish(event);
        }
    }

    /// Commit pending local writes, fetch, implicitly pull (rebase) if the
    /// remote has advanced, regenerate the projection cache, then push
    /// ending with a push of `gitgov-state`.
    ///
    /// # Errors
    ///
    /// Returns [`GitGovError::NoRemoteError`] if `ctx.remote` is not
    /// configured, [`GitGovError::ConflictError`] if the implicit pull
    /// stops on conflicts (the rebase is left in progress for
    /// [`Self::resolve`]), or [`GitGovError::IoError`] on other git
    /// failure.
    pub fn push(&self, ctx: &SyncContext<'_>, token: &CancellationToken) -> Result<PushOutcome, GitGovError> {
        let worktree_path = resolve_worktree_path(ctx.repo_root)?;
        let repo = Repo::open(&worktree_path);

        token.check()?;
        repo.add_commit("gitgov: sync")?;

        if !repo.has_remote(ctx.remote)? {
            return Err(GitGovError::NoRemoteError);
        }

        token.check()?;
        repo.fetch(ctx.remote, STATE_BRANCH)?;
        let remote_ref = format!("{}/{STATE_BRANCH}", ctx.remote);

        let mut pulled = false;
        if repo.remote_ref_exists(&remote_ref)? && repo.has_unpulled_commits(STATE_BRANCH, &remote_ref)? {
            token.check()?;
            let snapshots = snapshot_local_only(&worktree_path)?;
            let conflicts = repo.rebase_onto(&remote_ref, STATE_BRANCH)?;
            restore_local_only(&snapshots)?;
            if !conflicts.is_empty() {
                self.publish(SyncEvent::ConflictDetected(conflicts.clone()));
                return Err(GitGovError::ConflictError { files: conflicts });
            }
            regenerate_index(&worktree_path, ctx.now)?;
            pulled = true;
            self.publish(SyncEvent::Pulled);
        }

        token.check()?;
        let pushed = repo.has_unpushed_commits(STATE_BRANCH, &remote_ref)? || !repo.remote_ref_exists(&remote_ref)?;
        if pushed {
            repo.push(ctx.remote, STATE_BRANCH)?;
            self.publish(SyncEvent::Pushed);
        }

        Ok(PushOutcome { pulled, pushed })
    }

    /// Fetch the remote state; bootstrap a fresh worktree from
    /// `origin/gitgov-state` if none exists locally yet, otherwise rebase
    /// in place; regenerate the projection cache.
    ///
    /// When `gitgov-state` does not exist on the remote but a local
    /// worktree already does, this is a no-op rather than an error — there
    /// is simply nothing to pull yet.
    ///
    /// # Errors
    ///
    /// Returns [`GitGovError::NoRemoteError`] if `ctx.remote` is not
    /// configured, or [`GitGovError::ConflictError`]/[`GitGovError::IoError`]
    /// as in [`Self::push`].
    pub fn pull(&self, ctx: &SyncContext<'_>, token: &CancellationToken) -> Result<PullOutcome, GitGovError> {
        let worktree_path = resolve_worktree_path(ctx.repo_root)?;
        let remote_ref = format!("{}/{STATE_BRANCH}", ctx.remote);

        if !worktree_path.exists() {
            let repo_realpath = std::fs::canonicalize(ctx.repo_root).map_err(|e| GitGovError::io("resolve repository realpath", e))?;
            let code_repo = Repo::open(&repo_realpath);
            if !code_repo.has_remote(ctx.remote)? {
                return Err(GitGovError::NoRemoteError);
            }
            token.check()?;
            code_repo.fetch(ctx.remote, STATE_BRANCH)?;
            if !code_repo.remote_ref_exists(&remote_ref)? {
                tracing::warn!(remote = ctx.remote, "gitgov-state does not exist on remote yet; nothing to pull");
                return Ok(PullOutcome { bootstrapped: false, pulled: false });
            }
            if let Some(parent) = worktree_path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| GitGovError::io("create worktree parent directory", e))?;
            }
            code_repo.worktree_add(&worktree_path, STATE_BRANCH)?;
            regenerate_index(&worktree_path, ctx.now)?;
            self.publish(SyncEvent::Bootstrapped);
            return Ok(PullOutcome { bootstrapped: true, pulled: true });
        }

        let repo = Repo::open(&worktree_path);
        if !repo.has_remote(ctx.remote)? {
            return Err(GitGovError::NoRemoteError);
        }

        token.check()?;
        repo.fetch(ctx.remote, STATE_BRANCH)?;
        if !repo.remote_ref_exists(&remote_ref)? {
            tracing::warn!(remote = ctx.remote, "gitgov-state does not exist on remote yet; nothing to pull");
            return Ok(PullOutcome { bootstrapped: false, pulled: false });
        }

        if !repo.has_unpulled_commits(STATE_BRANCH, &remote_ref)? {
            return Ok(PullOutcome { bootstrapped: false, pulled: false });
        }

        token.check()?;
        repo.add_commit("gitgov: sync")?;
        let snapshots = snapshot_local_only(&worktree_path)?;
        let conflicts = repo.rebase_onto(&remote_ref, STATE_BRANCH)?;
        restore_local_only(&snapshots)?;
        if !conflicts.is_empty() {
            self.publish(SyncEvent::ConflictDetected(conflicts.clone()));
            return Err(GitGovError::ConflictError { files: conflicts });
        }

        regenerate_index(&worktree_path, ctx.now)?;
        self.publish(SyncEvent::Pulled);
        Ok(PullOutcome { bootstrapped: false, pulled: true })
    }

    /// After the caller has edited conflict markers left by a stopped
    /// rebase, stage the resolution, continue the rebase, push, and
    /// append an audit feedback record documenting `reason`
    /// appending the resolution audit record.
    ///
    /// # Errors
    ///
    /// Returns [`GitGovError::ConflictError`] if conflict markers remain
    /// unresolved, or [`GitGovError::IoError`] if no rebase is in
    /// progress or another git/store failure occurs.
    pub fn resolve(
        &self,
        ctx: &SyncContext<'_>,
        actor_id: &str,
        signing_key: &ed25519_dalek::SigningKey,
        reason: &str,
    ) -> Result<ResolveOutcome, GitGovError> {
        let worktree_path = resolve_worktree_path(ctx.repo_root)?;
        let repo = Repo::open(&worktree_path);

        if !repo.rebase_in_progress() {
            return Err(GitGovError::io("sync resolve", std::io::Error::other("no rebase is currently in progress")));
        }

        let remaining = repo.conflicted_files()?;
        if !remaining.is_empty() {
            return Err(GitGovError::ConflictError { files: remaining });
        }

        repo.stage_all()?;
        repo.rebase_continue()?;

        regenerate_index(&worktree_path, ctx.now)?;

        let mut feedback_store: FsRecordStore<Record> = FsRecordStore::new(worktree_path.join(RecordType::Feedback.directory()));
        let create_ctx = CreateContext { actor_id, role: "author", notes: reason, now: ctx.now };
        let created = gitgov_lifecycle::record_feedback(&mut feedback_store, "sync", STATE_BRANCH, "resolution", reason, signing_key, &create_ctx)?;

        repo.add_commit("gitgov: sync resolve audit")?;
        repo.push(ctx.remote, STATE_BRANCH)?;
        self.publish(SyncEvent::Resolved);

        Ok(ResolveOutcome { audit_record_id: created.id })
    }
}

/// Read the `.session.json` file at `<worktree>/.session.json`, if any.
///
/// # Errors
///
/// Returns [`GitGovError::IoError`] if the file exists but cannot be
/// parsed.
pub fn load_session(worktree_path: &Path) -> Result<Option<Session>, GitGovError> {
    let path = worktree_path.join(".session.json");
    if !path.exists() {
        return Ok(None);
    }
    let data = std::fs::read_to_string(&path).map_err(|e| GitGovError::io("read session file", e))?;
    let session = serde_json::from_str(&data).map_err(|e| GitGovError::io("parse session file", std::io::Error::other(e)))?;
    Ok(Some(session))
}

/// Load the project config for the worktree addressed by `repo_root`.
///
/// # Errors
///
/// Returns [`GitGovError::IoError`] if no worktree or config exists yet.
pub fn load_project_config(repo_root: &Path) -> Result<ProjectConfig, GitGovError> {
    let worktree_path = resolve_worktree_path(repo_root)?;
    ProjectConfig::load(&worktree_path.join("config.json"))
}
