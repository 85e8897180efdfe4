// SPDX-License-Identifier: MIT OR Apache-2.0
//! Library-level command implementations for the `gitgov` CLI.
//!
//! These functions are where the actual work happens; `main.rs` only
//! parses arguments, calls into here, and formats/exits. Kept separate so
//! they're testable without spawning the binary.

use std::path::{Path, PathBuf};

use chrono::Utc;
use ed25519_dalek::SigningKey;

use gitgov_backlog::BacklogAdapter;
use gitgov_core::{ActorKind, CycleStatus, Record, TaskPriority, TaskStatus};
use gitgov_crypto::keys::FsKeyStore;
use gitgov_error::GitGovError;
use gitgov_factory::{Created, CreateContext};
use gitgov_identity::{IdentityAdapter, Session};
use gitgov_init::InitContext;
use gitgov_lint::{LintOptions, Report};
use gitgov_projection::Index;
use gitgov_store::FsRecordStore;
use gitgov_sync::{CancellationToken, PullOutcome, PushOutcome, ResolveOutcome, SyncContext, WorktreeSync};

/// Resolve the worktree directory for the code repository at `repo_root`.
///
/// # Errors
///
/// Returns [`GitGovError::IoError`] if `repo_root` cannot be canonicalized
/// or the home root cannot be resolved.
pub fn worktree_for(repo_root: &Path) -> Result<PathBuf, GitGovError> {
    let realpath = std::fs::canonicalize(repo_root).map_err(|e| GitGovError::io("resolve repository realpath", e))?;
    gitgov_config::worktree_path(&realpath)
}

/// Resolve the current actor's id and signing key for the worktree at
/// `repo_root`, per the session → single-key → error policy.
///
/// # Errors
///
/// Returns [`GitGovError::AmbiguousActorError`] or
/// [`GitGovError::NoActorError`] per [`IdentityAdapter::resolve_current_actor`],
/// or [`GitGovError::IoError`] if the worktree's stores can't be read.
pub fn current_actor(worktree: &Path) -> Result<(String, SigningKey), GitGovError> {
    let session = gitgov_sync::load_session(worktree)?;
    let mut actor_store: FsRecordStore<Record> = FsRecordStore::new(worktree.join("actors"));
    let mut key_store = FsKeyStore::new(worktree.join("keys"));
    let actor_id = {
        let identity = IdentityAdapter::new(&mut actor_store, &mut key_store);
        identity.resolve_current_actor(session.as_ref())?
    };
    let signing_key = key_store.get(&actor_id)?.ok_or(GitGovError::NoActorError)?;
    Ok((actor_id, signing_key))
}

/// Persist `actor_id` as the worktree's session actor, so subsequent
/// commands resolve to it without needing a single unambiguous key.
///
/// # Errors
///
/// Returns [`GitGovError::IoError`] if the session file can't be written.
pub fn set_session_actor(worktree: &Path, actor_id: &str) -> Result<(), GitGovError> {
    let session = Session { actor_id: actor_id.to_string(), timestamp: Utc::now() };
    let json = serde_json::to_string_pretty(&session).map_err(|e| GitGovError::io("serialize session", e))?;
    std::fs::write(worktree.join(".session.json"), json).map_err(|e| GitGovError::io("write session file", e))
}

fn create_context<'a>(actor_id: &'a str, role: &'a str, notes: &'a str) -> CreateContext<'a> {
    CreateContext { actor_id, role, notes, now: Utc::now() }
}

// ── init ────────────────────────────────────────────────────────────────

/// Initialize (or re-validate) the `gitgov-state` worktree for `repo_root`.
///
/// # Errors
///
/// See [`gitgov_init::initialize`].
pub fn init(repo_root: &Path, project_name: &str, actor_display_name: &str) -> Result<gitgov_init::InitOutcome, GitGovError> {
    let ctx = InitContext { repo_root, now: Utc::now() };
    gitgov_init::initialize(&ctx, project_name, actor_display_name)
}

// ── actor ───────────────────────────────────────────────────────────────

/// Create a new actor with a freshly generated keypair and switch the
/// worktree's session to it.
///
/// # Errors
///
/// See [`IdentityAdapter::create_actor`].
pub fn actor_new(repo_root: &Path, actor_id: &str, kind: ActorKind, display_name: &str, roles: Vec<String>) -> Result<Record, GitGovError> {
    let worktree = worktree_for(repo_root)?;
    let mut actor_store: FsRecordStore<Record> = FsRecordStore::new(worktree.join("actors"));
    let mut key_store = FsKeyStore::new(worktree.join("keys"));
    let record = {
        let mut identity = IdentityAdapter::new(&mut actor_store, &mut key_store);
        identity.create_actor(actor_id, kind, display_name, roles, Utc::now())?
    };
    set_session_actor(&worktree, actor_id)?;
    Ok(record)
}

/// Rotate `actor_id`'s key, returning `(revoked, successor)`. The
/// worktree's session is switched to the successor, so subsequent
/// commands sign as it instead of hitting an ambiguous-actor error now
/// that two keys are on disk.
///
/// # Errors
///
/// See [`IdentityAdapter::rotate_key`].
pub fn actor_rotate_key(repo_root: &Path, actor_id: &str) -> Result<(Record, Record), GitGovError> {
    let worktree = worktree_for(repo_root)?;
    let mut actor_store: FsRecordStore<Record> = FsRecordStore::new(worktree.join("actors"));
    let mut key_store = FsKeyStore::new(worktree.join("keys"));
    let (revoked, successor) = {
        let mut identity = IdentityAdapter::new(&mut actor_store, &mut key_store);
        identity.rotate_key(actor_id, Utc::now())?
    };
    let successor_id = &successor.header.signatures[0].key_id;
    set_session_actor(&worktree, successor_id)?;
    Ok((revoked, successor))
}

// ── task ────────────────────────────────────────────────────────────────

fn backlog_stores(worktree: &Path) -> (FsRecordStore<Record>, FsRecordStore<Record>, FsRecordStore<Record>) {
    (
        FsRecordStore::new(worktree.join("tasks")),
        FsRecordStore::new(worktree.join("cycles")),
        FsRecordStore::new(worktree.join("changelog")),
    )
}

/// Create a task in `draft` status.
///
/// # Errors
///
/// See [`BacklogAdapter::create_task`].
pub fn task_new(repo_root: &Path, title: &str, description: &str, priority: TaskPriority) -> Result<Created, GitGovError> {
    let worktree = worktree_for(repo_root)?;
    let (actor_id, signing_key) = current_actor(&worktree)?;
    let (mut tasks, mut cycles, mut changelogs) = backlog_stores(&worktree);
    let mut backlog = BacklogAdapter::new(&mut tasks, &mut cycles, &mut changelogs, None);
    let ctx = create_context(&actor_id, "author", "task created via gitgov-cli");
    backlog.create_task(title, description, priority, &signing_key, &ctx)
}

/// The default signing role for a task transition, matching
/// [`gitgov_workflow::RoleMapping::default_mapping`].
#[must_use]
pub fn default_role_for_transition(from: TaskStatus, to: TaskStatus) -> &'static str {
    match (from, to) {
        (TaskStatus::Review, TaskStatus::Ready | TaskStatus::Draft) => "reviewer",
        (TaskStatus::Ready, TaskStatus::Active) => "approver",
        _ => "author",
    }
}

/// Edit `task_id`'s title and/or description in place, re-signing as
/// `author`. Does not change status.
///
/// # Errors
///
/// Returns [`GitGovError::ReferentialError`] if `task_id` is unknown, or
/// any error from [`gitgov_factory::mutate`].
pub fn task_edit(repo_root: &Path, task_id: &str, title: Option<&str>, description: Option<&str>) -> Result<Record, GitGovError> {
    let worktree = worktree_for(repo_root)?;
    let (actor_id, signing_key) = current_actor(&worktree)?;
    let mut tasks: FsRecordStore<Record> = FsRecordStore::new(worktree.join("tasks"));

    let current = tasks.get(task_id)?.ok_or_else(|| GitGovError::ReferentialError {
        kind: "taskId".to_string(),
        from: task_id.to_string(),
        to: task_id.to_string(),
    })?;
    let gitgov_core::Payload::Task(mut task) = current.payload.clone() else {
        return Err(GitGovError::SchemaError { path: "header.type".to_string(), message: "not a task record".to_string() });
    };
    if let Some(title) = title {
        task.title = title.to_string();
    }
    if let Some(description) = description {
        task.description = description.to_string();
    }

    let ctx = create_context(&actor_id, "author", "task edited via gitgov-cli");
    let mutated = gitgov_factory::mutate(&current, gitgov_core::Payload::Task(task), &signing_key, &ctx)?;
    tasks.put(task_id, &mutated)?;
    Ok(mutated)
}

/// Move `task_id` to `to`, signing with `role` (or the transition's
/// default role if `None`).
///
/// # Errors
///
/// See [`BacklogAdapter::change_task_status`].
pub fn task_transition(repo_root: &Path, task_id: &str, to: TaskStatus, role: Option<&str>, notes: &str) -> Result<Record, GitGovError> {
    let worktree = worktree_for(repo_root)?;
    let (actor_id, signing_key) = current_actor(&worktree)?;
    let (mut tasks, mut cycles, mut changelogs) = backlog_stores(&worktree);

    let current = tasks.get(task_id)?.ok_or_else(|| GitGovError::ReferentialError {
        kind: "taskId".to_string(),
        from: task_id.to_string(),
        to: task_id.to_string(),
    })?;
    let gitgov_core::Payload::Task(task) = &current.payload else {
        return Err(GitGovError::SchemaError { path: "header.type".to_string(), message: "not a task record".to_string() });
    };
    let role = role.unwrap_or_else(|| default_role_for_transition(task.status, to)).to_string();

    let mut backlog = BacklogAdapter::new(&mut tasks, &mut cycles, &mut changelogs, None);
    let ctx = create_context(&actor_id, &role, notes);
    let mutated = backlog.change_task_status(task_id, to, &signing_key, &ctx)?;

    if to == TaskStatus::Archived || to == TaskStatus::Done {
        gitgov_sync::regenerate_index(&worktree, Utc::now())?;
    }
    Ok(mutated)
}

/// Move `task_id` forward one workflow step: `review -> ready` (a
/// reviewer accepting it) or `ready -> active` (an approver or author
/// picking it up), whichever applies to the task's current status.
///
/// # Errors
///
/// Returns [`GitGovError::WorkflowError`] if `task_id` is in neither
/// `review` nor `ready`.
pub fn task_assign(repo_root: &Path, task_id: &str, role: Option<&str>, notes: &str) -> Result<Record, GitGovError> {
    let worktree = worktree_for(repo_root)?;
    let tasks: FsRecordStore<Record> = FsRecordStore::new(worktree.join("tasks"));
    let current = tasks.get(task_id)?.ok_or_else(|| GitGovError::ReferentialError {
        kind: "taskId".to_string(),
        from: task_id.to_string(),
        to: task_id.to_string(),
    })?;
    let gitgov_core::Payload::Task(task) = &current.payload else {
        return Err(GitGovError::SchemaError { path: "header.type".to_string(), message: "not a task record".to_string() });
    };
    let to = match task.status {
        TaskStatus::Review => TaskStatus::Ready,
        TaskStatus::Ready => TaskStatus::Active,
        other => {
            return Err(GitGovError::WorkflowError {
                from: format!("{other:?}"),
                to: "ready|active".to_string(),
                missing_roles: Vec::new(),
            })
        }
    };
    task_transition(repo_root, task_id, to, role, notes)
}

/// List the statuses `task_id` may move to from its current status, each
/// with the roles that would satisfy it, for a `task
/// transitions` subcommand that helps an actor pick a valid next step.
///
/// # Errors
///
/// Returns [`GitGovError::ReferentialError`] if `task_id` is unknown.
pub fn task_allowed_transitions(repo_root: &Path, task_id: &str) -> Result<Vec<(TaskStatus, Vec<&'static str>)>, GitGovError> {
    let worktree = worktree_for(repo_root)?;
    let tasks: FsRecordStore<Record> = FsRecordStore::new(worktree.join("tasks"));
    let record = tasks.get(task_id)?.ok_or_else(|| GitGovError::ReferentialError {
        kind: "taskId".to_string(),
        from: task_id.to_string(),
        to: task_id.to_string(),
    })?;
    let gitgov_core::Payload::Task(task) = &record.payload else {
        return Err(GitGovError::SchemaError { path: "header.type".to_string(), message: "not a task record".to_string() });
    };
    let mapping = gitgov_workflow::RoleMapping::default_mapping();
    let candidates = [
        TaskStatus::Draft,
        TaskStatus::Review,
        TaskStatus::Ready,
        TaskStatus::Active,
        TaskStatus::Paused,
        TaskStatus::Done,
        TaskStatus::Archived,
        TaskStatus::Discarded,
    ];
    Ok(candidates
        .into_iter()
        .filter_map(|to| mapping.required_roles(task.status, to).map(|roles| (to, roles.to_vec())))
        .collect())
}

/// Delete `task_id`, permitted only while `draft`.
///
/// # Errors
///
/// See [`BacklogAdapter::delete_task`].
pub fn task_delete(repo_root: &Path, task_id: &str) -> Result<(), GitGovError> {
    let worktree = worktree_for(repo_root)?;
    let (mut tasks, mut cycles, mut changelogs) = backlog_stores(&worktree);
    let mut backlog = BacklogAdapter::new(&mut tasks, &mut cycles, &mut changelogs, None);
    backlog.delete_task(task_id)
}

// ── cycle ───────────────────────────────────────────────────────────────

/// Create a cycle in `planning` status.
///
/// # Errors
///
/// See [`BacklogAdapter::create_cycle`].
pub fn cycle_new(repo_root: &Path, title: &str) -> Result<Created, GitGovError> {
    let worktree = worktree_for(repo_root)?;
    let (actor_id, signing_key) = current_actor(&worktree)?;
    let (mut tasks, mut cycles, mut changelogs) = backlog_stores(&worktree);
    let mut backlog = BacklogAdapter::new(&mut tasks, &mut cycles, &mut changelogs, None);
    let ctx = create_context(&actor_id, "author", "cycle created via gitgov-cli");
    backlog.create_cycle(title, &signing_key, &ctx)
}

/// Move `cycle_id` to `to`, strictly linear.
///
/// # Errors
///
/// See [`BacklogAdapter::change_cycle_status`].
pub fn cycle_transition(repo_root: &Path, cycle_id: &str, to: CycleStatus, notes: &str) -> Result<Record, GitGovError> {
    let worktree = worktree_for(repo_root)?;
    let (actor_id, signing_key) = current_actor(&worktree)?;
    let (mut tasks, mut cycles, mut changelogs) = backlog_stores(&worktree);
    let mut backlog = BacklogAdapter::new(&mut tasks, &mut cycles, &mut changelogs, None);
    let ctx = create_context(&actor_id, "author", notes);
    backlog.change_cycle_status(cycle_id, to, &signing_key, &ctx)
}

/// Add `task_id` to `cycle_id`, keeping both sides of the link in sync.
///
/// # Errors
///
/// See [`BacklogAdapter::link_task_to_cycle`].
pub fn cycle_add_task(repo_root: &Path, cycle_id: &str, task_id: &str) -> Result<(), GitGovError> {
    let worktree = worktree_for(repo_root)?;
    let (actor_id, signing_key) = current_actor(&worktree)?;
    let (mut tasks, mut cycles, mut changelogs) = backlog_stores(&worktree);
    let mut backlog = BacklogAdapter::new(&mut tasks, &mut cycles, &mut changelogs, None);
    backlog.link_task_to_cycle(task_id, cycle_id, &actor_id, "author", &signing_key, Utc::now())
}

/// Move `task_id` from `from_cycle_id` to `to_cycle_id`, unlinking then
/// relinking so both cycles' `taskIds` stay consistent.
///
/// # Errors
///
/// See [`BacklogAdapter::unlink_task_from_cycle`] and
/// [`BacklogAdapter::link_task_to_cycle`].
pub fn cycle_move_task(repo_root: &Path, task_id: &str, from_cycle_id: &str, to_cycle_id: &str) -> Result<(), GitGovError> {
    let worktree = worktree_for(repo_root)?;
    let (actor_id, signing_key) = current_actor(&worktree)?;
    let (mut tasks, mut cycles, mut changelogs) = backlog_stores(&worktree);
    let mut backlog = BacklogAdapter::new(&mut tasks, &mut cycles, &mut changelogs, None);
    backlog.unlink_task_from_cycle(task_id, from_cycle_id, &actor_id, "author", &signing_key, Utc::now())?;
    backlog.link_task_to_cycle(task_id, to_cycle_id, &actor_id, "author", &signing_key, Utc::now())
}

/// Remove `task_id` from `cycle_id`.
///
/// # Errors
///
/// See [`BacklogAdapter::unlink_task_from_cycle`].
pub fn cycle_remove_task(repo_root: &Path, cycle_id: &str, task_id: &str) -> Result<(), GitGovError> {
    let worktree = worktree_for(repo_root)?;
    let (actor_id, signing_key) = current_actor(&worktree)?;
    let (mut tasks, mut cycles, mut changelogs) = backlog_stores(&worktree);
    let mut backlog = BacklogAdapter::new(&mut tasks, &mut cycles, &mut changelogs, None);
    backlog.unlink_task_from_cycle(task_id, cycle_id, &actor_id, "author", &signing_key, Utc::now())
}

// ── execution / feedback / changelog ──────────────────────────────────────

/// Append an execution record against `task_id`.
///
/// # Errors
///
/// See [`gitgov_lifecycle::record_execution`].
#[allow(clippy::too_many_arguments)]
pub fn execution_record(
    repo_root: &Path,
    task_id: &str,
    exec_type: &str,
    title: &str,
    result: &str,
    notes: Option<String>,
    references: Option<Vec<String>>,
) -> Result<Created, GitGovError> {
    let worktree = worktree_for(repo_root)?;
    let (actor_id, signing_key) = current_actor(&worktree)?;
    let mut store: FsRecordStore<Record> = FsRecordStore::new(worktree.join("executions"));
    let ctx = create_context(&actor_id, "author", "execution recorded via gitgov-cli");
    gitgov_lifecycle::record_execution(&mut store, task_id, exec_type, title, result, notes, references, &signing_key, &ctx)
}

/// Create a new, open feedback record against `entity_type`/`entity_id`.
///
/// # Errors
///
/// See [`gitgov_lifecycle::record_feedback`].
pub fn feedback_new(repo_root: &Path, entity_type: &str, entity_id: &str, feedback_type: &str, content: &str) -> Result<Created, GitGovError> {
    let worktree = worktree_for(repo_root)?;
    let (actor_id, signing_key) = current_actor(&worktree)?;
    let mut store: FsRecordStore<Record> = FsRecordStore::new(worktree.join("feedback"));
    let ctx = create_context(&actor_id, "author", "feedback filed via gitgov-cli");
    gitgov_lifecycle::record_feedback(&mut store, entity_type, entity_id, feedback_type, content, &signing_key, &ctx)
}

/// Resolve `feedback_id` with a new, terminal feedback record.
///
/// # Errors
///
/// See [`gitgov_lifecycle::resolve_feedback`].
pub fn feedback_resolve(repo_root: &Path, feedback_id: &str, resolution_content: &str) -> Result<Created, GitGovError> {
    let worktree = worktree_for(repo_root)?;
    let (actor_id, signing_key) = current_actor(&worktree)?;
    let mut store: FsRecordStore<Record> = FsRecordStore::new(worktree.join("feedback"));
    let ctx = create_context(&actor_id, "author", "feedback resolved via gitgov-cli");
    gitgov_lifecycle::resolve_feedback(&mut store, feedback_id, resolution_content, &signing_key, &ctx)
}

/// Create a changelog entry bundling `related_tasks` directly, without
/// going through a task completion.
///
/// # Errors
///
/// See [`gitgov_lifecycle::record_changelog`].
pub fn changelog_new(repo_root: &Path, title: &str, description: &str, related_tasks: Vec<String>, version: &str) -> Result<Created, GitGovError> {
    let worktree = worktree_for(repo_root)?;
    let (actor_id, signing_key) = current_actor(&worktree)?;
    let mut store: FsRecordStore<Record> = FsRecordStore::new(worktree.join("changelog"));
    let ctx = create_context(&actor_id, "author", "changelog recorded via gitgov-cli");
    gitgov_lifecycle::record_changelog(&mut store, title, description, related_tasks, version, Utc::now(), &signing_key, &ctx)
}

// ── sync ────────────────────────────────────────────────────────────────

/// Commit, implicitly pull, and push.
///
/// # Errors
///
/// See [`WorktreeSync::push`].
pub fn sync_push(repo_root: &Path, remote: &str, token: &CancellationToken) -> Result<PushOutcome, GitGovError> {
    let ctx = SyncContext { repo_root, remote, now: Utc::now() };
    WorktreeSync::new(None).push(&ctx, token)
}

/// Bootstrap or pull the worktree.
///
/// # Errors
///
/// See [`WorktreeSync::pull`].
pub fn sync_pull(repo_root: &Path, remote: &str, token: &CancellationToken) -> Result<PullOutcome, GitGovError> {
    let ctx = SyncContext { repo_root, remote, now: Utc::now() };
    WorktreeSync::new(None).pull(&ctx, token)
}

/// Continue a stopped rebase and push, with an audit feedback record.
///
/// # Errors
///
/// See [`WorktreeSync::resolve`].
pub fn sync_resolve(repo_root: &Path, remote: &str, reason: &str) -> Result<ResolveOutcome, GitGovError> {
    let worktree = worktree_for(repo_root)?;
    let (actor_id, signing_key) = current_actor(&worktree)?;
    let ctx = SyncContext { repo_root, remote, now: Utc::now() };
    WorktreeSync::new(None).resolve(&ctx, &actor_id, &signing_key, reason)
}

// ── lint ────────────────────────────────────────────────────────────────

/// Run the lint pipeline against `repo_root`'s worktree.
///
/// # Errors
///
/// See [`gitgov_lint::lint`].
pub fn lint(repo_root: &Path, options: &LintOptions) -> Result<Report, GitGovError> {
    let worktree = worktree_for(repo_root)?;
    gitgov_lint::lint(&worktree, options, Utc::now())
}

// ── status / context ──────────────────────────────────────────────────────

/// Regenerate and load the projection index for `repo_root`'s worktree.
///
/// # Errors
///
/// Returns [`GitGovError::IoError`] if records or the index cannot be
/// read or written.
pub fn status(repo_root: &Path) -> Result<Index, GitGovError> {
    let worktree = worktree_for(repo_root)?;
    gitgov_sync::regenerate_index(&worktree, Utc::now())?;
    gitgov_projection::load(&worktree.join("index.json"))
}

/// A single task's enriched summary plus the activity recorded against it,
/// for an agent (or human) deciding what to do next.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TaskContext {
    /// The task's enriched index entry.
    pub task: gitgov_projection::EnrichedTask,
    /// Activity entries (executions/feedback/changelogs) concerning this
    /// task, newest first.
    pub activity: Vec<gitgov_projection::ActivityEntry>,
}

/// Build a [`TaskContext`] for `task_id`.
///
/// # Errors
///
/// Returns [`GitGovError::ReferentialError`] if `task_id` is not in the
/// index, or the usual I/O errors from [`status`].
pub fn context(repo_root: &Path, task_id: &str) -> Result<TaskContext, GitGovError> {
    let index = status(repo_root)?;
    let task = index
        .tasks
        .iter()
        .find(|t| t.id == task_id)
        .cloned()
        .ok_or_else(|| GitGovError::ReferentialError { kind: "taskId".to_string(), from: task_id.to_string(), to: task_id.to_string() })?;
    let activity = index.activity.iter().filter(|a| a.entity_id == task_id).cloned().collect();
    Ok(TaskContext { task, activity })
}

#[cfg(test)]
mod tests {
    use super::*;
    use gitgov_git::Repo;

    fn now_home() -> (tempfile::TempDir, tempfile::TempDir) {
        let repo_dir = tempfile::tempdir().unwrap();
        let repo = Repo::init(repo_dir.path()).unwrap();
        repo.configure_identity("Test", "test@example.com").unwrap();
        std::fs::write(repo_dir.path().join("README.md"), "hello").unwrap();
        repo.add_commit("initial commit").unwrap();
        let home = tempfile::tempdir().unwrap();
        (repo_dir, home)
    }

    fn with_home<F: FnOnce(&Path)>(home: &Path, f: F) {
        std::env::set_var(gitgov_config::HOME_OVERRIDE_ENV, home);
        f(home);
        std::env::remove_var(gitgov_config::HOME_OVERRIDE_ENV);
    }

    #[test]
    fn init_then_task_lifecycle() {
        let (repo_dir, home) = now_home();
        with_home(home.path(), |_| {
            init(repo_dir.path(), "Demo", "Alice").unwrap();
            let created = task_new(repo_dir.path(), "Write docs", "Document the CLI", TaskPriority::Medium).unwrap();
            let submitted = task_transition(repo_dir.path(), &created.id, TaskStatus::Review, None, "ready for review").unwrap();
            let gitgov_core::Payload::Task(task) = submitted.payload else { panic!("expected task") };
            assert_eq!(task.status, TaskStatus::Review);
        });
    }

    #[test]
    fn task_delete_rejects_non_draft() {
        let (repo_dir, home) = now_home();
        with_home(home.path(), |_| {
            init(repo_dir.path(), "Demo", "Alice").unwrap();
            let created = task_new(repo_dir.path(), "Write docs", "Document the CLI", TaskPriority::Low).unwrap();
            task_transition(repo_dir.path(), &created.id, TaskStatus::Review, None, "submit").unwrap();
            let err = task_delete(repo_dir.path(), &created.id).unwrap_err();
            assert_eq!(err.code(), gitgov_error::ErrorCode::WorkflowError);
        });
    }

    #[test]
    fn status_reflects_created_task() {
        let (repo_dir, home) = now_home();
        with_home(home.path(), |_| {
            init(repo_dir.path(), "Demo", "Alice").unwrap();
            let created = task_new(repo_dir.path(), "Write docs", "Document the CLI", TaskPriority::High).unwrap();
            let index = status(repo_dir.path()).unwrap();
            assert!(index.tasks.iter().any(|t| t.id == created.id));
        });
    }

    #[test]
    fn context_returns_referential_error_for_unknown_task() {
        let (repo_dir, home) = now_home();
        with_home(home.path(), |_| {
            init(repo_dir.path(), "Demo", "Alice").unwrap();
            let err = context(repo_dir.path(), "1700000000-task-nope").unwrap_err();
            assert_eq!(err.code(), gitgov_error::ErrorCode::ReferentialError);
        });
    }
}
