// SPDX-License-Identifier: MIT OR Apache-2.0
#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]
#![warn(missing_docs)]

//! Project initializer: creates the state worktree, `config.json`, a
//! self-signed bootstrap actor, and the root cycle.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use gitgov_backlog::BacklogAdapter;
use gitgov_config::ProjectConfig;
use gitgov_core::{ActorKind, Record};
use gitgov_crypto::keys::FsKeyStore;
use gitgov_error::GitGovError;
use gitgov_factory::CreateContext;
use gitgov_git::Repo;
use gitgov_identity::IdentityAdapter;
use gitgov_store::FsRecordStore;

const STATE_BRANCH: &str = "gitgov-state";
const BOOTSTRAP_MARKER: &str = ".gitgov-bootstrap";
const CATEGORY_DIRS: &[&str] = &["actors", "agents", "cycles", "tasks", "executions", "feedback", "changelog", "keys"];

/// Everything [`initialize`] needs that isn't a business parameter: where
/// the code repository lives and what time to stamp new records with.
#[derive(Debug, Clone)]
pub struct InitContext<'a> {
    /// The code repository's root directory (need not be canonical —
    /// [`initialize`] resolves its realpath itself, matching the worktree
    /// address formula's dependence on `realpath(repo)`).
    pub repo_root: &'a Path,
    /// The wall-clock time to stamp the bootstrap actor and root cycle
    /// with.
    pub now: DateTime<Utc>,
}

/// The result of a successful [`initialize`] call.
#[derive(Debug, Clone)]
pub struct InitOutcome {
    /// The worktree directory the state tree was materialized in (or
    /// already existed at).
    pub worktree_path: PathBuf,
    /// Whether this call found a matching, already-initialized worktree
    /// and performed no writes.
    pub already_initialized: bool,
    /// The id of the self-signed bootstrap actor. Unset (empty) on an
    /// idempotent no-op where the caller didn't need it re-resolved.
    pub bootstrap_actor_id: String,
    /// The loaded or freshly written project config.
    pub config: ProjectConfig,
}

fn slugify(name: &str) -> String {
    let mut slug: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect();
    while slug.contains("--") {
        slug = slug.replace("--", "-");
    }
    slug.trim_matches('-').to_string()
}

/// Ensure `gitgov-state` exists and is materialized as a worktree at
/// `worktree_path`, creating the orphan branch first if it has no commits
/// yet anywhere in `repo_root`.
fn ensure_worktree(repo_root: &Path, worktree_path: &Path) -> Result<(), GitGovError> {
    if worktree_path.exists() {
        return Ok(());
    }

    let code_repo = if Repo::exists(repo_root) {
        Repo::open(repo_root)
    } else {
        Repo::init(repo_root)?
    };

    if !code_repo.has_commits(STATE_BRANCH)? {
        let original_branch = code_repo.current_branch()?;
        code_repo.create_orphan_branch(STATE_BRANCH)?;
        std::fs::write(repo_root.join(BOOTSTRAP_MARKER), b"").map_err(|e| GitGovError::io("write bootstrap marker", e))?;
        code_repo.add_commit("gitgov: bootstrap state branch")?;
        code_repo.checkout(&original_branch)?;
    }

    if let Some(parent) = worktree_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| GitGovError::io("create worktree parent directory", e))?;
    }
    code_repo.worktree_add(worktree_path, STATE_BRANCH)?;

    let marker = worktree_path.join(BOOTSTRAP_MARKER);
    if marker.exists() {
        std::fs::remove_file(&marker).map_err(|e| GitGovError::io("remove bootstrap marker", e))?;
        let state_repo = Repo::open(worktree_path);
        state_repo.add_commit("gitgov: clear bootstrap marker")?;
    }
    Ok(())
}

fn ensure_category_dirs(worktree_path: &Path) -> Result<(), GitGovError> {
    for dir in CATEGORY_DIRS {
        std::fs::create_dir_all(worktree_path.join(dir)).map_err(|e| GitGovError::io(format!("create {dir} directory"), e))?;
    }
    let gitignore = worktree_path.join(".gitignore");
    if !gitignore.exists() {
        std::fs::write(&gitignore, "keys/\n.session.json\n").map_err(|e| GitGovError::io("write .gitignore", e))?;
    }
    Ok(())
}

/// Initialize (or re-validate) the `gitgov-state` worktree for the
/// repository at `ctx.repo_root`: materializes the worktree if absent,
/// writes `config.json`, creates a self-signed bootstrap actor, and
/// creates the root cycle. Idempotent: a second call against a matching
/// `project_name` is a no-op; against a diverging one it returns
/// [`GitGovError::AlreadyInitializedError`].
///
/// # Errors
///
/// Returns [`GitGovError::IoError`] on any git or filesystem failure, or
/// [`GitGovError::AlreadyInitializedError`] if the worktree already holds
/// a config for a different project.
pub fn initialize(ctx: &InitContext<'_>, project_name: &str, actor_display_name: &str) -> Result<InitOutcome, GitGovError> {
    let repo_realpath = std::fs::canonicalize(ctx.repo_root).map_err(|e| GitGovError::io("resolve repository realpath", e))?;
    let worktree_path = gitgov_config::worktree_path(&repo_realpath)?;

    ensure_worktree(&repo_realpath, &worktree_path)?;
    ensure_category_dirs(&worktree_path)?;

    let config_path = worktree_path.join("config.json");
    if config_path.exists() {
        let existing = ProjectConfig::load(&config_path)?;
        if existing.project_name == project_name {
            return Ok(InitOutcome {
                worktree_path,
                already_initialized: true,
                bootstrap_actor_id: String::new(),
                config: existing,
            });
        }
        return Err(GitGovError::AlreadyInitializedError {
            reason: format!("worktree already initialized for project {:?}, not {:?}", existing.project_name, project_name),
        });
    }

    let project_id = gitgov_crypto::canon::sha256_hex(repo_realpath.to_string_lossy().as_bytes());
    let actor_id = format!("human:{}", slugify(actor_display_name));

    let mut actor_store: FsRecordStore<Record> = FsRecordStore::new(worktree_path.join("actors"));
    let mut key_store = FsKeyStore::new(worktree_path.join("keys"));
    let signing_key = gitgov_crypto::keys::signing_key_from_seed_string(&format!("gitgov-init:{project_id}:{actor_id}"));
    {
        let mut identity = IdentityAdapter::new(&mut actor_store, &mut key_store);
        identity.create_actor_with_key(
            &actor_id,
            ActorKind::Human,
            actor_display_name,
            vec!["author".to_string(), "reviewer".to_string(), "approver".to_string()],
            signing_key.clone(),
            ctx.now,
        )?;
    }

    let mut tasks_store: FsRecordStore<Record> = FsRecordStore::new(worktree_path.join("tasks"));
    let mut cycles_store: FsRecordStore<Record> = FsRecordStore::new(worktree_path.join("cycles"));
    let mut changelogs_store: FsRecordStore<Record> = FsRecordStore::new(worktree_path.join("changelog"));
    let root_cycle = {
        let mut backlog = BacklogAdapter::new(&mut tasks_store, &mut cycles_store, &mut changelogs_store, None);
        let create_ctx = CreateContext {
            actor_id: &actor_id,
            role: "author",
            notes: "root cycle created at init",
            now: ctx.now,
        };
        backlog.create_cycle(project_name, &signing_key, &create_ctx)?
    };

    let config = ProjectConfig {
        protocol_version: gitgov_config::PROTOCOL_VERSION.to_string(),
        project_id,
        project_name: project_name.to_string(),
        root_cycle: root_cycle.id.clone(),
    };
    config.save(&config_path)?;

    let state_repo = Repo::open(&worktree_path);
    state_repo.add_commit("gitgov: initialize project")?;

    Ok(InitOutcome {
        worktree_path,
        already_initialized: false,
        bootstrap_actor_id: actor_id,
        config,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn init_code_repo() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repo::init(dir.path()).unwrap();
        repo.configure_identity("Test", "test@example.com").unwrap();
        std::fs::write(dir.path().join("README.md"), "hello").unwrap();
        repo.add_commit("initial commit").unwrap();
        dir
    }

    fn with_home<F: FnOnce(&Path)>(f: F) {
        let home = tempfile::tempdir().unwrap();
        std::env::set_var(gitgov_config::HOME_OVERRIDE_ENV, home.path());
        f(home.path());
        std::env::remove_var(gitgov_config::HOME_OVERRIDE_ENV);
    }

    #[test]
    fn initialize_creates_worktree_and_config() {
        with_home(|_home| {
            let repo_dir = init_code_repo();
            let ctx = InitContext { repo_root: repo_dir.path(), now: now() };
            let outcome = initialize(&ctx, "NRP", "Test User").unwrap();
            assert!(!outcome.already_initialized);
            assert!(outcome.worktree_path.join("config.json").exists());
            assert!(outcome.worktree_path.join("actors").read_dir().unwrap().next().is_some());
            assert_eq!(outcome.config.project_name, "NRP");
            assert!(outcome.bootstrap_actor_id.starts_with("human:"));
        });
    }

    #[test]
    fn initialize_succeeds_with_no_commits_on_main() {
        with_home(|_home| {
            let repo_dir = tempfile::tempdir().unwrap();
            let repo = Repo::init(repo_dir.path()).unwrap();
            repo.configure_identity("Test", "test@example.com").unwrap();
            let ctx = InitContext { repo_root: repo_dir.path(), now: now() };
            let outcome = initialize(&ctx, "NRP", "Test User").unwrap();
            assert!(outcome.worktree_path.join("config.json").exists());
        });
    }

    #[test]
    fn initialize_twice_with_same_project_is_noop() {
        with_home(|_home| {
            let repo_dir = init_code_repo();
            let ctx = InitContext { repo_root: repo_dir.path(), now: now() };
            let first = initialize(&ctx, "NRP", "Test User").unwrap();
            let second = initialize(&ctx, "NRP", "Test User").unwrap();
            assert!(second.already_initialized);
            assert_eq!(first.config, second.config);
        });
    }

    #[test]
    fn initialize_rejects_diverging_project_name() {
        with_home(|_home| {
            let repo_dir = init_code_repo();
            let ctx = InitContext { repo_root: repo_dir.path(), now: now() };
            initialize(&ctx, "NRP", "Test User").unwrap();
            let err = initialize(&ctx, "Other Project", "Test User").unwrap_err();
            assert_eq!(err.code(), gitgov_error::ErrorCode::AlreadyInitializedError);
        });
    }
}
