// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
//! `gitgov`: a thin, contract-only binary over the GitGovernance adapters.
//!
//! This binary carries no business logic of its own; every subcommand
//! parses its arguments and calls straight into [`commands`], formatting
//! the result through [`format::Formatter`].

mod commands;
mod format;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use gitgov_core::{ActorKind, TaskPriority, TaskStatus};
use gitgov_error::{ErrorEnvelope, GitGovError};
use gitgov_sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use crate::format::{Formatter, OutputFormat};

#[derive(Parser, Debug)]
#[command(name = "gitgov", version, about = "GitGovernance record engine CLI")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging.
    #[arg(long, global = true)]
    debug: bool,

    /// Output format: text | compact | json | json-pretty.
    #[arg(long, global = true, default_value = "text")]
    format: String,

    /// Path to the code repository this worktree governs.
    #[arg(long, global = true, default_value = ".")]
    repo_root: PathBuf,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Initialize (or re-validate) the gitgov-state worktree.
    Init {
        #[arg(long, default_value = "Untitled Project")]
        project_name: String,
        #[arg(long, default_value = "Project Owner")]
        actor_name: String,
    },
    /// Synchronize the gitgov-state branch with a remote.
    Sync {
        #[command(subcommand)]
        action: SyncCommand,
    },
    /// Manage actors (humans and agents).
    Actor {
        #[command(subcommand)]
        action: ActorCommand,
    },
    /// Manage tasks.
    Task {
        #[command(subcommand)]
        action: TaskCommand,
    },
    /// Manage cycles.
    Cycle {
        #[command(subcommand)]
        action: CycleCommand,
    },
    /// Run the record lint pipeline.
    Lint {
        /// Accepted for interface compatibility; the pipeline always scans
        /// the whole worktree.
        paths: Vec<PathBuf>,
        #[arg(long)]
        fix: bool,
        #[arg(long, value_delimiter = ',')]
        fix_validators: Vec<String>,
        #[arg(long, value_delimiter = ',')]
        exclude_validators: Vec<String>,
        #[arg(long)]
        check_migrations: bool,
        #[arg(long)]
        summary: bool,
        #[arg(long)]
        quiet: bool,
    },
    /// Show the current project index (tasks, cycles, metrics).
    Status,
    /// Show a task's enriched summary and recorded activity.
    Context { task_id: String },
}

#[derive(Subcommand, Debug)]
enum SyncCommand {
    /// Commit, implicitly pull, and push to `remote`.
    Push {
        #[arg(long, default_value = "origin")]
        remote: String,
    },
    /// Bootstrap or pull the worktree from `remote`.
    Pull {
        #[arg(long, default_value = "origin")]
        remote: String,
    },
    /// Continue a stopped rebase and push, recording an audit feedback entry.
    Resolve {
        #[arg(long, default_value = "origin")]
        remote: String,
        #[arg(long, default_value = "")]
        reason: String,
    },
}

#[derive(Subcommand, Debug)]
enum ActorCommand {
    /// Create a new actor and switch the worktree session to it.
    New {
        actor_id: String,
        #[arg(long, value_enum, default_value_t = ActorKindArg::Human)]
        kind: ActorKindArg,
        #[arg(long)]
        display_name: String,
        #[arg(long, value_delimiter = ',')]
        roles: Vec<String>,
    },
    /// Revoke `actor_id`'s current key and mint a successor.
    RotateKey { actor_id: String },
}

#[derive(Subcommand, Debug)]
enum TaskCommand {
    /// Create a task in `draft` status.
    New {
        title: String,
        description: String,
        #[arg(long, value_enum, default_value_t = TaskPriorityArg::Medium)]
        priority: TaskPriorityArg,
    },
    /// Update a task's title and/or description in place.
    Edit {
        task_id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Move a `draft` task to `review`.
    Submit {
        task_id: String,
        #[arg(long)]
        role: Option<String>,
        #[arg(long, default_value = "")]
        notes: String,
    },
    /// Advance a `review` task to `ready`, or a `ready` task to `active`.
    Assign {
        task_id: String,
        #[arg(long)]
        role: Option<String>,
        #[arg(long, default_value = "")]
        notes: String,
    },
    /// Move an `active` task to `paused`.
    Pause {
        task_id: String,
        #[arg(long, default_value = "")]
        notes: String,
    },
    /// Move a `paused` task back to `active`.
    Resume {
        task_id: String,
        #[arg(long, default_value = "")]
        notes: String,
    },
    /// Delete a task, permitted only while `draft`.
    Delete { task_id: String },
}

#[derive(Subcommand, Debug)]
enum CycleCommand {
    /// Create a cycle in `planning` status.
    New { title: String },
    /// Link a task into a cycle.
    AddTask { cycle_id: String, task_id: String },
    /// Move a task from one cycle to another.
    MoveTask { task_id: String, from_cycle_id: String, to_cycle_id: String },
    /// Unlink a task from a cycle.
    RemoveTask { cycle_id: String, task_id: String },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ActorKindArg {
    Human,
    Agent,
}

impl From<ActorKindArg> for ActorKind {
    fn from(v: ActorKindArg) -> Self {
        match v {
            ActorKindArg::Human => ActorKind::Human,
            ActorKindArg::Agent => ActorKind::Agent,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum TaskPriorityArg {
    Low,
    Medium,
    High,
    Critical,
}

impl From<TaskPriorityArg> for TaskPriority {
    fn from(v: TaskPriorityArg) -> Self {
        match v {
            TaskPriorityArg::Low => TaskPriority::Low,
            TaskPriorityArg::Medium => TaskPriority::Medium,
            TaskPriorityArg::High => TaskPriority::High,
            TaskPriorityArg::Critical => TaskPriority::Critical,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.debug { EnvFilter::new("gitgov=debug") } else { EnvFilter::new("gitgov=info") };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let format: OutputFormat = match cli.format.parse() {
        Ok(f) => f,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(2);
        }
    };
    let formatter = Formatter::new(format.clone());

    match run(&cli.command, &cli.repo_root, &format, &formatter) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{}", formatter.format_error(&ErrorEnvelope::from(&err)));
            ExitCode::from(u8::try_from(err.exit_code()).unwrap_or(2))
        }
    }
}

fn run(command: &Command, repo_root: &Path, format: &OutputFormat, formatter: &Formatter) -> Result<ExitCode, GitGovError> {
    match command {
        Command::Init { project_name, actor_name } => {
            let outcome = commands::init(repo_root, project_name, actor_name)?;
            println!("{}", formatter.format_init_outcome(&outcome));
            Ok(ExitCode::SUCCESS)
        }

        Command::Sync { action } => run_sync(action, repo_root),

        Command::Actor { action } => run_actor(action, repo_root, formatter),

        Command::Task { action } => run_task(action, repo_root, formatter),

        Command::Cycle { action } => run_cycle(action, repo_root, formatter),

        Command::Lint { paths: _paths, fix, fix_validators, exclude_validators, check_migrations, summary, quiet } => {
            let options = gitgov_lint::LintOptions {
                exclude_validators: exclude_validators.clone(),
                check_migrations: *check_migrations,
                fix: *fix,
                fix_validators: if fix_validators.is_empty() { None } else { Some(fix_validators.clone()) },
            };
            let report = commands::lint(repo_root, &options)?;
            print_lint_output(formatter, format, &report, *quiet, *summary);
            if report.summary.errors > 0 {
                Ok(ExitCode::from(1))
            } else {
                Ok(ExitCode::SUCCESS)
            }
        }

        Command::Status => {
            let index = commands::status(repo_root)?;
            println!("{}", formatter.format_index(&index));
            Ok(ExitCode::SUCCESS)
        }

        Command::Context { task_id } => {
            let ctx = commands::context(repo_root, task_id)?;
            println!("{}", formatter.format_task_context(&ctx));
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn run_sync(action: &SyncCommand, repo_root: &Path) -> Result<ExitCode, GitGovError> {
    let token = CancellationToken::new();
    {
        let token = token.clone();
        let _ = ctrlc::set_handler(move || token.cancel());
    }

    match action {
        SyncCommand::Push { remote } => {
            let outcome = commands::sync_push(repo_root, remote, &token)?;
            println!("pulled: {}  pushed: {}", outcome.pulled, outcome.pushed);
            Ok(ExitCode::SUCCESS)
        }
        SyncCommand::Pull { remote } => {
            let outcome = commands::sync_pull(repo_root, remote, &token)?;
            println!("bootstrapped: {}  pulled: {}", outcome.bootstrapped, outcome.pulled);
            Ok(ExitCode::SUCCESS)
        }
        SyncCommand::Resolve { remote, reason } => {
            let outcome = commands::sync_resolve(repo_root, remote, reason)?;
            println!("audit record: {}", outcome.audit_record_id);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn run_actor(action: &ActorCommand, repo_root: &Path, formatter: &Formatter) -> Result<ExitCode, GitGovError> {
    match action {
        ActorCommand::New { actor_id, kind, display_name, roles } => {
            let record = commands::actor_new(repo_root, actor_id, (*kind).into(), display_name, roles.clone())?;
            println!("{}", formatter.format_record(actor_id, &record));
            Ok(ExitCode::SUCCESS)
        }
        ActorCommand::RotateKey { actor_id } => {
            let (revoked, successor) = commands::actor_rotate_key(repo_root, actor_id)?;
            let successor_id = &successor.header.signatures[0].key_id;
            println!("{}", formatter.format_record(actor_id, &revoked));
            println!("{}", formatter.format_record(successor_id, &successor));
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn run_task(action: &TaskCommand, repo_root: &Path, formatter: &Formatter) -> Result<ExitCode, GitGovError> {
    match action {
        TaskCommand::New { title, description, priority } => {
            let created = commands::task_new(repo_root, title, description, (*priority).into())?;
            println!("{}", formatter.format_record(&created.id, &created.record));
            Ok(ExitCode::SUCCESS)
        }
        TaskCommand::Edit { task_id, title, description } => {
            let record = commands::task_edit(repo_root, task_id, title.as_deref(), description.as_deref())?;
            println!("{}", formatter.format_record(task_id, &record));
            Ok(ExitCode::SUCCESS)
        }
        TaskCommand::Submit { task_id, role, notes } => {
            let record = commands::task_transition(repo_root, task_id, TaskStatus::Review, role.as_deref(), notes)?;
            println!("{}", formatter.format_record(task_id, &record));
            Ok(ExitCode::SUCCESS)
        }
        TaskCommand::Assign { task_id, role, notes } => {
            let record = commands::task_assign(repo_root, task_id, role.as_deref(), notes)?;
            println!("{}", formatter.format_record(task_id, &record));
            Ok(ExitCode::SUCCESS)
        }
        TaskCommand::Pause { task_id, notes } => {
            let record = commands::task_transition(repo_root, task_id, TaskStatus::Paused, None, notes)?;
            println!("{}", formatter.format_record(task_id, &record));
            Ok(ExitCode::SUCCESS)
        }
        TaskCommand::Resume { task_id, notes } => {
            let record = commands::task_transition(repo_root, task_id, TaskStatus::Active, None, notes)?;
            println!("{}", formatter.format_record(task_id, &record));
            Ok(ExitCode::SUCCESS)
        }
        TaskCommand::Delete { task_id } => {
            commands::task_delete(repo_root, task_id)?;
            println!("deleted: {task_id}");
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn run_cycle(action: &CycleCommand, repo_root: &Path, formatter: &Formatter) -> Result<ExitCode, GitGovError> {
    match action {
        CycleCommand::New { title } => {
            let created = commands::cycle_new(repo_root, title)?;
            println!("{}", formatter.format_record(&created.id, &created.record));
            Ok(ExitCode::SUCCESS)
        }
        CycleCommand::AddTask { cycle_id, task_id } => {
            commands::cycle_add_task(repo_root, cycle_id, task_id)?;
            println!("linked: {task_id} -> {cycle_id}");
            Ok(ExitCode::SUCCESS)
        }
        CycleCommand::MoveTask { task_id, from_cycle_id, to_cycle_id } => {
            commands::cycle_move_task(repo_root, task_id, from_cycle_id, to_cycle_id)?;
            println!("moved: {task_id} {from_cycle_id} -> {to_cycle_id}");
            Ok(ExitCode::SUCCESS)
        }
        CycleCommand::RemoveTask { cycle_id, task_id } => {
            commands::cycle_remove_task(repo_root, cycle_id, task_id)?;
            println!("unlinked: {task_id} <- {cycle_id}");
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn print_lint_output(formatter: &Formatter, format: &OutputFormat, report: &gitgov_lint::Report, quiet: bool, summary: bool) {
    if quiet {
        return;
    }
    if summary {
        match format {
            OutputFormat::Json => println!("{}", serde_json::to_string(&report.summary).unwrap_or_default()),
            OutputFormat::JsonPretty => println!("{}", serde_json::to_string_pretty(&report.summary).unwrap_or_default()),
            OutputFormat::Text | OutputFormat::Compact => println!(
                "files checked: {}  errors: {}  warnings: {}  fixable: {}",
                report.summary.files_checked, report.summary.errors, report.summary.warnings, report.summary.fixable,
            ),
        }
        return;
    }
    println!("{}", formatter.format_report(report));
}
