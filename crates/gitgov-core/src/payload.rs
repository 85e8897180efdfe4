//! The seven record payload shapes and the `RecordType` tag that selects
//! among them.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Regex pattern an `actor`/`agent` record id must match.
pub const ACTOR_ID_PATTERN: &str = r"^(human|agent)(:[a-z0-9-]+)+$";
/// Regex pattern a `cycle` record id must match.
pub const CYCLE_ID_PATTERN: &str = r"^\d{10}-cycle-[a-z0-9-]{1,50}$";
/// Regex pattern a `task` record id must match.
pub const TASK_ID_PATTERN: &str = r"^\d{10}-task-[a-z0-9-]{1,50}$";
/// Regex pattern an `execution` record id must match.
pub const EXECUTION_ID_PATTERN: &str = r"^\d{10}-exec-[a-z0-9-]{1,50}$";
/// Regex pattern a `feedback` record id must match.
pub const FEEDBACK_ID_PATTERN: &str = r"^\d{10}-feedback-[a-z0-9-]{1,50}$";
/// Regex pattern a `changelog` record id must match.
pub const CHANGELOG_ID_PATTERN: &str = r"^\d{10}-changelog-[a-z0-9-]{1,50}$";

/// Regex pattern a signature's `keyId` must match.
pub const KEY_ID_PATTERN: &str = r"^(human|agent)(:[a-z0-9-]+)+$";
/// Regex pattern a signature's `role` must match.
pub const ROLE_PATTERN: &str = r"^([a-z-]+|custom:[a-z0-9-]+)$";

/// The discriminant carried by `header.type`, selecting which payload shape
/// a record holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RecordType {
    /// A person or agent identity record.
    Actor,
    /// An agent manifest record.
    Agent,
    /// A sprint/milestone grouping of tasks.
    Cycle,
    /// A unit of work.
    Task,
    /// An append-only audit entry against a task.
    Execution,
    /// Feedback attached to another entity.
    Feedback,
    /// A record of completed work, bundling related tasks.
    Changelog,
}

impl RecordType {
    /// Stable lowercase wire string, matching the directory name a record
    /// of this type lives under in the state tree (pluralized for all but
    /// `changelog`, per §6).
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Actor => "actor",
            Self::Agent => "agent",
            Self::Cycle => "cycle",
            Self::Task => "task",
            Self::Execution => "execution",
            Self::Feedback => "feedback",
            Self::Changelog => "changelog",
        }
    }

    /// Directory name under `.gitgov/` this record type's files live in.
    #[must_use]
    pub fn directory(&self) -> &'static str {
        match self {
            Self::Actor => "actors",
            Self::Agent => "agents",
            Self::Cycle => "cycles",
            Self::Task => "tasks",
            Self::Execution => "executions",
            Self::Feedback => "feedback",
            Self::Changelog => "changelog",
        }
    }

    /// The id regex pattern for this record type.
    #[must_use]
    pub fn id_pattern(&self) -> &'static str {
        match self {
            Self::Actor | Self::Agent => ACTOR_ID_PATTERN,
            Self::Cycle => CYCLE_ID_PATTERN,
            Self::Task => TASK_ID_PATTERN,
            Self::Execution => EXECUTION_ID_PATTERN,
            Self::Feedback => FEEDBACK_ID_PATTERN,
            Self::Changelog => CHANGELOG_ID_PATTERN,
        }
    }
}

/// Whether an actor represents a human or an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ActorKind {
    /// A human operator.
    Human,
    /// An automated agent.
    Agent,
}

/// Lifecycle status of an actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ActorStatus {
    /// The actor may author and sign new records.
    Active,
    /// The actor has been superseded by a rotated key and may no longer
    /// author new records.
    Revoked,
}

/// A person or agent identity: `actorId → publicKey` plus declared roles.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ActorPayload {
    /// Whether this actor is a human or an agent.
    #[serde(rename = "type")]
    pub kind: ActorKind,
    /// Human-readable name shown in CLI output.
    #[serde(rename = "displayName")]
    pub display_name: String,
    /// Base64-encoded 32-byte Ed25519 public key.
    #[serde(rename = "publicKey")]
    pub public_key: String,
    /// Declared roles (non-empty), e.g. `["author", "reviewer"]`.
    pub roles: Vec<String>,
    /// Whether this actor can still author new records.
    pub status: ActorStatus,
    /// The id of the actor that superseded this one, if revoked via
    /// rotation.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub superseded_by: Option<String>,
}

/// How an agent's engine is invoked.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineSpec {
    /// Runs as a local subprocess/command.
    Local {
        /// Optional explicit invocation command; defaults to the engine's
        /// built-in runner when absent.
        #[serde(skip_serializing_if = "Option::is_none", default)]
        command: Option<String>,
    },
    /// Invoked over a plain HTTP(S) API.
    Api {
        /// RFC 3986 URL of the API endpoint.
        url: String,
    },
    /// Invoked as an MCP server.
    Mcp {
        /// RFC 3986 URL of the MCP endpoint.
        url: String,
    },
    /// An engine kind not covered by the built-in variants.
    Custom {
        /// Free-form label identifying the custom engine.
        label: String,
    },
}

/// An agent manifest: how an automated actor is invoked and what it knows
/// about.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct AgentPayload {
    /// How this agent's engine is invoked.
    pub engine: EngineSpec,
    /// Optional event triggers that invoke this agent automatically.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub triggers: Option<Vec<serde_json::Value>>,
    /// Optional list of knowledge sources (file/record references) this
    /// agent depends on.
    #[serde(rename = "knowledge_dependencies", skip_serializing_if = "Option::is_none", default)]
    pub knowledge_dependencies: Option<Vec<String>>,
}

/// Lifecycle status of a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum CycleStatus {
    /// Being scoped; tasks may be drafted against it.
    Planning,
    /// Currently being worked.
    Active,
    /// All work finished.
    Completed,
    /// Closed and no longer shown in default views.
    Archived,
}

/// A sprint/milestone grouping of tasks.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct CyclePayload {
    /// Short human-readable title.
    pub title: String,
    /// Current lifecycle status.
    pub status: CycleStatus,
    /// Ids of tasks assigned to this cycle. Bidirectional with each task's
    /// `cycleIds`.
    #[serde(rename = "taskIds", skip_serializing_if = "Option::is_none", default)]
    pub task_ids: Option<Vec<String>>,
    /// Ids of cycles nested under this one.
    #[serde(rename = "childCycleIds", skip_serializing_if = "Option::is_none", default)]
    pub child_cycle_ids: Option<Vec<String>>,
    /// Free-form labels.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub tags: Option<Vec<String>>,
}

/// Lifecycle status of a task. See the workflow state machine in
/// `gitgov-workflow` for the transition graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Newly created, not yet under review. Only state a task may be
    /// deleted from.
    Draft,
    /// Under review by a reviewer.
    Review,
    /// Approved, waiting to be picked up.
    Ready,
    /// Currently being worked.
    Active,
    /// Temporarily set aside; resumes back to `active`.
    Paused,
    /// Completed.
    Done,
    /// Closed and retained for history.
    Archived,
    /// Abandoned without completion.
    Discarded,
}

/// Relative urgency of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    /// Nice to have.
    Low,
    /// Default priority.
    Medium,
    /// Should be picked up soon.
    High,
    /// Blocking other work.
    Critical,
}

/// A unit of work.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct TaskPayload {
    /// Short human-readable title.
    pub title: String,
    /// Current lifecycle status.
    pub status: TaskStatus,
    /// Relative urgency.
    pub priority: TaskPriority,
    /// Long-form description.
    pub description: String,
    /// Ids of cycles this task belongs to. Bidirectional with each cycle's
    /// `taskIds`.
    #[serde(rename = "cycleIds", skip_serializing_if = "Option::is_none", default)]
    pub cycle_ids: Option<Vec<String>>,
    /// Typed references (`file:`, `task:`, `cycle:`, `commit:`, `pr:`,
    /// `adapter:`, `url:`).
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub references: Option<Vec<String>>,
    /// Free-form labels.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub tags: Option<Vec<String>>,
}

/// An append-only audit entry against a task.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ExecutionPayload {
    /// The task this execution was recorded against. Must resolve to an
    /// existing task record.
    #[serde(rename = "taskId")]
    pub task_id: String,
    /// Free-form execution kind. Unrecognized `custom:*` values are
    /// treated as `"info"` by readers; see [`ExecutionPayload::normalized_type`].
    #[serde(rename = "type")]
    pub exec_type: String,
    /// Short human-readable title.
    pub title: String,
    /// The outcome or artifact produced.
    pub result: String,
    /// Optional free-form notes.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub notes: Option<String>,
    /// Typed references, as in [`TaskPayload::references`].
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub references: Option<Vec<String>>,
}

impl ExecutionPayload {
    /// The type a reader should treat this execution as: any `custom:*`
    /// value is normalized to `"info"`, every other value passes through
    /// unchanged.
    #[must_use]
    pub fn normalized_type(&self) -> &str {
        if self.exec_type.starts_with("custom:") {
            "info"
        } else {
            &self.exec_type
        }
    }
}

/// Lifecycle status of a piece of feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackStatus {
    /// Not yet resolved.
    Open,
    /// Resolved by a subsequent feedback record.
    Resolved,
}

/// Feedback attached to another entity. Immutable once created; a
/// resolution is a new feedback record, not a mutation.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct FeedbackPayload {
    /// The record type the feedback targets, e.g. `"task"`.
    #[serde(rename = "entityType")]
    pub entity_type: String,
    /// The id of the targeted entity; must match `entityType`'s id
    /// pattern.
    #[serde(rename = "entityId")]
    pub entity_id: String,
    /// Free-form feedback category.
    #[serde(rename = "type")]
    pub feedback_type: String,
    /// Current resolution status.
    pub status: FeedbackStatus,
    /// The feedback text.
    pub content: String,
    /// If this feedback resolves an earlier one, the earlier feedback's
    /// id.
    #[serde(rename = "resolvesFeedbackId", skip_serializing_if = "Option::is_none", default)]
    pub resolves_feedback_id: Option<String>,
}

/// A record of completed work, bundling one or more related tasks.
/// Auto-created by the backlog adapter when a task enters `done` or
/// `archived`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ChangelogPayload {
    /// Title, at least 10 characters.
    pub title: String,
    /// Description, at least 20 characters.
    pub description: String,
    /// Ids of the tasks this changelog entry covers; non-empty.
    #[serde(rename = "relatedTasks")]
    pub related_tasks: Vec<String>,
    /// When the bundled work completed.
    #[serde(rename = "completedAt")]
    pub completed_at: DateTime<Utc>,
    /// Free-form version label.
    pub version: String,
}

/// The sum of the seven concrete payload shapes a [`crate::Record`] may
/// carry.
///
/// Serializes as whichever variant is active (no wrapper tag — the tag
/// lives on `header.type`, one level up). Deserialization is therefore
/// dispatched externally by [`crate::Record`]'s `Deserialize` impl, keyed
/// on `header.type`; see [`Payload::from_value`].
#[derive(Debug, Clone, Serialize, JsonSchema)]
#[serde(untagged)]
pub enum Payload {
    /// See [`ActorPayload`].
    Actor(ActorPayload),
    /// See [`AgentPayload`].
    Agent(AgentPayload),
    /// See [`CyclePayload`].
    Cycle(CyclePayload),
    /// See [`TaskPayload`].
    Task(TaskPayload),
    /// See [`ExecutionPayload`].
    Execution(ExecutionPayload),
    /// See [`FeedbackPayload`].
    Feedback(FeedbackPayload),
    /// See [`ChangelogPayload`].
    Changelog(ChangelogPayload),
}

impl Payload {
    /// The [`RecordType`] this payload variant corresponds to.
    #[must_use]
    pub fn record_type(&self) -> RecordType {
        match self {
            Self::Actor(_) => RecordType::Actor,
            Self::Agent(_) => RecordType::Agent,
            Self::Cycle(_) => RecordType::Cycle,
            Self::Task(_) => RecordType::Task,
            Self::Execution(_) => RecordType::Execution,
            Self::Feedback(_) => RecordType::Feedback,
            Self::Changelog(_) => RecordType::Changelog,
        }
    }

    /// Deserialize `value` into the concrete payload shape named by
    /// `record_type`, dispatching on the tag explicitly rather than
    /// guessing from shape (untagged-enum guessing is ambiguous and slow;
    /// the tag is already known from `header.type`).
    ///
    /// # Errors
    ///
    /// Returns the underlying [`serde_json::Error`] if `value` does not
    /// match the shape `record_type` expects.
    pub fn from_value(record_type: RecordType, value: serde_json::Value) -> Result<Self, serde_json::Error> {
        Ok(match record_type {
            RecordType::Actor => Self::Actor(serde_json::from_value(value)?),
            RecordType::Agent => Self::Agent(serde_json::from_value(value)?),
            RecordType::Cycle => Self::Cycle(serde_json::from_value(value)?),
            RecordType::Task => Self::Task(serde_json::from_value(value)?),
            RecordType::Execution => Self::Execution(serde_json::from_value(value)?),
            RecordType::Feedback => Self::Feedback(serde_json::from_value(value)?),
            RecordType::Changelog => Self::Changelog(serde_json::from_value(value)?),
        })
    }
}
