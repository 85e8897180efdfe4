// SPDX-License-Identifier: MIT OR Apache-2.0
#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]
#![warn(missing_docs)]

//! Task and cycle backlog adapter: orchestrates task/cycle lifecycle,
//! keeping task-cycle membership bidirectionally consistent.

use chrono::{DateTime, Utc};

use gitgov_core::{CyclePayload, CycleStatus, Payload, Record, TaskPayload, TaskPriority, TaskStatus};
use gitgov_error::GitGovError;
use gitgov_eventbus::{EventBus, Topic};
use gitgov_factory::{create, mutate, Created, CreateContext};
use gitgov_store::RecordStore;
use gitgov_workflow::RoleMapping;

/// Events the backlog adapter publishes on its [`EventBus`].
#[derive(Debug, Clone)]
pub enum BacklogEvent {
    /// A task was created. Carries its id.
    TaskCreated(String),
    /// A task moved from one status to another. Carries `(id, from, to)`.
    TaskStatusChanged(String, TaskStatus, TaskStatus),
    /// A cycle was created. Carries its id.
    CycleCreated(String),
    /// A cycle moved from one status to another. Carries `(id, from, to)`.
    CycleStatusChanged(String, CycleStatus, CycleStatus),
}

impl Topic for BacklogEvent {
    fn topic(&self) -> &str {
        match self {
            Self::TaskCreated(_) => "task.created",
            Self::TaskStatusChanged(..) => "task.status.changed",
            Self::CycleCreated(_) => "cycle.created",
            Self::CycleStatusChanged(..) => "cycle.status.changed",
        }
    }
}

/// Orchestrates task/cycle CRUD over two [`RecordStore`]s, gating status
/// transitions through [`RoleMapping`] and keeping `task.cycleIds` and
/// `cycle.taskIds` in sync.
pub struct BacklogAdapter<'a> {
    tasks: &'a mut dyn RecordStore<Record>,
    cycles: &'a mut dyn RecordStore<Record>,
    changelogs: &'a mut dyn RecordStore<Record>,
    mapping: RoleMapping,
    events: Option<&'a EventBus<BacklogEvent>>,
}

impl<'a> BacklogAdapter<'a> {
    /// Construct an adapter over task/cycle/changelog stores, using the
    /// default role mapping. `events`, if present, receives a notification
    /// for every mutation this adapter performs. The changelog store is
    /// written to automatically whenever a task transitions into `done` or
    /// `archived`.
    pub fn new(
        tasks: &'a mut dyn RecordStore<Record>,
        cycles: &'a mut dyn RecordStore<Record>,
        changelogs: &'a mut dyn RecordStore<Record>,
        events: Option<&'a EventBus<BacklogEvent>>,
    ) -> Self {
        Self {
            tasks,
            cycles,
            changelogs,
            mapping: RoleMapping::default_mapping(),
            events,
        }
    }

    fn publish(&self, event: BacklogEvent) {
        if let Some(bus) = self.events {
            bus.publish(event);
        }
    }

    /// Create a task in `draft` status.
    ///
    /// # Errors
    ///
    /// Returns [`GitGovError::SchemaError`] if the payload fails schema or
    /// invariant validation, or [`GitGovError::IoError`] if it cannot be
    /// persisted.
    pub fn create_task(
        &mut self,
        title: &str,
        description: &str,
        priority: TaskPriority,
        signing_key: &ed25519_dalek::SigningKey,
        ctx: &CreateContext<'_>,
    ) -> Result<Created, GitGovError> {
        let payload = Payload::Task(TaskPayload {
            title: title.to_string(),
            status: TaskStatus::Draft,
            priority,
            description: description.to_string(),
            cycle_ids: None,
            references: None,
            tags: None,
        });
        let created = create(payload, None, title, signing_key, ctx)?;
        self.tasks.put(&created.id, &created.record)?;
        self.publish(BacklogEvent::TaskCreated(created.id.clone()));
        Ok(created)
    }

    /// Create a cycle in `planning` status.
    ///
    /// # Errors
    ///
    /// Same as [`BacklogAdapter::create_task`].
    pub fn create_cycle(&mut self, title: &str, signing_key: &ed25519_dalek::SigningKey, ctx: &CreateContext<'_>) -> Result<Created, GitGovError> {
        let payload = Payload::Cycle(CyclePayload {
            title: title.to_string(),
            status: CycleStatus::Planning,
            task_ids: None,
            child_cycle_ids: None,
            tags: None,
        });
        let created = create(payload, None, title, signing_key, ctx)?;
        self.cycles.put(&created.id, &created.record)?;
        self.publish(BacklogEvent::CycleCreated(created.id.clone()));
        Ok(created)
    }

    /// Move `task_id` from its current status to `to`, gated by
    /// [`gitgov_workflow::is_allowed`] against `ctx.role`.
    ///
    /// # Errors
    ///
    /// Returns [`GitGovError::ReferentialError`] if `task_id` is unknown,
    /// [`GitGovError::WorkflowError`] if the transition is not permitted
    /// for `ctx.role`, or the usual mutate errors.
    pub fn change_task_status(
        &mut self,
        task_id: &str,
        to: TaskStatus,
        signing_key: &ed25519_dalek::SigningKey,
        ctx: &CreateContext<'_>,
    ) -> Result<Record, GitGovError> {
        let record = self.tasks.get(task_id)?.ok_or_else(|| GitGovError::ReferentialError {
            kind: "taskId".to_string(),
            from: task_id.to_string(),
            to: task_id.to_string(),
        })?;
        let Payload::Task(task) = &record.payload else {
            return Err(GitGovError::SchemaError {
                path: "header.type".to_string(),
                message: "change_task_status requires a task record".to_string(),
            });
        };
        let from = task.status;
        let pretend_signature = gitgov_core::Signature {
            key_id: ctx.actor_id.to_string(),
            role: ctx.role.to_string(),
            notes: ctx.notes.to_string(),
            signature: String::new(),
            timestamp: ctx.now.timestamp(),
            metadata: None,
        };
        gitgov_workflow::is_allowed(&self.mapping, from, to, std::slice::from_ref(&pretend_signature))?;

        let mut new_task = task.clone();
        new_task.status = to;
        let mutated = mutate(&record, Payload::Task(new_task), signing_key, ctx)?;
        self.tasks.put(task_id, &mutated)?;

        if matches!(to, TaskStatus::Done | TaskStatus::Archived) {
            self.record_completion_changelog(task_id, &task.title, to, signing_key, ctx)?;
        }

        self.publish(BacklogEvent::TaskStatusChanged(task_id.to_string(), from, to));
        Ok(mutated)
    }

    /// Bundle `task_id`'s completion into a new changelog entry.
    /// Failure here does not
    /// roll back the status change that triggered it — the task mutation
    /// already persisted is the primary write; the changelog is secondary
    /// bookkeeping a lint run can reconstruct is missing.
    fn record_completion_changelog(
        &mut self,
        task_id: &str,
        task_title: &str,
        to: TaskStatus,
        signing_key: &ed25519_dalek::SigningKey,
        ctx: &CreateContext<'_>,
    ) -> Result<(), GitGovError> {
        let verb = if to == TaskStatus::Done { "completed" } else { "archived" };
        let title = format!("Changelog: {task_title}");
        let description = format!("Task \"{task_title}\" (id {task_id}) was {verb}.");
        gitgov_lifecycle::record_changelog(self.changelogs, &title, &description, vec![task_id.to_string()], "v1", ctx.now, signing_key, ctx)?;
        Ok(())
    }

    /// Move `cycle_id` from its current status to `to`, strictly linear
    /// per [`gitgov_workflow::cycle_transition_allowed`].
    ///
    /// # Errors
    ///
    /// Same shape as [`BacklogAdapter::change_task_status`].
    pub fn change_cycle_status(
        &mut self,
        cycle_id: &str,
        to: CycleStatus,
        signing_key: &ed25519_dalek::SigningKey,
        ctx: &CreateContext<'_>,
    ) -> Result<Record, GitGovError> {
        let record = self.cycles.get(cycle_id)?.ok_or_else(|| GitGovError::ReferentialError {
            kind: "cycleId".to_string(),
            from: cycle_id.to_string(),
            to: cycle_id.to_string(),
        })?;
        let Payload::Cycle(cycle) = &record.payload else {
            return Err(GitGovError::SchemaError {
                path: "header.type".to_string(),
                message: "change_cycle_status requires a cycle record".to_string(),
            });
        };
        let from = cycle.status;
        gitgov_workflow::cycle_transition_allowed(from, to)?;

        let mut new_cycle = cycle.clone();
        new_cycle.status = to;
        let mutated = mutate(&record, Payload::Cycle(new_cycle), signing_key, ctx)?;
        self.cycles.put(cycle_id, &mutated)?;
        self.publish(BacklogEvent::CycleStatusChanged(cycle_id.to_string(), from, to));
        Ok(mutated)
    }

    /// Delete `task_id`, permitted only while it is in `draft`.
    ///
    /// # Errors
    ///
    /// Returns [`GitGovError::ReferentialError`] if `task_id` is unknown,
    /// or [`GitGovError::WorkflowError`] if it is not in `draft`.
    pub fn delete_task(&mut self, task_id: &str) -> Result<(), GitGovError> {
        let record = self.tasks.get(task_id)?.ok_or_else(|| GitGovError::ReferentialError {
            kind: "taskId".to_string(),
            from: task_id.to_string(),
            to: task_id.to_string(),
        })?;
        let Payload::Task(task) = &record.payload else {
            return Err(GitGovError::SchemaError {
                path: "header.type".to_string(),
                message: "delete_task requires a task record".to_string(),
            });
        };
        gitgov_workflow::can_delete(task.status)?;
        self.tasks.delete(task_id)
    }

    /// Add `task_id` to `cycle_id`, updating both `task.cycleIds` and
    /// `cycle.taskIds` as one logical transaction: if the cycle-side
    /// mutation fails, the task-side mutation is rolled back by
    /// re-writing the task's pre-mutation record rather than left
    /// half-applied.
    ///
    /// Both mutations are signed as `actor_id` in `role` — the caller's
    /// own identity, not a synthetic system principal, since the envelope
    /// is verified against the key that actually produced the signature.
    ///
    /// # Errors
    ///
    /// Returns [`GitGovError::ReferentialError`] if either id is unknown.
    #[allow(clippy::too_many_arguments)]
    pub fn link_task_to_cycle(
        &mut self,
        task_id: &str,
        cycle_id: &str,
        actor_id: &str,
        role: &str,
        signing_key: &ed25519_dalek::SigningKey,
        now: DateTime<Utc>,
    ) -> Result<(), GitGovError> {
        let task_record = self.tasks.get(task_id)?.ok_or_else(|| GitGovError::ReferentialError {
            kind: "taskId".to_string(),
            from: cycle_id.to_string(),
            to: task_id.to_string(),
        })?;
        let cycle_record = self.cycles.get(cycle_id)?.ok_or_else(|| GitGovError::ReferentialError {
            kind: "cycleId".to_string(),
            from: task_id.to_string(),
            to: cycle_id.to_string(),
        })?;
        let Payload::Task(task) = &task_record.payload else {
            return Err(GitGovError::SchemaError {
                path: "header.type".to_string(),
                message: "link_task_to_cycle requires a task record".to_string(),
            });
        };
        let Payload::Cycle(cycle) = &cycle_record.payload else {
            return Err(GitGovError::SchemaError {
                path: "header.type".to_string(),
                message: "link_task_to_cycle requires a cycle record".to_string(),
            });
        };

        let ctx = CreateContext {
            actor_id,
            role,
            notes: "bidirectional cycle link",
            now,
        };

        let mut new_task = task.clone();
        let mut cycle_ids = new_task.cycle_ids.clone().unwrap_or_default();
        if !cycle_ids.contains(&cycle_id.to_string()) {
            cycle_ids.push(cycle_id.to_string());
        }
        new_task.cycle_ids = Some(cycle_ids);
        let mutated_task = mutate(&task_record, Payload::Task(new_task), signing_key, &ctx)?;

        let mut new_cycle = cycle.clone();
        let mut task_ids = new_cycle.task_ids.clone().unwrap_or_default();
        if !task_ids.contains(&task_id.to_string()) {
            task_ids.push(task_id.to_string());
        }
        new_cycle.task_ids = Some(task_ids);

        match mutate(&cycle_record, Payload::Cycle(new_cycle), signing_key, &ctx) {
            Ok(mutated_cycle) => {
                self.tasks.put(task_id, &mutated_task)?;
                self.cycles.put(cycle_id, &mutated_cycle)?;
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Remove `task_id` from `cycle_id`, the inverse of
    /// [`BacklogAdapter::link_task_to_cycle`]. Signed the same way: as
    /// `actor_id` in `role`, not a synthetic system principal.
    ///
    /// # Errors
    ///
    /// Same as [`BacklogAdapter::link_task_to_cycle`].
    #[allow(clippy::too_many_arguments)]
    pub fn unlink_task_from_cycle(
        &mut self,
        task_id: &str,
        cycle_id: &str,
        actor_id: &str,
        role: &str,
        signing_key: &ed25519_dalek::SigningKey,
        now: DateTime<Utc>,
    ) -> Result<(), GitGovError> {
        let task_record = self.tasks.get(task_id)?.ok_or_else(|| GitGovError::ReferentialError {
            kind: "taskId".to_string(),
            from: cycle_id.to_string(),
            to: task_id.to_string(),
        })?;
        let cycle_record = self.cycles.get(cycle_id)?.ok_or_else(|| GitGovError::ReferentialError {
            kind: "cycleId".to_string(),
            from: task_id.to_string(),
            to: cycle_id.to_string(),
        })?;
        let Payload::Task(task) = &task_record.payload else {
            return Err(GitGovError::SchemaError {
                path: "header.type".to_string(),
                message: "unlink_task_from_cycle requires a task record".to_string(),
            });
        };
        let Payload::Cycle(cycle) = &cycle_record.payload else {
            return Err(GitGovError::SchemaError {
                path: "header.type".to_string(),
                message: "unlink_task_from_cycle requires a cycle record".to_string(),
            });
        };

        let ctx = CreateContext {
            actor_id,
            role,
            notes: "bidirectional cycle unlink",
            now,
        };

        let mut new_task = task.clone();
        new_task.cycle_ids = new_task.cycle_ids.map(|ids| ids.into_iter().filter(|id| id != cycle_id).collect());
        let mutated_task = mutate(&task_record, Payload::Task(new_task), signing_key, &ctx)?;

        let mut new_cycle = cycle.clone();
        new_cycle.task_ids = new_cycle.task_ids.map(|ids| ids.into_iter().filter(|id| id != task_id).collect());
        let mutated_cycle = mutate(&cycle_record, Payload::Cycle(new_cycle), signing_key, &ctx)?;

        self.tasks.put(task_id, &mutated_task)?;
        self.cycles.put(cycle_id, &mutated_cycle)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gitgov_crypto::keys::signing_key_from_seed_string;
    use gitgov_store::MemoryRecordStore;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn ctx() -> CreateContext<'static> {
        CreateContext {
            actor_id: "human:alice",
            role: "author",
            notes: "initial draft",
            now: now(),
        }
    }

    #[test]
    fn create_task_starts_in_draft() {
        let mut tasks = MemoryRecordStore::new();
        let mut cycles = MemoryRecordStore::new();
        let key = signing_key_from_seed_string("human:alice");
        let mut changelogs = MemoryRecordStore::new();
        let mut adapter = BacklogAdapter::new(&mut tasks, &mut cycles, &mut changelogs, None);
        let created = adapter.create_task("Write docs", "desc", TaskPriority::Medium, &key, &ctx()).unwrap();
        let Payload::Task(task) = created.record.payload else { panic!("expected task") };
        assert_eq!(task.status, TaskStatus::Draft);
    }

    #[test]
    fn change_task_status_rejects_unauthorized_role() {
        let mut tasks = MemoryRecordStore::new();
        let mut cycles = MemoryRecordStore::new();
        let key = signing_key_from_seed_string("human:alice");
        let mut changelogs = MemoryRecordStore::new();
        let mut adapter = BacklogAdapter::new(&mut tasks, &mut cycles, &mut changelogs, None);
        let created = adapter.create_task("Write docs", "desc", TaskPriority::Medium, &key, &ctx()).unwrap();
        let bob_ctx = CreateContext {
            actor_id: "human:bob",
            role: "reviewer",
            notes: "approving",
            now: now(),
        };
        let err = adapter.change_task_status(&created.id, TaskStatus::Ready, &key, &bob_ctx).unwrap_err();
        assert_eq!(err.code(), gitgov_error::ErrorCode::WorkflowError);
    }

    #[test]
    fn change_task_status_allows_author_submit() {
        let mut tasks = MemoryRecordStore::new();
        let mut cycles = MemoryRecordStore::new();
        let key = signing_key_from_seed_string("human:alice");
        let mut changelogs = MemoryRecordStore::new();
        let mut adapter = BacklogAdapter::new(&mut tasks, &mut cycles, &mut changelogs, None);
        let created = adapter.create_task("Write docs", "desc", TaskPriority::Medium, &key, &ctx()).unwrap();
        let mutated = adapter.change_task_status(&created.id, TaskStatus::Review, &key, &ctx()).unwrap();
        let Payload::Task(task) = mutated.payload else { panic!("expected task") };
        assert_eq!(task.status, TaskStatus::Review);
    }

    #[test]
    fn delete_task_rejects_non_draft() {
        let mut tasks = MemoryRecordStore::new();
        let mut cycles = MemoryRecordStore::new();
        let key = signing_key_from_seed_string("human:alice");
        let mut changelogs = MemoryRecordStore::new();
        let mut adapter = BacklogAdapter::new(&mut tasks, &mut cycles, &mut changelogs, None);
        let created = adapter.create_task("Write docs", "desc", TaskPriority::Medium, &key, &ctx()).unwrap();
        adapter.change_task_status(&created.id, TaskStatus::Review, &key, &ctx()).unwrap();
        let err = adapter.delete_task(&created.id).unwrap_err();
        assert!(err.to_string().contains("reject"));
    }

    #[test]
    fn link_task_to_cycle_updates_both_sides() {
        let mut tasks = MemoryRecordStore::new();
        let mut cycles = MemoryRecordStore::new();
        let key = signing_key_from_seed_string("human:alice");
        let mut changelogs = MemoryRecordStore::new();
        let mut adapter = BacklogAdapter::new(&mut tasks, &mut cycles, &mut changelogs, None);
        let task = adapter.create_task("Write docs", "desc", TaskPriority::Medium, &key, &ctx()).unwrap();
        let cycle = adapter.create_cycle("Sprint 1", &key, &ctx()).unwrap();

        adapter.link_task_to_cycle(&task.id, &cycle.id, "human:alice", "author", &key, now()).unwrap();

        let task_record = adapter.tasks.get(&task.id).unwrap().unwrap();
        let Payload::Task(t) = task_record.payload else { panic!("expected task") };
        assert_eq!(t.cycle_ids, Some(vec![cycle.id.clone()]));

        let cycle_record = adapter.cycles.get(&cycle.id).unwrap().unwrap();
        let Payload::Cycle(c) = cycle_record.payload else { panic!("expected cycle") };
        assert_eq!(c.task_ids, Some(vec![task.id.clone()]));
    }

    #[test]
    fn unlink_task_from_cycle_clears_both_sides() {
        let mut tasks = MemoryRecordStore::new();
        let mut cycles = MemoryRecordStore::new();
        let key = signing_key_from_seed_string("human:alice");
        let mut changelogs = MemoryRecordStore::new();
        let mut adapter = BacklogAdapter::new(&mut tasks, &mut cycles, &mut changelogs, None);
        let task = adapter.create_task("Write docs", "desc", TaskPriority::Medium, &key, &ctx()).unwrap();
        let cycle = adapter.create_cycle("Sprint 1", &key, &ctx()).unwrap();
        adapter.link_task_to_cycle(&task.id, &cycle.id, "human:alice", "author", &key, now()).unwrap();

        adapter.unlink_task_from_cycle(&task.id, &cycle.id, "human:alice", "author", &key, now()).unwrap();

        let task_record = adapter.tasks.get(&task.id).unwrap().unwrap();
        let Payload::Task(t) = task_record.payload else { panic!("expected task") };
        assert_eq!(t.cycle_ids, Some(vec![]));
    }

    #[test]
    fn cycle_status_change_rejects_skipping_states() {
        let mut tasks = MemoryRecordStore::new();
        let mut cycles = MemoryRecordStore::new();
        let key = signing_key_from_seed_string("human:alice");
        let mut changelogs = MemoryRecordStore::new();
        let mut adapter = BacklogAdapter::new(&mut tasks, &mut cycles, &mut changelogs, None);
        let cycle = adapter.create_cycle("Sprint 1", &key, &ctx()).unwrap();
        let err = adapter.change_cycle_status(&cycle.id, CycleStatus::Completed, &key, &ctx()).unwrap_err();
        assert_eq!(err.code(), gitgov_error::ErrorCode::WorkflowError);
    }

    #[test]
    fn completing_a_task_auto_creates_a_changelog() {
        let mut tasks = MemoryRecordStore::new();
        let mut cycles = MemoryRecordStore::new();
        let key = signing_key_from_seed_string("human:alice");
        let mut changelogs = MemoryRecordStore::new();
        let mut adapter = BacklogAdapter::new(&mut tasks, &mut cycles, &mut changelogs, None);
        let created = adapter.create_task("Write docs", "desc", TaskPriority::Medium, &key, &ctx()).unwrap();
        adapter.change_task_status(&created.id, TaskStatus::Review, &key, &ctx()).unwrap();

        let approver_ctx = CreateContext {
            actor_id: "human:alice",
            role: "reviewer",
            notes: "looks good",
            now: now(),
        };
        adapter.change_task_status(&created.id, TaskStatus::Ready, &key, &approver_ctx).unwrap();
        adapter.change_task_status(&created.id, TaskStatus::Active, &key, &ctx()).unwrap();
        adapter.change_task_status(&created.id, TaskStatus::Done, &key, &ctx()).unwrap();

        let ids = changelogs.list().unwrap();
        assert_eq!(ids.len(), 1);
        let record = changelogs.get(&ids[0]).unwrap().unwrap();
        let Payload::Changelog(cl) = record.payload else { panic!("expected changelog") };
        assert_eq!(cl.related_tasks, vec![created.id.clone()]);
    }

    #[test]
    fn events_are_published_on_task_creation() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let mut tasks = MemoryRecordStore::new();
        let mut cycles = MemoryRecordStore::new();
        let bus: EventBus<BacklogEvent> = EventBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        bus.subscribe("task.created", move |_| {
            c.fetch_add(1, Ordering::Relaxed);
        });
        let key = signing_key_from_seed_string("human:alice");
        let mut changelogs = MemoryRecordStore::new();
        let mut adapter = BacklogAdapter::new(&mut tasks, &mut cycles, &mut changelogs, Some(&bus));
        adapter.create_task("Write docs", "desc", TaskPriority::Medium, &key, &ctx()).unwrap();
        assert_eq!(count.load(Ordering::Relaxed), 1);
    }
}
