// SPDX-License-Identifier: MIT OR Apache-2.0
#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]
#![warn(missing_docs)]

//! Execution/feedback/changelog lifecycles: the secondary record kinds
//! that accrete around a task.

use chrono::{DateTime, Utc};

use gitgov_core::{ChangelogPayload, ExecutionPayload, FeedbackPayload, FeedbackStatus, Payload, Record};
use gitgov_error::GitGovError;
use gitgov_factory::{create, Created, CreateContext};
use gitgov_store::RecordStore;

/// Append an execution record against `task_id`. Execution records are
/// never mutated once created — each call produces a new entry in the
/// append-only audit log.
///
/// # Errors
///
/// Returns [`GitGovError::SchemaError`] if `task_id` does not match the
/// task id pattern, or any schema/invariant error from
/// [`gitgov_factory::create`].
#[allow(clippy::too_many_arguments)]
pub fn record_execution(
    store: &mut dyn RecordStore<Record>,
    task_id: &str,
    exec_type: &str,
    title: &str,
    result: &str,
    notes: Option<String>,
    references: Option<Vec<String>>,
    signing_key: &ed25519_dalek::SigningKey,
    ctx: &CreateContext<'_>,
) -> Result<Created, GitGovError> {
    let payload = Payload::Execution(ExecutionPayload {
        task_id: task_id.to_string(),
        exec_type: exec_type.to_string(),
        title: title.to_string(),
        result: result.to_string(),
        notes,
        references,
    });
    let created = create(payload, None, title, signing_key, ctx)?;
    store.put(&created.id, &created.record)?;
    Ok(created)
}

/// Create a new, open feedback record against `entity_type`/`entity_id`.
///
/// # Errors
///
/// Same as [`record_execution`].
pub fn record_feedback(
    store: &mut dyn RecordStore<Record>,
    entity_type: &str,
    entity_id: &str,
    feedback_type: &str,
    content: &str,
    signing_key: &ed25519_dalek::SigningKey,
    ctx: &CreateContext<'_>,
) -> Result<Created, GitGovError> {
    let payload = Payload::Feedback(FeedbackPayload {
        entity_type: entity_type.to_string(),
        entity_id: entity_id.to_string(),
        feedback_type: feedback_type.to_string(),
        status: FeedbackStatus::Open,
        content: content.to_string(),
        resolves_feedback_id: None,
    });
    let created = create(payload, None, content, signing_key, ctx)?;
    store.put(&created.id, &created.record)?;
    Ok(created)
}

/// Resolve `original_feedback_id` by creating a new, already-`resolved`
/// feedback record pointing back at it. The original record is left
/// untouched — feedback is immutable; resolution is a new record.
///
/// # Errors
///
/// Returns [`GitGovError::ReferentialError`] if `original_feedback_id` does
/// not resolve to a feedback record, or the usual create errors.
pub fn resolve_feedback(
    store: &mut dyn RecordStore<Record>,
    original_feedback_id: &str,
    resolution_content: &str,
    signing_key: &ed25519_dalek::SigningKey,
    ctx: &CreateContext<'_>,
) -> Result<Created, GitGovError> {
    let original = store.get(original_feedback_id)?.ok_or_else(|| GitGovError::ReferentialError {
        kind: "resolvesFeedbackId".to_string(),
        from: original_feedback_id.to_string(),
        to: original_feedback_id.to_string(),
    })?;
    let Payload::Feedback(original_payload) = &original.payload else {
        return Err(GitGovError::SchemaError {
            path: "header.type".to_string(),
            message: "resolve_feedback target must be a feedback record".to_string(),
        });
    };

    let payload = Payload::Feedback(FeedbackPayload {
        entity_type: original_payload.entity_type.clone(),
        entity_id: original_payload.entity_id.clone(),
        feedback_type: original_payload.feedback_type.clone(),
        status: FeedbackStatus::Resolved,
        content: resolution_content.to_string(),
        resolves_feedback_id: Some(original_feedback_id.to_string()),
    });
    let created = create(payload, None, resolution_content, signing_key, ctx)?;
    store.put(&created.id, &created.record)?;
    Ok(created)
}

/// Create a changelog entry bundling `related_tasks`, normally called by
/// the backlog adapter when a task transitions into `done` or `archived`.
///
/// # Errors
///
/// Returns [`GitGovError::SchemaError`] if `related_tasks` is empty, or the
/// usual create errors.
pub fn record_changelog(
    store: &mut dyn RecordStore<Record>,
    title: &str,
    description: &str,
    related_tasks: Vec<String>,
    version: &str,
    completed_at: DateTime<Utc>,
    signing_key: &ed25519_dalek::SigningKey,
    ctx: &CreateContext<'_>,
) -> Result<Created, GitGovError> {
    if related_tasks.is_empty() {
        return Err(GitGovError::SchemaError {
            path: "relatedTasks".to_string(),
            message: "changelog must bundle at least one task".to_string(),
        });
    }
    let payload = Payload::Changelog(ChangelogPayload {
        title: title.to_string(),
        description: description.to_string(),
        related_tasks,
        completed_at,
        version: version.to_string(),
    });
    let created = create(payload, None, title, signing_key, ctx)?;
    store.put(&created.id, &created.record)?;
    Ok(created)
}
