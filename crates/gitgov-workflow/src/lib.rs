// SPDX-License-Identifier: MIT OR Apache-2.0
#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]
#![warn(missing_docs)]

//! Task and cycle workflow state machines: transition rules gated by
//! the mover's role.

use gitgov_core::{CycleStatus, Signature, TaskStatus};
use gitgov_error::GitGovError;

/// The default role→capability mapping: which signer roles may move a
/// task between which states. Pluggable — callers that need a different
/// mapping construct their own [`RoleMapping`] instead of using
/// [`RoleMapping::default_mapping`].
pub struct RoleMapping {
    rules: Vec<(TaskStatus, TaskStatus, Vec<&'static str>)>,
}

impl RoleMapping {
    /// The default mapping: `author` drives
    /// forward progress and pausing; `reviewer` gates the review gate (in
    /// both directions); `approver` gates entry into `active` work.
    #[must_use]
    pub fn default_mapping() -> Self {
        Self {
            rules: vec![
                (TaskStatus::Draft, TaskStatus::Review, vec!["author"]),
                (TaskStatus::Review, TaskStatus::Ready, vec!["reviewer"]),
                (TaskStatus::Review, TaskStatus::Draft, vec!["reviewer"]),
                (TaskStatus::Ready, TaskStatus::Active, vec!["approver", "author"]),
                (TaskStatus::Active, TaskStatus::Paused, vec!["author"]),
                (TaskStatus::Paused, TaskStatus::Active, vec!["author"]),
                (TaskStatus::Active, TaskStatus::Done, vec!["author"]),
                (TaskStatus::Done, TaskStatus::Archived, vec!["author"]),
                (TaskStatus::Draft, TaskStatus::Discarded, vec!["author"]),
            ],
        }
    }

    /// The roles, any one of which satisfies `from -> to`. Empty means the
    /// transition is not in the mapping at all (distinct from "allowed to
    /// anyone").
    #[must_use]
    pub fn required_roles(&self, from: TaskStatus, to: TaskStatus) -> Option<&[&'static str]> {
        self.rules
            .iter()
            .find(|(f, t, _)| *f == from && *t == to)
            .map(|(_, _, roles)| roles.as_slice())
    }
}

impl Default for RoleMapping {
    fn default() -> Self {
        Self::default_mapping()
    }
}

fn status_label(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Draft => "draft",
        TaskStatus::Review => "review",
        TaskStatus::Ready => "ready",
        TaskStatus::Active => "active",
        TaskStatus::Paused => "paused",
        TaskStatus::Done => "done",
        TaskStatus::Archived => "archived",
        TaskStatus::Discarded => "discarded",
    }
}

/// Whether `from -> to` is a forbidden transition given `signatures`
/// already present on the mutation that would perform it (the caller
/// appends the mover's own signature to this set before calling, so a
/// self-authored transition is checked the same as any other).
///
/// # Errors
///
/// Returns [`GitGovError::WorkflowError`] naming the roles that would have
/// satisfied the transition, if none of `signatures`' roles match. The
/// error's `from`/`to` are always populated so the caller can build an
/// educational message referencing `reject` when the attempted operation
/// was a draft-only `delete` from a non-draft state.
pub fn is_allowed(mapping: &RoleMapping, from: TaskStatus, to: TaskStatus, signatures: &[Signature]) -> Result<(), GitGovError> {
    let Some(required) = mapping.required_roles(from, to) else {
        return Err(GitGovError::WorkflowError {
            from: status_label(from).to_string(),
            to: status_label(to).to_string(),
            missing_roles: vec!["(no such transition)".to_string()],
        });
    };
    let has_role = signatures.iter().any(|s| required.contains(&s.role.as_str()));
    if has_role {
        Ok(())
    } else {
        Err(GitGovError::WorkflowError {
            from: status_label(from).to_string(),
            to: status_label(to).to_string(),
            missing_roles: required.iter().map(|r| r.to_string()).collect(),
        })
    }
}

/// Whether `delete` is permitted for a task currently in `status`
/// — tasks are deletable only while in `draft`.
///
/// # Errors
///
/// Returns [`GitGovError::WorkflowError`] with an educational message
/// pointing at `reject` as the correct operation when `status` is
/// `review`, or a generic
/// denial for any other non-draft status.
pub fn can_delete(status: TaskStatus) -> Result<(), GitGovError> {
    if status == TaskStatus::Draft {
        return Ok(());
    }
    let hint = if status == TaskStatus::Review {
        "; use `reject` to send it back to draft, then delete from there".to_string()
    } else {
        String::new()
    };
    Err(GitGovError::WorkflowError {
        from: status_label(status).to_string(),
        to: "(deleted)".to_string(),
        missing_roles: vec![format!("task must be in draft to delete{hint}")],
    })
}

fn cycle_status_label(status: CycleStatus) -> &'static str {
    match status {
        CycleStatus::Planning => "planning",
        CycleStatus::Active => "active",
        CycleStatus::Completed => "completed",
        CycleStatus::Archived => "archived",
    }
}

/// Whether `from -> to` is a legal cycle transition
/// (`planning → active → completed → archived`, strictly linear, no
/// skipping and no going back).
///
/// # Errors
///
/// Returns [`GitGovError::WorkflowError`] if `to` does not immediately
/// follow `from` in the cycle lifecycle.
pub fn cycle_transition_allowed(from: CycleStatus, to: CycleStatus) -> Result<(), GitGovError> {
    let ok = matches!(
        (from, to),
        (CycleStatus::Planning, CycleStatus::Active)
            | (CycleStatus::Active, CycleStatus::Completed)
            | (CycleStatus::Completed, CycleStatus::Archived)
    );
    if ok {
        Ok(())
    } else {
        Err(GitGovError::WorkflowError {
            from: cycle_status_label(from).to_string(),
            to: cycle_status_label(to).to_string(),
            missing_roles: vec!["cycle lifecycle only moves forward one step at a time".to_string()],
        })
    }
}
