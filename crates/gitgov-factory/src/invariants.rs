//! Business invariants (§4.4 step 4): checks a compiled JSON-Schema cannot
//! express, such as cross-field rules and enum-shape disjointness.

use regex::Regex;
use std::sync::OnceLock;

use gitgov_core::payload::{KEY_ID_PATTERN, ROLE_PATTERN};
use gitgov_core::{ActorStatus, ChangelogPayload, EngineSpec, Payload, RecordType, TaskStatus};
use gitgov_error::GitGovError;

fn key_id_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(KEY_ID_PATTERN).expect("KEY_ID_PATTERN compiles"))
}

fn role_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(ROLE_PATTERN).expect("ROLE_PATTERN compiles"))
}

/// Validate a signature's `notes` field: 1..1000 characters.
///
/// # Errors
///
/// Returns [`GitGovError::SchemaError`] if out of range.
pub fn validate_notes(notes: &str) -> Result<(), GitGovError> {
    let len = notes.chars().count();
    if (1..=1000).contains(&len) {
        Ok(())
    } else {
        Err(GitGovError::SchemaError {
            path: "header.signatures[].notes".to_string(),
            message: format!("notes must be 1..1000 characters, got {len}"),
        })
    }
}

/// Validate a signature's `role` field: `^([a-z-]+|custom:[a-z0-9-]+)$`,
/// 1..50 characters.
///
/// # Errors
///
/// Returns [`GitGovError::SchemaError`] if the pattern or length does not
/// match.
pub fn validate_role(role: &str) -> Result<(), GitGovError> {
    let len = role.chars().count();
    if !(1..=50).contains(&len) || !role_regex().is_match(role) {
        return Err(GitGovError::SchemaError {
            path: "header.signatures[].role".to_string(),
            message: format!("role {role:?} does not match {ROLE_PATTERN}"),
        });
    }
    Ok(())
}

/// Validate a signature's `keyId` field against
/// `^(human|agent)(:[a-z0-9-]+)+$`.
///
/// # Errors
///
/// Returns [`GitGovError::SchemaError`] if the pattern does not match.
pub fn validate_key_id(key_id: &str) -> Result<(), GitGovError> {
    if key_id_regex().is_match(key_id) {
        Ok(())
    } else {
        Err(GitGovError::SchemaError {
            path: "header.signatures[].keyId".to_string(),
            message: format!("keyId {key_id:?} does not match {KEY_ID_PATTERN}"),
        })
    }
}

/// Validate that an id matches the id pattern for `record_type`.
///
/// # Errors
///
/// Returns [`GitGovError::SchemaError`] if the id does not match the
/// record type's pattern.
pub fn validate_id_pattern(record_type: RecordType, id: &str) -> Result<(), GitGovError> {
    let pattern = record_type.id_pattern();
    let re = Regex::new(pattern).expect("every record type's id pattern compiles");
    if re.is_match(id) {
        Ok(())
    } else {
        Err(GitGovError::SchemaError {
            path: "id".to_string(),
            message: format!("id {id:?} does not match {pattern}"),
        })
    }
}

/// Payload-level business invariants that a compiled JSON-Schema cannot
/// express: cross-field rules (`revoked ⇒ supersededBy`), length bounds on
/// free text, and disjoint variant requirements (`api`/`mcp` engines
/// require a URL, which schemars' untagged-by-field encoding already forces
/// structurally, but an empty URL is still checked here).
///
/// `is_create` gates the one rule that applies only at creation time: a
/// freshly created task must start in `draft`.
///
/// # Errors
///
/// Returns [`GitGovError::SchemaError`] describing the first violated
/// invariant.
pub fn validate_payload_invariants(payload: &Payload, is_create: bool) -> Result<(), GitGovError> {
    match payload {
        Payload::Actor(actor) => {
            if actor.roles.is_empty() {
                return Err(schema_err("payload.roles", "actor must declare at least one role"));
            }
            if actor.status == ActorStatus::Revoked && actor.superseded_by.is_none() {
                return Err(schema_err(
                    "payload.supersededBy",
                    "a revoked actor must name the actor that superseded it",
                ));
            }
        }
        Payload::Agent(agent) => {
            if let EngineSpec::Api { url } | EngineSpec::Mcp { url } = &agent.engine {
                if url.trim().is_empty() {
                    return Err(schema_err("payload.engine.url", "api/mcp engines require a non-empty url"));
                }
            }
        }
        Payload::Task(task) => {
            if is_create && task.status != TaskStatus::Draft {
                return Err(schema_err("payload.status", "a newly created task must start in draft"));
            }
        }
        Payload::Changelog(changelog) => validate_changelog(changelog)?,
        Payload::Cycle(_) | Payload::Execution(_) | Payload::Feedback(_) => {}
    }
    Ok(())
}

fn validate_changelog(changelog: &ChangelogPayload) -> Result<(), GitGovError> {
    if changelog.title.chars().count() < 10 {
        return Err(schema_err("payload.title", "changelog title must be at least 10 characters"));
    }
    if changelog.description.chars().count() < 20 {
        return Err(schema_err(
            "payload.description",
            "changelog description must be at least 20 characters",
        ));
    }
    if changelog.related_tasks.is_empty() {
        return Err(schema_err(
            "payload.relatedTasks",
            "changelog must bundle at least one related task",
        ));
    }
    Ok(())
}

fn schema_err(path: &str, message: &str) -> GitGovError {
    GitGovError::SchemaError {
        path: path.to_string(),
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gitgov_core::{ActorKind, ActorPayload};

    #[test]
    fn revoked_actor_without_successor_is_rejected() {
        let payload = Payload::Actor(ActorPayload {
            kind: ActorKind::Human,
            display_name: "Alice".into(),
            public_key: "x".repeat(44),
            roles: vec!["author".into()],
            status: ActorStatus::Revoked,
            superseded_by: None,
        });
        assert!(validate_payload_invariants(&payload, false).is_err());
    }

    #[test]
    fn notes_length_bounds() {
        assert!(validate_notes("").is_err());
        assert!(validate_notes("fine").is_ok());
        assert!(validate_notes(&"x".repeat(1001)).is_err());
    }

    #[test]
    fn role_pattern_accepts_custom_prefix() {
        assert!(validate_role("reviewer").is_ok());
        assert!(validate_role("custom:release-manager").is_ok());
        assert!(validate_role("Not Valid!").is_err());
    }

    #[test]
    fn key_id_pattern_requires_human_or_agent_prefix() {
        assert!(validate_key_id("human:alice").is_ok());
        assert!(validate_key_id("agent:ci-bot").is_ok());
        assert!(validate_key_id("bob").is_err());
    }

    #[test]
    fn id_pattern_matches_task_shape() {
        assert!(validate_id_pattern(RecordType::Task, "1700000000-task-example").is_ok());
        assert!(validate_id_pattern(RecordType::Task, "not-an-id").is_err());
    }
}
