// SPDX-License-Identifier: MIT OR Apache-2.0
#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]
#![warn(missing_docs)]

/// Default id generation (`<unix-seconds>-<type>-<slug>`).
pub mod ids;
/// Business invariants a compiled JSON-Schema cannot express.
pub mod invariants;

use chrono::{DateTime, Utc};

use gitgov_core::payload::RecordType;
use gitgov_core::{Header, Payload, Record, Signature};
use gitgov_crypto::sign::sign_digest;
use gitgov_error::GitGovError;
use gitgov_schema::SchemaCache;

/// Everything [`create`] needs to title-basis an id and pick a default
/// status/id for a given payload shape, supplied by the caller rather than
/// inferred, since the factory has no access to a clock or an id scheme
/// beyond what `gitgov-factory::ids` already implements.
pub struct CreateContext<'a> {
    /// The signing actor's id (becomes `header.signatures[0].keyId`).
    pub actor_id: &'a str,
    /// The capacity in which `actor_id` signs, e.g. `"author"`.
    pub role: &'a str,
    /// Free-form annotation recorded on the initial signature.
    pub notes: &'a str,
    /// The wall-clock time to stamp the signature and (for generated ids)
    /// the id itself with.
    pub now: DateTime<Utc>,
}

/// Step 1+2 of `create`: assign an id (for types that don't supply their
/// own, i.e. everything except `actor`/`agent`) and apply business
/// defaults the caller didn't set.
fn default_id(record_type: RecordType, explicit_id: Option<&str>, title_basis: &str, now: DateTime<Utc>) -> Result<String, GitGovError> {
    match explicit_id {
        Some(id) => Ok(id.to_string()),
        None => {
            if matches!(record_type, RecordType::Actor | RecordType::Agent) {
                return Err(GitGovError::SchemaError {
                    path: "id".to_string(),
                    message: "actor/agent ids must be supplied explicitly; gitgov-identity assigns them".to_string(),
                });
            }
            Ok(ids::generate_id(record_type, title_basis, now))
        }
    }
}

/// A freshly created record together with the id it was assigned (which
/// equals `explicit_id` when the caller supplied one).
#[derive(Debug, Clone)]
pub struct Created {
    /// The record's id.
    pub id: String,
    /// The signed record.
    pub record: Record,
}

/// Run the seven-step creation pipeline:
///
/// 1. Fill defaults — assign an id if `explicit_id` is absent.
/// 2. Apply business defaults — delegated to the caller via `payload`
///    already carrying its business-default fields (e.g. a freshly built
///    `TaskPayload` with `status: TaskStatus::Draft`).
/// 3. Validate payload against the compiled schema.
/// 4. Run business invariants.
/// 5. Compute the payload checksum.
/// 6. Sign once with the creator's key.
/// 7. Validate the full envelope (header + payload) by re-running schema
///    validation against the header, then constructing the typed
///    [`Record`] (which itself checks header/payload type agreement).
///
/// # Errors
///
/// Returns [`GitGovError::SchemaError`] if the payload fails schema or
/// invariant validation, or any crypto error from signing.
pub fn create(
    payload: Payload,
    explicit_id: Option<&str>,
    title_basis: &str,
    signing_key: &ed25519_dalek::SigningKey,
    ctx: &CreateContext<'_>,
) -> Result<Created, GitGovError> {
    let record_type = payload.record_type();
    let id = default_id(record_type, explicit_id, title_basis, ctx.now)?;
    invariants::validate_id_pattern(record_type, &id)?;

    let payload_value = serde_json::to_value(&payload).map_err(|e| GitGovError::io("serialize payload", e))?;
    SchemaCache::global().validate(record_type, &payload_value)?;
    invariants::validate_payload_invariants(&payload, true)?;

    invariants::validate_key_id(ctx.actor_id)?;
    invariants::validate_role(ctx.role)?;
    invariants::validate_notes(ctx.notes)?;

    let checksum = gitgov_crypto::canon::payload_checksum(&payload)?;
    let timestamp = ctx.now.timestamp();
    let sig = sign_digest(signing_key, &checksum, ctx.actor_id, ctx.role, ctx.notes, timestamp);

    let signature = Signature {
        key_id: ctx.actor_id.to_string(),
        role: ctx.role.to_string(),
        notes: ctx.notes.to_string(),
        signature: sig,
        timestamp,
        metadata: None,
    };
    let header = Header::new(record_type, checksum, signature);
    let record = Record::new(header, payload)?;
    Ok(Created { id, record })
}

/// Mutate an existing record's payload: recompute
/// the checksum and append a new signature. Prior signatures are never
/// removed — the signature history accretes.
///
/// # Errors
///
/// Returns [`GitGovError::SchemaError`] if `new_payload`'s record type
/// differs from `record`'s, or fails schema/invariant validation.
pub fn mutate(
    record: &Record,
    new_payload: Payload,
    signing_key: &ed25519_dalek::SigningKey,
    ctx: &CreateContext<'_>,
) -> Result<Record, GitGovError> {
    let record_type = record.header.record_type;
    if new_payload.record_type() != record_type {
        return Err(GitGovError::SchemaError {
            path: "header.type".to_string(),
            message: "mutate cannot change a record's type".to_string(),
        });
    }

    let payload_value = serde_json::to_value(&new_payload).map_err(|e| GitGovError::io("serialize payload", e))?;
    SchemaCache::global().validate(record_type, &payload_value)?;
    invariants::validate_payload_invariants(&new_payload, false)?;

    invariants::validate_key_id(ctx.actor_id)?;
    invariants::validate_role(ctx.role)?;
    invariants::validate_notes(ctx.notes)?;

    let checksum = gitgov_crypto::canon::payload_checksum(&new_payload)?;
    let timestamp = ctx.now.timestamp();
    let sig = sign_digest(signing_key, &checksum, ctx.actor_id, ctx.role, ctx.notes, timestamp);

    let mut signatures = record.header.signatures.clone();
    signatures.push(Signature {
        key_id: ctx.actor_id.to_string(),
        role: ctx.role.to_string(),
        notes: ctx.notes.to_string(),
        signature: sig,
        timestamp,
        metadata: None,
    });

    let header = Header {
        version: record.header.version.clone(),
        record_type,
        payload_checksum: checksum,
        signatures,
    };
    Record::new(header, new_payload)
}

/// Verify every signature in `record.header.signatures` against the
/// public key each `keyId` resolves to, re-checking the payload checksum
/// first.
///
/// `resolve_public_key` looks up the verifying key for a `keyId`; callers
/// typically back this with `gitgov-identity`'s actor store.
///
/// # Errors
///
/// Returns [`GitGovError::ChecksumError`] if the declared checksum does
/// not match the recomputed one, or [`GitGovError::SignatureError`] if any
/// signature fails to verify or its key cannot be resolved.
pub fn verify_record(
    record: &Record,
    mut resolve_public_key: impl FnMut(&str) -> Option<ed25519_dalek::VerifyingKey>,
) -> Result<(), GitGovError> {
    let recomputed = gitgov_crypto::canon::payload_checksum(&record.payload)?;
    if recomputed != record.header.payload_checksum {
        return Err(GitGovError::ChecksumError {
            expected: record.header.payload_checksum.clone(),
            actual: recomputed,
        });
    }
    for sig in &record.header.signatures {
        let key = resolve_public_key(&sig.key_id).ok_or_else(|| GitGovError::SignatureError {
            key_id: sig.key_id.clone(),
            reason: "unknown key id".to_string(),
        })?;
        gitgov_crypto::sign::verify_digest(
            &key,
            &record.header.payload_checksum,
            &sig.key_id,
            &sig.role,
            &sig.notes,
            sig.timestamp,
            &sig.signature,
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gitgov_core::{TaskPayload, TaskPriority, TaskStatus};
    use gitgov_crypto::keys::signing_key_from_seed_string;

    fn ctx(now_secs: i64) -> CreateContext<'static> {
        CreateContext {
            actor_id: "human:alice",
            role: "author",
            notes: "initial draft",
            now: DateTime::from_timestamp(now_secs, 0).unwrap(),
        }
    }

    fn sample_task() -> Payload {
        Payload::Task(TaskPayload {
            title: "Write the launch doc".into(),
            status: TaskStatus::Draft,
            priority: TaskPriority::Medium,
            description: "Draft the launch announcement".into(),
            cycle_ids: None,
            references: None,
            tags: None,
        })
    }

    #[test]
    fn create_assigns_generated_id_and_valid_signature() {
        let key = signing_key_from_seed_string("human:alice");
        let created = create(sample_task(), None, "Write the launch doc", &key, &ctx(1_700_000_000)).unwrap();
        assert_eq!(created.id, "1700000000-task-write-the-launch-doc");
        assert_eq!(created.record.header.signatures.len(), 1);
        verify_record(&created.record, |_| Some(key.verifying_key())).unwrap();
    }

    #[test]
    fn create_rejects_non_draft_task_status() {
        let key = signing_key_from_seed_string("human:alice");
        let mut payload = sample_task();
        if let Payload::Task(t) = &mut payload {
            t.status = TaskStatus::Active;
        }
        let err = create(payload, None, "x", &key, &ctx(1_700_000_000)).unwrap_err();
        assert_eq!(err.code(), gitgov_error::ErrorCode::SchemaError);
    }

    #[test]
    fn create_rejects_explicit_id_for_actor_type() {
        use gitgov_core::{ActorKind, ActorPayload, ActorStatus};
        let key = signing_key_from_seed_string("human:alice");
        let payload = Payload::Actor(ActorPayload {
            kind: ActorKind::Human,
            display_name: "Alice".into(),
            public_key: gitgov_crypto::keys::encode_public_key(&key.verifying_key()),
            roles: vec!["author".into()],
            status: ActorStatus::Active,
            superseded_by: None,
        });
        // Actor ids must be supplied explicitly; omitting one is an error.
        let err = create(payload, None, "Alice", &key, &ctx(1_700_000_000)).unwrap_err();
        assert_eq!(err.code(), gitgov_error::ErrorCode::SchemaError);
    }

    #[test]
    fn mutate_appends_signature_without_removing_prior() {
        let key = signing_key_from_seed_string("human:alice");
        let created = create(sample_task(), None, "Write the launch doc", &key, &ctx(1_700_000_000)).unwrap();

        let mut new_payload = sample_task();
        if let Payload::Task(t) = &mut new_payload {
            t.status = TaskStatus::Review;
        }
        let reviewer_key = signing_key_from_seed_string("human:bob");
        let mutated = mutate(
            &created.record,
            new_payload,
            &reviewer_key,
            &CreateContext {
                actor_id: "human:bob",
                role: "reviewer",
                notes: "looks good",
                now: DateTime::from_timestamp(1_700_000_100, 0).unwrap(),
            },
        )
        .unwrap();

        assert_eq!(mutated.header.signatures.len(), 2);
        assert_eq!(mutated.header.signatures[0].key_id, "human:alice");
        assert_eq!(mutated.header.signatures[1].key_id, "human:bob");
        assert_ne!(mutated.header.payload_checksum, created.record.header.payload_checksum);
    }

    #[test]
    fn mutate_rejects_type_change() {
        let key = signing_key_from_seed_string("human:alice");
        let created = create(sample_task(), None, "Write the launch doc", &key, &ctx(1_700_000_000)).unwrap();

        use gitgov_core::{CyclePayload, CycleStatus};
        let wrong_type = Payload::Cycle(CyclePayload {
            title: "Sprint 1".into(),
            status: CycleStatus::Planning,
            task_ids: None,
            child_cycle_ids: None,
            tags: None,
        });
        let err = mutate(&created.record, wrong_type, &key, &ctx(1_700_000_100)).unwrap_err();
        assert_eq!(err.code(), gitgov_error::ErrorCode::SchemaError);
    }

    #[test]
    fn verify_record_detects_checksum_drift() {
        let key = signing_key_from_seed_string("human:alice");
        let mut created = create(sample_task(), None, "Write the launch doc", &key, &ctx(1_700_000_000)).unwrap();
        created.record.header.payload_checksum = "0".repeat(64);
        let err = verify_record(&created.record, |_| Some(key.verifying_key())).unwrap_err();
        assert_eq!(err.code(), gitgov_error::ErrorCode::ChecksumError);
    }

    #[test]
    fn verify_record_fails_on_unknown_key() {
        let key = signing_key_from_seed_string("human:alice");
        let created = create(sample_task(), None, "Write the launch doc", &key, &ctx(1_700_000_000)).unwrap();
        let err = verify_record(&created.record, |_| None).unwrap_err();
        assert_eq!(err.code(), gitgov_error::ErrorCode::SignatureError);
    }
}
