// SPDX-License-Identifier: MIT OR Apache-2.0
#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]
#![warn(missing_docs)]

//! Identity adapter: actors, agents, key rotation, bootstrap actor.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use gitgov_core::{ActorKind, ActorPayload, ActorStatus, Payload, Record};
use gitgov_crypto::keys::KeyStore;
use gitgov_error::GitGovError;
use gitgov_factory::CreateContext;
use gitgov_store::RecordStore;

/// Ephemeral, worktree-local session state: the last-used actor id. Never
/// versioned (stored outside the state tree's git-tracked files).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// The actor id last used to author a record.
    #[serde(rename = "actorId")]
    pub actor_id: String,
    /// When this session entry was written.
    pub timestamp: DateTime<Utc>,
}

/// Identity adapter: creates actors, rotates keys, and resolves "the
/// current actor" for a worktree.
pub struct IdentityAdapter<'a> {
    store: &'a mut dyn RecordStore<Record>,
    keys: &'a mut dyn KeyStore,
}

impl<'a> IdentityAdapter<'a> {
    /// Construct an adapter over an actor record store and a key store.
    pub fn new(store: &'a mut dyn RecordStore<Record>, keys: &'a mut dyn KeyStore) -> Self {
        Self { store, keys }
    }

    /// Create a new actor: generates an Ed25519 keypair, stores the
    /// private key under `actor_id`, and creates a self-signed actor
    /// record (the actor signs its own creation).
    ///
    /// # Errors
    ///
    /// Returns [`GitGovError::SchemaError`] if `actor_id` or `display_name`
    /// are invalid, or [`GitGovError::IoError`] if the key or record
    /// cannot be persisted.
    pub fn create_actor(
        &mut self,
        actor_id: &str,
        kind: ActorKind,
        display_name: &str,
        roles: Vec<String>,
        now: DateTime<Utc>,
    ) -> Result<Record, GitGovError> {
        gitgov_factory::invariants::validate_id_pattern(gitgov_core::RecordType::Actor, actor_id)?;
        let signing_key = gitgov_crypto::keys::signing_key_from_seed_string(&format!("{actor_id}:{}", now.timestamp_nanos_opt().unwrap_or_default()));
        let public_key = gitgov_crypto::keys::encode_public_key(&signing_key.verifying_key());

        let payload = Payload::Actor(ActorPayload {
            kind,
            display_name: display_name.to_string(),
            public_key,
            roles,
            status: ActorStatus::Active,
            superseded_by: None,
        });

        let created = gitgov_factory::create(
            payload,
            Some(actor_id),
            display_name,
            &signing_key,
            &CreateContext {
                actor_id,
                role: "author",
                notes: "self-signed actor creation",
                now,
            },
        )?;

        self.keys.put(actor_id, &signing_key)?;
        self.store.put(actor_id, &created.record)?;
        Ok(created.record)
    }

    /// Create an actor from an already-derived signing key (used by
    /// `gitgov-init`'s bootstrap actor and deterministic test fixtures,
    /// which need a reproducible keypair rather than a freshly generated
    /// one).
    ///
    /// # Errors
    ///
    /// Same as [`IdentityAdapter::create_actor`].
    pub fn create_actor_with_key(
        &mut self,
        actor_id: &str,
        kind: ActorKind,
        display_name: &str,
        roles: Vec<String>,
        signing_key: ed25519_dalek::SigningKey,
        now: DateTime<Utc>,
    ) -> Result<Record, GitGovError> {
        gitgov_factory::invariants::validate_id_pattern(gitgov_core::RecordType::Actor, actor_id)?;
        let public_key = gitgov_crypto::keys::encode_public_key(&signing_key.verifying_key());
        let payload = Payload::Actor(ActorPayload {
            kind,
            display_name: display_name.to_string(),
            public_key,
            roles,
            status: ActorStatus::Active,
            superseded_by: None,
        });
        let created = gitgov_factory::create(
            payload,
            Some(actor_id),
            display_name,
            &signing_key,
            &CreateContext {
                actor_id,
                role: "author",
                notes: "self-signed actor creation",
                now,
            },
        )?;
        self.keys.put(actor_id, &signing_key)?;
        self.store.put(actor_id, &created.record)?;
        Ok(created.record)
    }

    /// Rotate `actor_id`'s key: creates a successor actor `<actor_id>-r<n>`
    /// with a fresh keypair, marks `actor_id` `status=revoked` with
    /// `supersededBy` pointing at the successor, and leaves both records in
    /// history.
    ///
    /// # Errors
    ///
    /// Returns [`GitGovError::NoActorError`] if `actor_id` has no record,
    /// or the usual create/mutate errors.
    pub fn rotate_key(&mut self, actor_id: &str, now: DateTime<Utc>) -> Result<(Record, Record), GitGovError> {
        let current = self.store.get(actor_id)?.ok_or(GitGovError::NoActorError)?;
        let Payload::Actor(current_payload) = &current.payload else {
            return Err(GitGovError::SchemaError {
                path: "header.type".to_string(),
                message: "rotate_key requires an actor record".to_string(),
            });
        };

        let successor_id = format!("{actor_id}-r{}", now.timestamp());
        let signing_key = gitgov_crypto::keys::signing_key_from_seed_string(&format!("{successor_id}:{}", now.timestamp_nanos_opt().unwrap_or_default()));
        let successor = self.create_actor_with_key(
            &successor_id,
            current_payload.kind,
            &current_payload.display_name,
            current_payload.roles.clone(),
            signing_key,
            now,
        )?;

        let signing_key_for_revocation = self.keys.get(actor_id)?.ok_or(GitGovError::NoActorError)?;
        let mut revoked_payload = current_payload.clone();
        revoked_payload.status = ActorStatus::Revoked;
        revoked_payload.superseded_by = Some(successor_id.clone());

        let revoked = gitgov_factory::mutate(
            &current,
            Payload::Actor(revoked_payload),
            &signing_key_for_revocation,
            &CreateContext {
                actor_id,
                role: "author",
                notes: "key rotation: superseded",
                now,
            },
        )?;
        self.store.put(actor_id, &revoked)?;

        Ok((revoked, successor))
    }

    /// Resolve "the current actor" for a worktree: session file first (if
    /// `session` is `Some`), else the single present key in `self.keys`,
    /// else [`GitGovError::AmbiguousActorError`] (more than one key) or
    /// [`GitGovError::NoActorError`] (no key at all).
    ///
    /// # Errors
    ///
    /// See above.
    pub fn resolve_current_actor(&self, session: Option<&Session>) -> Result<String, GitGovError> {
        if let Some(session) = session {
            return Ok(session.actor_id.clone());
        }
        let mut candidates = self.keys.list()?;
        candidates.sort();
        match candidates.len() {
            0 => Err(GitGovError::NoActorError),
            1 => Ok(candidates.into_iter().next().expect("checked len == 1")),
            _ => Err(GitGovError::AmbiguousActorError { candidates }),
        }
    }

    /// Whether `actor_id` may currently author new records (active, not
    /// revoked).
    ///
    /// # Errors
    ///
    /// Returns [`GitGovError::NoActorError`] if the actor has no record.
    pub fn can_author(&self, actor_id: &str) -> Result<bool, GitGovError> {
        let record = self.store.get(actor_id)?.ok_or(GitGovError::NoActorError)?;
        match record.payload {
            Payload::Actor(a) => Ok(a.status == ActorStatus::Active),
            _ => Err(GitGovError::SchemaError {
                path: "header.type".to_string(),
                message: "expected an actor record".to_string(),
            }),
        }
    }

    /// Policy `verify_if_was_active_at_timestamp`: a
    /// revoked actor's signatures are still valid for verification as long
    /// as the signature's timestamp is not after the actor's revocation
    /// timestamp. `revoked_at` is the timestamp of the signature that
    /// performed the revocation (the mutation's own signature).
    #[must_use]
    pub fn was_active_at(actor_status: ActorStatus, revoked_at: Option<i64>, signature_timestamp: i64) -> bool {
        match actor_status {
            ActorStatus::Active => true,
            ActorStatus::Revoked => revoked_at.is_none_or(|revoked_at| signature_timestamp <= revoked_at),
        }
    }
}
