//! The keyed-digest Ed25519 signature scheme.
//!
//! A signature does not sign the payload checksum directly; it signs a
//! digest that binds the checksum to the signer's intent (`keyId`, `role`,
//! `notes`, `timestamp`), so that replaying a valid signature under a
//! different role or attaching someone else's signature to a different
//! record both fail verification.

use base64::Engine as _;
use ed25519_dalek::{Signature, Signer as _, SigningKey, Verifier as _, VerifyingKey};

use gitgov_error::GitGovError;

use crate::canon::sha256_raw;

/// Build the `digest_input` string from its five components.
///
/// ```text
/// digest_input = payloadChecksum || ":" || keyId || ":" || role || ":" || notes || ":" || timestamp
/// ```
#[must_use]
pub fn digest_input(payload_checksum: &str, key_id: &str, role: &str, notes: &str, timestamp: i64) -> String {
    format!("{payload_checksum}:{key_id}:{role}:{notes}:{timestamp}")
}

/// Sign a record header's digest with `signing_key`, returning the
/// base64-encoded 64-byte Ed25519 signature (88 chars, `"=="`-padded).
#[must_use]
pub fn sign_digest(
    signing_key: &SigningKey,
    payload_checksum: &str,
    key_id: &str,
    role: &str,
    notes: &str,
    timestamp: i64,
) -> String {
    let input = digest_input(payload_checksum, key_id, role, notes, timestamp);
    let signed_bytes = sha256_raw(input.as_bytes());
    let signature: Signature = signing_key.sign(&signed_bytes);
    base64::engine::general_purpose::STANDARD.encode(signature.to_bytes())
}

/// Verify a signature produced by [`sign_digest`].
///
/// Recomputes `digest_input` from the supplied fields and the *current*
/// `payload_checksum` (the caller is responsible for having already
/// confirmed `payload_checksum == sha256(canonical(payload))`) and checks
/// it against `signature_b64` under `verifying_key`.
///
/// # Errors
///
/// Returns [`GitGovError::SignatureError`] if the signature is not valid
/// base64, is not 64 bytes, or does not verify.
pub fn verify_digest(
    verifying_key: &VerifyingKey,
    payload_checksum: &str,
    key_id: &str,
    role: &str,
    notes: &str,
    timestamp: i64,
    signature_b64: &str,
) -> Result<(), GitGovError> {
    let raw = base64::engine::general_purpose::STANDARD
        .decode(signature_b64)
        .map_err(|e| GitGovError::SignatureError {
            key_id: key_id.to_string(),
            reason: format!("invalid base64 signature: {e}"),
        })?;
    let array: [u8; 64] = raw.as_slice().try_into().map_err(|_| GitGovError::SignatureError {
        key_id: key_id.to_string(),
        reason: format!("signature is {} bytes, expected 64", raw.len()),
    })?;
    let signature = Signature::from_bytes(&array);

    let input = digest_input(payload_checksum, key_id, role, notes, timestamp);
    let signed_bytes = sha256_raw(input.as_bytes());

    verifying_key
        .verify(&signed_bytes, &signature)
        .map_err(|e| GitGovError::SignatureError {
            key_id: key_id.to_string(),
            reason: format!("signature verification failed: {e}"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::signing_key_from_seed_string;

    #[test]
    fn sign_then_verify_round_trip() {
        let key = signing_key_from_seed_string("human:alice");
        let sig = sign_digest(&key, "abc123", "human:alice", "author", "initial draft", 1_700_000_000);
        verify_digest(
            &key.verifying_key(),
            "abc123",
            "human:alice",
            "author",
            "initial draft",
            1_700_000_000,
            &sig,
        )
        .unwrap();
    }

    #[test]
    fn signature_is_88_chars_with_padding() {
        let key = signing_key_from_seed_string("human:bob");
        let sig = sign_digest(&key, "deadbeef", "human:bob", "reviewer", "", 1_700_000_000);
        assert_eq!(sig.len(), 88);
        assert!(sig.ends_with("=="));
    }

    #[test]
    fn tampered_checksum_fails_verification() {
        let key = signing_key_from_seed_string("human:carol");
        let sig = sign_digest(&key, "abc123", "human:carol", "author", "notes", 1_700_000_000);
        let result = verify_digest(
            &key.verifying_key(),
            "different-checksum",
            "human:carol",
            "author",
            "notes",
            1_700_000_000,
            &sig,
        );
        assert!(result.is_err());
    }

    #[test]
    fn tampered_role_fails_verification() {
        let key = signing_key_from_seed_string("human:dave");
        let sig = sign_digest(&key, "abc123", "human:dave", "author", "notes", 1_700_000_000);
        let result = verify_digest(
            &key.verifying_key(),
            "abc123",
            "human:dave",
            "approver",
            "notes",
            1_700_000_000,
            &sig,
        );
        assert!(result.is_err());
    }

    #[test]
    fn wrong_key_fails_verification() {
        let signer = signing_key_from_seed_string("human:erin");
        let impostor = signing_key_from_seed_string("human:frank");
        let sig = sign_digest(&signer, "abc123", "human:erin", "author", "notes", 1_700_000_000);
        let result = verify_digest(
            &impostor.verifying_key(),
            "abc123",
            "human:erin",
            "author",
            "notes",
            1_700_000_000,
            &sig,
        );
        assert!(result.is_err());
    }

    #[test]
    fn deterministic_seed_vectors_are_stable_and_distinct() {
        // These three seeds are the project's published fixture seeds, and
        // the public keys below are the exact values published alongside
        // them. The derivation rule (SHA-256 of the seed string as the
        // Ed25519 seed) is fixed; a change to it must fail this test.
        let actor = signing_key_from_seed_string("gitgovernance-protocol-example-actor-01");
        let agent = signing_key_from_seed_string("gitgovernance-protocol-example-agent-01");
        let deploy = signing_key_from_seed_string("gitgovernance-protocol-example-deploy-01");

        assert_eq!(
            crate::keys::encode_public_key(&actor.verifying_key()),
            "0yyrCETtVql51Id+nRKGmpbfsxNxOz+eCYLpWDoutV0="
        );
        assert_eq!(
            crate::keys::encode_public_key(&agent.verifying_key()),
            "IadceheUiu6BZ0pvCGUaDcRn4L5UWFyW8ubzcFXl3s4="
        );
        assert_eq!(
            crate::keys::encode_public_key(&deploy.verifying_key()),
            "DDiqTgZimOoChfHVt0neFEFDmi9BvBM23pfwOnh2RNE="
        );

        assert_eq!(
            actor.verifying_key().as_bytes(),
            signing_key_from_seed_string("gitgovernance-protocol-example-actor-01")
                .verifying_key()
                .as_bytes()
        );
        assert_ne!(actor.verifying_key().as_bytes(), agent.verifying_key().as_bytes());
        assert_ne!(agent.verifying_key().as_bytes(), deploy.verifying_key().as_bytes());

        let checksum = crate::canon::payload_checksum(&serde_json::json!({
            "type": "actor",
            "publicKey": crate::keys::encode_public_key(&actor.verifying_key()),
        }))
        .unwrap();
        assert_eq!(checksum.len(), 64);
    }
}
