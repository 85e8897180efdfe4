//! Ed25519 key material storage.
//!
//! The key store is a keyed map from `actorId` to private key bytes, backed
//! by an injectable backend: a filesystem directory by default, or an
//! in-memory map for tests.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use base64::Engine as _;
use ed25519_dalek::{SigningKey, SECRET_KEY_LENGTH};
use sha2::{Digest, Sha256};

use gitgov_error::GitGovError;

/// Derive a 32-byte Ed25519 seed deterministically from an arbitrary-length
/// string: `seed_bytes = SHA-256(seed_string)`.
///
/// This is how the project's deterministic test fixtures and scripted demo
/// actors get reproducible keypairs without checking raw seed bytes into
/// the repository.
#[must_use]
pub fn seed_from_string(seed_string: &str) -> [u8; SECRET_KEY_LENGTH] {
    let mut hasher = Sha256::new();
    hasher.update(seed_string.as_bytes());
    let digest = hasher.finalize();
    let mut seed = [0u8; SECRET_KEY_LENGTH];
    seed.copy_from_slice(&digest);
    seed
}

/// Build a [`SigningKey`] from a deterministic seed string.
#[must_use]
pub fn signing_key_from_seed_string(seed_string: &str) -> SigningKey {
    SigningKey::from_bytes(&seed_from_string(seed_string))
}

/// Base64-encode a 32-byte Ed25519 public key (44 chars, standard alphabet
/// with padding).
#[must_use]
pub fn encode_public_key(key: &ed25519_dalek::VerifyingKey) -> String {
    base64::engine::general_purpose::STANDARD.encode(key.as_bytes())
}

/// Decode a base64-encoded 32-byte Ed25519 public key.
///
/// # Errors
///
/// Returns [`GitGovError::SignatureError`] if the string is not valid
/// base64, or does not decode to exactly 32 bytes, or is not a valid
/// Ed25519 point.
pub fn decode_public_key(encoded: &str, key_id: &str) -> Result<ed25519_dalek::VerifyingKey, GitGovError> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .map_err(|e| GitGovError::SignatureError {
            key_id: key_id.to_string(),
            reason: format!("invalid base64 public key: {e}"),
        })?;
    let array: [u8; 32] = bytes.as_slice().try_into().map_err(|_| GitGovError::SignatureError {
        key_id: key_id.to_string(),
        reason: format!("public key is {} bytes, expected 32", bytes.len()),
    })?;
    ed25519_dalek::VerifyingKey::from_bytes(&array).map_err(|e| GitGovError::SignatureError {
        key_id: key_id.to_string(),
        reason: format!("not a valid Ed25519 point: {e}"),
    })
}

/// Storage and retrieval of private signing keys, keyed by actor id.
pub trait KeyStore: Send + Sync {
    /// Store `key` under `actor_id`, overwriting any existing entry.
    ///
    /// # Errors
    ///
    /// Returns [`GitGovError::IoError`] if the backend cannot persist the
    /// key.
    fn put(&mut self, actor_id: &str, key: &SigningKey) -> Result<(), GitGovError>;

    /// Retrieve the signing key for `actor_id`, if present.
    ///
    /// # Errors
    ///
    /// Returns [`GitGovError::IoError`] if the backend exists but could not
    /// be read (corrupt file, permission error). A missing entry is `Ok(None)`,
    /// not an error.
    fn get(&self, actor_id: &str) -> Result<Option<SigningKey>, GitGovError>;

    /// Remove the key for `actor_id`, if present. A no-op if absent.
    ///
    /// # Errors
    ///
    /// Returns [`GitGovError::IoError`] if the backend cannot remove the
    /// entry.
    fn remove(&mut self, actor_id: &str) -> Result<(), GitGovError>;

    /// List the actor ids with a stored key.
    ///
    /// # Errors
    ///
    /// Returns [`GitGovError::IoError`] if the backend cannot be listed.
    fn list(&self) -> Result<Vec<String>, GitGovError>;
}

/// In-memory [`KeyStore`], used by tests and by the in-process `MemoryRecordStore`
/// test doubles elsewhere in the workspace.
#[derive(Debug, Default)]
pub struct MemoryKeyStore {
    keys: BTreeMap<String, [u8; SECRET_KEY_LENGTH]>,
}

impl MemoryKeyStore {
    /// Construct an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyStore for MemoryKeyStore {
    fn put(&mut self, actor_id: &str, key: &SigningKey) -> Result<(), GitGovError> {
        self.keys.insert(actor_id.to_string(), key.to_bytes());
        Ok(())
    }

    fn get(&self, actor_id: &str) -> Result<Option<SigningKey>, GitGovError> {
        Ok(self.keys.get(actor_id).map(|bytes| SigningKey::from_bytes(bytes)))
    }

    fn remove(&mut self, actor_id: &str) -> Result<(), GitGovError> {
        self.keys.remove(actor_id);
        Ok(())
    }

    fn list(&self) -> Result<Vec<String>, GitGovError> {
        Ok(self.keys.keys().cloned().collect())
    }
}

/// Filesystem-backed [`KeyStore`]. Each actor's key is stored as a single
/// file named `<actorId-with-colons-replaced-by-double-underscore>.key`
/// holding the raw 32 seed bytes, under `root`.
#[derive(Debug, Clone)]
pub struct FsKeyStore {
    root: PathBuf,
}

impl FsKeyStore {
    /// Open (without creating) a filesystem key store rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, actor_id: &str) -> PathBuf {
        let file_name = format!("{}.key", actor_id.replace(':', "__"));
        self.root.join(file_name)
    }

    fn actor_id_from_path(path: &Path) -> Option<String> {
        let stem = path.file_stem()?.to_str()?;
        Some(stem.replace("__", ":"))
    }

    fn ensure_root(&self) -> Result<(), GitGovError> {
        fs::create_dir_all(&self.root).map_err(|e| GitGovError::io("create key store directory", e))
    }
}

impl KeyStore for FsKeyStore {
    fn put(&mut self, actor_id: &str, key: &SigningKey) -> Result<(), GitGovError> {
        self.ensure_root()?;
        let path = self.path_for(actor_id);
        fs::write(&path, key.to_bytes()).map_err(|e| GitGovError::io("write private key", e))
    }

    fn get(&self, actor_id: &str) -> Result<Option<SigningKey>, GitGovError> {
        let path = self.path_for(actor_id);
        if !path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(&path).map_err(|e| GitGovError::io("read private key", e))?;
        let array: [u8; SECRET_KEY_LENGTH] =
            bytes
                .as_slice()
                .try_into()
                .map_err(|_| GitGovError::SignatureError {
                    key_id: actor_id.to_string(),
                    reason: format!("key file is {} bytes, expected {SECRET_KEY_LENGTH}", bytes.len()),
                })?;
        Ok(Some(SigningKey::from_bytes(&array)))
    }

    fn remove(&mut self, actor_id: &str) -> Result<(), GitGovError> {
        let path = self.path_for(actor_id);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(GitGovError::io("remove private key", e)),
        }
    }

    fn list(&self) -> Result<Vec<String>, GitGovError> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.root).map_err(|e| GitGovError::io("list key store directory", e))? {
            let entry = entry.map_err(|e| GitGovError::io("read key store directory entry", e))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("key") {
                continue;
            }
            if let Some(id) = Self::actor_id_from_path(&path) {
                ids.push(id);
            }
        }
        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_derivation_is_deterministic() {
        let a = seed_from_string("gitgovernance-protocol-example-actor-01");
        let b = seed_from_string("gitgovernance-protocol-example-actor-01");
        assert_eq!(a, b);
    }

    #[test]
    fn distinct_seeds_produce_distinct_keys() {
        let a = signing_key_from_seed_string("gitgovernance-protocol-example-actor-01");
        let b = signing_key_from_seed_string("gitgovernance-protocol-example-agent-01");
        assert_ne!(a.verifying_key().as_bytes(), b.verifying_key().as_bytes());
    }

    #[test]
    fn public_key_round_trips_through_base64() {
        let key = signing_key_from_seed_string("gitgovernance-protocol-example-deploy-01");
        let encoded = encode_public_key(&key.verifying_key());
        assert_eq!(encoded.len(), 44);
        let decoded = decode_public_key(&encoded, "deploy:example").unwrap();
        assert_eq!(decoded.as_bytes(), key.verifying_key().as_bytes());
    }

    #[test]
    fn memory_store_round_trip() {
        let mut store = MemoryKeyStore::new();
        let key = signing_key_from_seed_string("human:alice");
        store.put("human:alice", &key).unwrap();
        let loaded = store.get("human:alice").unwrap().unwrap();
        assert_eq!(loaded.to_bytes(), key.to_bytes());
        assert_eq!(store.list().unwrap(), vec!["human:alice".to_string()]);
        store.remove("human:alice").unwrap();
        assert!(store.get("human:alice").unwrap().is_none());
    }

    #[test]
    fn fs_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FsKeyStore::new(dir.path());
        let key = signing_key_from_seed_string("agent:ci-bot");
        store.put("agent:ci-bot", &key).unwrap();

        let reopened = FsKeyStore::new(dir.path());
        let loaded = reopened.get("agent:ci-bot").unwrap().unwrap();
        assert_eq!(loaded.to_bytes(), key.to_bytes());
        assert_eq!(reopened.list().unwrap(), vec!["agent:ci-bot".to_string()]);
    }

    #[test]
    fn fs_store_missing_actor_is_none_not_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsKeyStore::new(dir.path());
        assert!(store.get("human:nobody").unwrap().is_none());
    }
}
