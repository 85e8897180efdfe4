//! Deterministic JSON canonicalization and SHA-256 payload checksums.

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

use gitgov_error::GitGovError;

/// Canonicalize a JSON value to its deep-key-sorted, whitespace-free string
/// form.
///
/// `serde_json::Value`'s object variant is a `BTreeMap` under the feature
/// set this workspace builds with (no `preserve_order`), so object keys at
/// every nesting level are already sorted once the value has round-tripped
/// through [`serde_json::to_value`]. Array order and scalar values are left
/// untouched. [`serde_json::to_string`] never inserts whitespace, so the
/// result is exactly the canonical byte sequence.
#[must_use]
pub fn canonicalize(value: &Value) -> String {
    serde_json::to_string(value).expect("Value -> String serialization is infallible")
}

/// Serialize `value` to a canonical [`Value`], then to its canonical string
/// form.
///
/// # Errors
///
/// Returns [`GitGovError::IoError`] if `value` cannot be represented as
/// JSON (e.g. a map with non-string keys, or a `NaN`/`Infinity` float).
pub fn to_canonical_string<T: Serialize>(value: &T) -> Result<String, GitGovError> {
    let v = serde_json::to_value(value).map_err(|e| GitGovError::io("canonicalize payload", e))?;
    Ok(canonicalize(&v))
}

/// Compute the raw 32-byte SHA-256 digest of `bytes`.
#[must_use]
pub fn sha256_raw(bytes: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hasher.finalize().into()
}

/// Compute the hex-encoded SHA-256 digest of `bytes`.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// `payloadChecksum = hex(SHA-256(canonical(payload)))`.
///
/// # Errors
///
/// Returns [`GitGovError::IoError`] if `payload` cannot be serialized to
/// JSON.
pub fn payload_checksum<T: Serialize>(payload: &T) -> Result<String, GitGovError> {
    let canonical = to_canonical_string(payload)?;
    Ok(sha256_hex(canonical.as_bytes()))
}
