//! The record envelope: a signed `header` wrapping a typed `payload`.

use schemars::JsonSchema;
use serde::de::{Deserializer, Error as DeError};
use serde::{Deserialize, Serialize};

use gitgov_error::GitGovError;

use crate::payload::{Payload, RecordType};

/// The fixed protocol version tag carried by every header.
pub const PROTOCOL_VERSION: &str = "1.0";

/// A single signature over a record's `payloadChecksum`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct Signature {
    /// The signing actor's id, matching [`crate::payload::KEY_ID_PATTERN`].
    #[serde(rename = "keyId")]
    pub key_id: String,
    /// The capacity in which the signer signed, matching
    /// [`crate::payload::ROLE_PATTERN`], 1..50 chars.
    pub role: String,
    /// Free-form annotation, 1..1000 chars, included in the signed digest.
    pub notes: String,
    /// Base64-encoded 64-byte Ed25519 signature (88 chars, `"=="`-padded).
    pub signature: String,
    /// Unix seconds at which the signature was produced.
    pub timestamp: i64,
    /// Optional free-form metadata, not covered by the signed digest.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub metadata: Option<serde_json::Value>,
}

/// The authenticated header wrapping a record's payload.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct Header {
    /// Fixed protocol tag, always [`PROTOCOL_VERSION`].
    pub version: String,
    /// Which payload shape this record carries.
    #[serde(rename = "type")]
    pub record_type: RecordType,
    /// 64-lowercase-hex SHA-256 of the canonical payload.
    #[serde(rename = "payloadChecksum")]
    pub payload_checksum: String,
    /// Ordered, non-empty history of signatures. New signatures are
    /// appended; existing ones are never removed.
    pub signatures: Vec<Signature>,
}

impl Header {
    /// Construct a header with a single initial signature.
    #[must_use]
    pub fn new(record_type: RecordType, payload_checksum: String, signature: Signature) -> Self {
        Self {
            version: PROTOCOL_VERSION.to_string(),
            record_type,
            payload_checksum,
            signatures: vec![signature],
        }
    }

    /// The most recently appended signature, i.e. the one describing the
    /// latest mutation.
    #[must_use]
    pub fn latest_signature(&self) -> Option<&Signature> {
        self.signatures.last()
    }
}

/// Helper used only to deserialize a [`Record`]: the payload is kept as a
/// raw [`serde_json::Value`] until `header.type` is known, then dispatched
/// to the concrete payload shape.
#[derive(Deserialize)]
struct RawRecord {
    header: Header,
    payload: serde_json::Value,
}

/// A complete, persistable record: a signed [`Header`] plus a typed
/// [`Payload`].
///
/// `Record` deliberately does not derive `Deserialize` — the payload's
/// concrete shape depends on `header.type`, so deserialization is
/// implemented by hand below, dispatching through
/// [`Payload::from_value`] rather than guessing from an untagged enum.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct Record {
    /// The signed header.
    pub header: Header,
    /// The typed payload. Always matches `header.record_type`; enforced by
    /// [`Record::new`] and by the dispatched `Deserialize` impl.
    pub payload: Payload,
}

impl Record {
    /// Construct a record, checking that `payload`'s variant matches
    /// `header.record_type`.
    ///
    /// # Errors
    ///
    /// Returns [`GitGovError::SchemaError`] if the header's declared type
    /// does not match the payload's actual variant.
    pub fn new(header: Header, payload: Payload) -> Result<Self, GitGovError> {
        if header.record_type != payload.record_type() {
            return Err(GitGovError::SchemaError {
                path: "header.type".to_string(),
                message: format!(
                    "header declares type {:?} but payload is {:?}",
                    header.record_type,
                    payload.record_type()
                ),
            });
        }
        Ok(Self { header, payload })
    }
}

impl<'de> Deserialize<'de> for Record {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = RawRecord::deserialize(deserializer)?;
        let payload = Payload::from_value(raw.header.record_type, raw.payload).map_err(DeError::custom)?;
        Record::new(raw.header, payload).map_err(DeError::custom)
    }
}
