// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
#![warn(missing_docs)]
//! gitgov-error
//!
//! Unified error taxonomy with stable error codes for GitGovernance.
//!
//! Every [`GitGovError`] carries an [`ErrorCode`] (a machine-readable,
//! stable string tag) and maps onto the CLI exit codes of the project's
//! error handling design via [`GitGovError::exit_code`].

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Broad family an [`ErrorCode`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Schema / structural validation errors.
    Schema,
    /// Payload checksum drift.
    Checksum,
    /// Signature verification failures.
    Signature,
    /// Forbidden workflow transitions.
    Workflow,
    /// Broken cross-record references.
    Referential,
    /// Actor resolution failures.
    Identity,
    /// Git / sync operational failures.
    Sync,
    /// Storage or filesystem failures.
    Io,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Schema => "schema",
            Self::Checksum => "checksum",
            Self::Signature => "signature",
            Self::Workflow => "workflow",
            Self::Referential => "referential",
            Self::Identity => "identity",
            Self::Sync => "sync",
            Self::Io => "io",
        };
        f.write_str(s)
    }
}

/// Machine-readable, stable error code.
///
/// Each variant serializes to a `SCREAMING_SNAKE_CASE` string that is
/// guaranteed not to change across patch releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// A record's payload failed schema validation.
    SchemaError,
    /// A record's declared payload checksum does not match the recomputed one.
    ChecksumError,
    /// A signature failed to verify, or references an unknown/revoked key.
    SignatureError,
    /// A workflow transition was attempted without the required signatures.
    WorkflowError,
    /// A cross-record reference (or bidirectional link) does not resolve.
    ReferentialError,
    /// More than one actor key is present and none is selected by a session.
    AmbiguousActorError,
    /// No actor could be resolved (no session, no key file).
    NoActorError,
    /// The repository has no configured remote.
    NoRemoteError,
    /// The branch being operated on has no commits.
    NoCommitsError,
    /// A rebase produced conflicting files.
    ConflictError,
    /// `init` was run against a worktree that is already initialized and diverges.
    AlreadyInitializedError,
    /// A storage, filesystem, or git subprocess operation failed.
    IoError,
}

impl ErrorCode {
    /// Returns the broad [`ErrorCategory`] this code belongs to.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::SchemaError => ErrorCategory::Schema,
            Self::ChecksumError => ErrorCategory::Checksum,
            Self::SignatureError => ErrorCategory::Signature,
            Self::WorkflowError => ErrorCategory::Workflow,
            Self::ReferentialError => ErrorCategory::Referential,
            Self::AmbiguousActorError | Self::NoActorError => ErrorCategory::Identity,
            Self::NoRemoteError | Self::NoCommitsError | Self::ConflictError => {
                ErrorCategory::Sync
            }
            Self::AlreadyInitializedError | Self::IoError => ErrorCategory::Io,
        }
    }

    /// Stable `&'static str` representation (e.g. `"SCHEMA_ERROR"`).
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SchemaError => "SCHEMA_ERROR",
            Self::ChecksumError => "CHECKSUM_ERROR",
            Self::SignatureError => "SIGNATURE_ERROR",
            Self::WorkflowError => "WORKFLOW_ERROR",
            Self::ReferentialError => "REFERENTIAL_ERROR",
            Self::AmbiguousActorError => "AMBIGUOUS_ACTOR_ERROR",
            Self::NoActorError => "NO_ACTOR_ERROR",
            Self::NoRemoteError => "NO_REMOTE_ERROR",
            Self::NoCommitsError => "NO_COMMITS_ERROR",
            Self::ConflictError => "CONFLICT_ERROR",
            Self::AlreadyInitializedError => "ALREADY_INITIALIZED_ERROR",
            Self::IoError => "IO_ERROR",
        }
    }

    /// The CLI exit code this error code maps to.
    ///
    /// `0` success; `1` validation/lint errors; `2` operational failure (no
    /// remote, git error); `3` ambiguous actor; `4` workflow transition
    /// denied.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::SchemaError | Self::ChecksumError | Self::SignatureError | Self::ReferentialError => 1,
            Self::NoRemoteError
            | Self::NoCommitsError
            | Self::ConflictError
            | Self::AlreadyInitializedError
            | Self::IoError => 2,
            Self::AmbiguousActorError | Self::NoActorError => 3,
            Self::WorkflowError => 4,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unified GitGovernance error.
#[derive(Debug, thiserror::Error)]
pub enum GitGovError {
    /// A record's payload failed schema validation.
    #[error("schema validation failed at {path}: {message}")]
    SchemaError {
        /// JSON-pointer-ish path within the payload where validation failed.
        path: String,
        /// Human-readable validator message.
        message: String,
    },

    /// A record's declared payload checksum does not match the recomputed one.
    #[error("checksum mismatch: expected {expected}, computed {actual}")]
    ChecksumError {
        /// Checksum declared in the record header.
        expected: String,
        /// Checksum recomputed from the canonical payload.
        actual: String,
    },

    /// A signature failed to verify, or references an unknown/revoked key.
    #[error("signature error for key {key_id}: {reason}")]
    SignatureError {
        /// The `keyId` of the offending signature.
        key_id: String,
        /// Why verification failed.
        reason: String,
    },

    /// A workflow transition was attempted without the required signatures.
    #[error("workflow transition {from} -> {to} denied, missing roles: {missing_roles:?}")]
    WorkflowError {
        /// Originating state.
        from: String,
        /// Requested destination state.
        to: String,
        /// Roles that were required but not present among the record's signatures.
        missing_roles: Vec<String>,
    },

    /// A cross-record reference (or bidirectional link) does not resolve.
    #[error("referential error ({kind}): {from} -> {to} does not resolve")]
    ReferentialError {
        /// Kind of reference (`"taskId"`, `"cycleIds"`, ...).
        kind: String,
        /// Source record id.
        from: String,
        /// Target record id that could not be resolved.
        to: String,
    },

    /// More than one actor key is present and none is selected by a session.
    #[error("ambiguous actor, candidates: {candidates:?}")]
    AmbiguousActorError {
        /// Actor ids found in the key store.
        candidates: Vec<String>,
    },

    /// No actor could be resolved (no session, no key file).
    #[error("no actor could be resolved")]
    NoActorError,

    /// The repository has no configured remote.
    #[error("no remote configured")]
    NoRemoteError,

    /// The branch being operated on has no commits.
    #[error("branch {branch} has no commits")]
    NoCommitsError {
        /// The branch that was expected to have commits.
        branch: String,
    },

    /// A rebase produced conflicting files.
    #[error("conflict in {} file(s): {files:?}", files.len())]
    ConflictError {
        /// Paths (relative to the worktree) with conflict markers.
        files: Vec<PathBuf>,
    },

    /// `init` was run against a worktree that is already initialized and diverges.
    #[error("already initialized: {reason}")]
    AlreadyInitializedError {
        /// Why the existing state prevented a clean no-op.
        reason: String,
    },

    /// A storage, filesystem, or git subprocess operation failed.
    #[error("io error during {operation}: {source}")]
    IoError {
        /// Short description of what was being attempted.
        operation: String,
        /// Underlying cause.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl GitGovError {
    /// Convenience constructor for [`GitGovError::IoError`].
    pub fn io(operation: impl Into<String>, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::IoError {
            operation: operation.into(),
            source: Box::new(source),
        }
    }

    /// Returns the stable [`ErrorCode`] for this error.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::SchemaError { .. } => ErrorCode::SchemaError,
            Self::ChecksumError { .. } => ErrorCode::ChecksumError,
            Self::SignatureError { .. } => ErrorCode::SignatureError,
            Self::WorkflowError { .. } => ErrorCode::WorkflowError,
            Self::ReferentialError { .. } => ErrorCode::ReferentialError,
            Self::AmbiguousActorError { .. } => ErrorCode::AmbiguousActorError,
            Self::NoActorError => ErrorCode::NoActorError,
            Self::NoRemoteError => ErrorCode::NoRemoteError,
            Self::NoCommitsError { .. } => ErrorCode::NoCommitsError,
            Self::ConflictError { .. } => ErrorCode::ConflictError,
            Self::AlreadyInitializedError { .. } => ErrorCode::AlreadyInitializedError,
            Self::IoError { .. } => ErrorCode::IoError,
        }
    }

    /// Shorthand for `self.code().exit_code()`.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        self.code().exit_code()
    }

    /// Shorthand for `self.code().category()`.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        self.code().category()
    }
}

/// JSON-serializable envelope for CLI JSON-mode error reporting:
/// `{ ok: false, error: { kind, message, details } }`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ErrorEnvelope {
    /// Always `false` for an error envelope.
    pub ok: bool,
    /// The error payload.
    pub error: ErrorDetails,
}

/// Structured error details within an [`ErrorEnvelope`].
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ErrorDetails {
    /// Stable machine-readable error code.
    pub kind: ErrorCode,
    /// Human-readable message.
    pub message: String,
    /// Arbitrary structured context (candidates, missing roles, conflicting files, ...).
    pub details: serde_json::Value,
}

impl From<&GitGovError> for ErrorEnvelope {
    fn from(err: &GitGovError) -> Self {
        let details = match err {
            GitGovError::WorkflowError { missing_roles, .. } => {
                serde_json::json!({ "missingRoles": missing_roles })
            }
            GitGovError::AmbiguousActorError { candidates } => {
                serde_json::json!({ "candidates": candidates })
            }
            GitGovError::ConflictError { files } => {
                serde_json::json!({ "files": files })
            }
            _ => serde_json::Value::Null,
        };
        Self {
            ok: false,
            error: ErrorDetails {
                kind: err.code(),
                message: err.to_string(),
                details,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_CODES: &[ErrorCode] = &[
        ErrorCode::SchemaError,
        ErrorCode::ChecksumError,
        ErrorCode::SignatureError,
        ErrorCode::WorkflowError,
        ErrorCode::ReferentialError,
        ErrorCode::AmbiguousActorError,
        ErrorCode::NoActorError,
        ErrorCode::NoRemoteError,
        ErrorCode::NoCommitsError,
        ErrorCode::ConflictError,
        ErrorCode::AlreadyInitializedError,
        ErrorCode::IoError,
    ];

    #[test]
    fn exit_code_mapping_matches_spec() {
        assert_eq!(ErrorCode::SchemaError.exit_code(), 1);
        assert_eq!(ErrorCode::ChecksumError.exit_code(), 1);
        assert_eq!(ErrorCode::SignatureError.exit_code(), 1);
        assert_eq!(ErrorCode::ReferentialError.exit_code(), 1);
        assert_eq!(ErrorCode::NoRemoteError.exit_code(), 2);
        assert_eq!(ErrorCode::NoCommitsError.exit_code(), 2);
        assert_eq!(ErrorCode::ConflictError.exit_code(), 2);
        assert_eq!(ErrorCode::AlreadyInitializedError.exit_code(), 2);
        assert_eq!(ErrorCode::IoError.exit_code(), 2);
        assert_eq!(ErrorCode::AmbiguousActorError.exit_code(), 3);
        assert_eq!(ErrorCode::NoActorError.exit_code(), 3);
        assert_eq!(ErrorCode::WorkflowError.exit_code(), 4);
    }

    #[test]
    fn all_codes_have_unique_as_str() {
        let mut seen = std::collections::HashSet::new();
        for code in ALL_CODES {
            assert!(seen.insert(code.as_str()), "duplicate as_str: {code:?}");
        }
        assert_eq!(seen.len(), ALL_CODES.len());
    }

    #[test]
    fn display_includes_context() {
        let err = GitGovError::WorkflowError {
            from: "review".into(),
            to: "active".into(),
            missing_roles: vec!["approver".into()],
        };
        let s = err.to_string();
        assert!(s.contains("review"));
        assert!(s.contains("approver"));
    }

    #[test]
    fn error_envelope_shape() {
        let err = GitGovError::AmbiguousActorError {
            candidates: vec!["human:alice".into(), "human:bob".into()],
        };
        let envelope = ErrorEnvelope::from(&err);
        assert!(!envelope.ok);
        assert_eq!(envelope.error.kind, ErrorCode::AmbiguousActorError);
        assert_eq!(
            envelope.error.details["candidates"],
            serde_json::json!(["human:alice", "human:bob"])
        );
    }

    #[test]
    fn error_code_serde_roundtrip() {
        let json = serde_json::to_string(&ErrorCode::NoRemoteError).unwrap();
        assert_eq!(json, r#""NO_REMOTE_ERROR""#);
        let back: ErrorCode = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ErrorCode::NoRemoteError);
    }

    #[test]
    fn io_constructor_wraps_source() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err = GitGovError::io("read config", io_err);
        assert_eq!(err.code(), ErrorCode::IoError);
        assert!(err.to_string().contains("read config"));
    }
}
