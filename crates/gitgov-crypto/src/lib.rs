// SPDX-License-Identifier: MIT OR Apache-2.0
#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]
#![warn(missing_docs)]

/// Canonical JSON serialization and SHA-256 payload checksums.
pub mod canon;
/// Ed25519 key material storage.
pub mod keys;
/// The keyed-digest Ed25519 signature scheme.
pub mod sign;

pub use canon::{payload_checksum, sha256_hex, sha256_raw, to_canonical_string};
pub use keys::{decode_public_key, encode_public_key, seed_from_string, signing_key_from_seed_string, FsKeyStore, KeyStore, MemoryKeyStore};
pub use sign::{digest_input, sign_digest, verify_digest};
