//! Default id generation for record types whose id is derived from a unix
//! timestamp and a slug of some title-like field, rather than supplied
//! directly (actor/agent ids are assigned by `gitgov-identity` and are
//! never generated here).

use chrono::{DateTime, Utc};

use gitgov_core::RecordType;

/// Lowercase, hyphenate, and truncate `input` to the `[a-z0-9-]{1,50}`
/// shape every generated id's slug segment must satisfy.
#[must_use]
pub fn slug(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut last_was_dash = false;
    for ch in input.chars().flat_map(char::to_lowercase) {
        if ch.is_ascii_alphanumeric() {
            out.push(ch);
            last_was_dash = false;
        } else if !last_was_dash && !out.is_empty() {
            out.push('-');
            last_was_dash = true;
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    out.truncate(50);
    while out.ends_with('-') {
        out.pop();
    }
    if out.is_empty() {
        "untitled".to_string()
    } else {
        out
    }
}

/// Generate a default id of the form `<unix-seconds>-<type>-<slug>` for a
/// record type whose id is not supplied by the caller (every type except
/// `actor`/`agent`).
#[must_use]
pub fn generate_id(record_type: RecordType, title_basis: &str, now: DateTime<Utc>) -> String {
    format!("{:010}-{}-{}", now.timestamp(), record_type.as_str(), slug(title_basis))
}
