//! The fixability rule: an entry is fixable iff removing the offending
//! property from the JSON value makes the value pass the compiled schema.
//! Determined by actually performing the removal against a clone and
//! re-validating, not by pattern-matching the validator's error message —
//! robust against `jsonschema` wording changes across versions.

use std::sync::OnceLock;

use jsonschema::Validator;
use regex::Regex;
use serde_json::Value;

fn quoted_token_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"'([^']+)'").expect("quoted-token pattern compiles"))
}

/// Extract the property names named in an `additionalProperties` violation
/// message (e.g. `"Additional properties are not allowed ('extraField' was
/// unexpected)"` yields `["extraField"]`).
#[must_use]
pub fn unexpected_properties(message: &str) -> Vec<String> {
    quoted_token_regex().captures_iter(message).map(|c| c[1].to_string()).collect()
}

/// Whether `message` names an `additionalProperties` violation at all (as
/// opposed to some other schema failure this pipeline stage isn't scoped
/// to fix).
#[must_use]
pub fn is_additional_properties_message(message: &str) -> bool {
    message.contains("Additional properties are not allowed") || message.contains("was unexpected")
}

/// Whether removing `properties` from `value` (a clone, `value` itself is
/// untouched) makes it pass `validator`.
#[must_use]
pub fn is_property_removal_fixable(validator: &Validator, value: &Value, properties: &[String]) -> bool {
    let mut clone = value.clone();
    let Value::Object(map) = &mut clone else { return false };
    for property in properties {
        map.remove(property);
    }
    validator.is_valid(&clone)
}

/// Remove `properties` from `value` in place. Returns whether anything was
/// actually removed.
pub fn apply_property_removal(value: &mut Value, properties: &[String]) -> bool {
    let Value::Object(map) = value else { return false };
    let mut changed = false;
    for property in properties {
        if map.remove(property).is_some() {
            changed = true;
        }
    }
    changed
}
