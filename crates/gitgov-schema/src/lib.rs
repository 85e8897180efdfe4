// SPDX-License-Identifier: MIT OR Apache-2.0
#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]
#![warn(missing_docs)]

use std::collections::HashMap;
use std::sync::OnceLock;

use gitgov_core::payload::RecordType;
use gitgov_core::{ActorPayload, AgentPayload, ChangelogPayload, CyclePayload, ExecutionPayload, FeedbackPayload, TaskPayload};
use gitgov_error::GitGovError;
use jsonschema::Validator;
use schemars::schema_for;
use serde_json::Value;

fn compile<T: schemars::JsonSchema>() -> Validator {
    let schema = serde_json::to_value(schema_for!(T)).expect("schema serializes to JSON");
    jsonschema::validator_for(&schema).expect("generated schema is valid JSON Schema")
}

/// `additionalProperties: false` violations are the only fixable class of
/// error (§9 Open Questions); everything else is surfaced as-is.
fn is_noise(message: &str) -> bool {
    message.contains("must match else/then schema") || message.contains("boolean schema is false")
}

/// Compiled [`Validator`] error messages for `instance`, with the
/// `oneOf`/`if`-`then`-`else` noise messages filtered out (§4.12 step 2).
#[must_use]
pub fn filtered_error_messages(validator: &Validator, instance: &Value) -> Vec<String> {
    validator
        .iter_errors(instance)
        .map(|e| e.to_string())
        .filter(|msg| !is_noise(msg))
        .collect()
}

/// Process-wide cache of one compiled [`Validator`] per [`RecordType`].
///
/// Schemas are generated from the `gitgov-core` payload types via
/// `schemars::schema_for!` and compiled once; the cache keys on `type` and
/// is built lazily on first access.
pub struct SchemaCache {
    validators: HashMap<RecordType, Validator>,
}

static CACHE: OnceLock<SchemaCache> = OnceLock::new();

impl SchemaCache {
    /// Returns the process-wide schema cache, compiling every schema on
    /// first use.
    #[must_use]
    pub fn global() -> &'static SchemaCache {
        CACHE.get_or_init(Self::build)
    }

    fn build() -> Self {
        let mut validators = HashMap::new();
        validators.insert(RecordType::Actor, compile::<ActorPayload>());
        validators.insert(RecordType::Agent, compile::<AgentPayload>());
        validators.insert(RecordType::Cycle, compile::<CyclePayload>());
        validators.insert(RecordType::Task, compile::<TaskPayload>());
        validators.insert(RecordType::Execution, compile::<ExecutionPayload>());
        validators.insert(RecordType::Feedback, compile::<FeedbackPayload>());
        validators.insert(RecordType::Changelog, compile::<ChangelogPayload>());
        Self { validators }
    }

    /// The compiled validator for `record_type`.
    #[must_use]
    pub fn validator_for(&self, record_type: RecordType) -> &Validator {
        self.validators
            .get(&record_type)
            .expect("every RecordType has a compiled schema")
    }

    /// Validate a raw payload `Value` against the schema for `record_type`.
    ///
    /// # Errors
    ///
    /// Returns [`GitGovError::SchemaError`] with every non-noise validator
    /// message joined, if validation fails.
    pub fn validate(&self, record_type: RecordType, payload: &Value) -> Result<(), GitGovError> {
        let validator = self.validator_for(record_type);
        let messages = filtered_error_messages(validator, payload);
        if messages.is_empty() {
            Ok(())
        } else {
            Err(GitGovError::SchemaError {
                path: record_type.as_str().to_string(),
                message: messages.join("; "),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn valid_task_payload_passes() {
        let cache = SchemaCache::global();
        let value = json!({
            "title": "Ship it",
            "status": "draft",
            "priority": "medium",
            "description": "does the thing",
        });
        cache.validate(RecordType::Task, &value).unwrap();
    }

    #[test]
    fn additional_property_is_rejected() {
        let cache = SchemaCache::global();
        let value = json!({
            "title": "Ship it",
            "status": "draft",
            "priority": "medium",
            "description": "does the thing",
            "extraField": "x",
        });
        let err = cache.validate(RecordType::Task, &value).unwrap_err();
        assert_eq!(err.code(), gitgov_error::ErrorCode::SchemaError);
    }

    #[test]
    fn missing_required_field_is_rejected() {
        let cache = SchemaCache::global();
        let value = json!({ "title": "Ship it" });
        assert!(cache.validate(RecordType::Task, &value).is_err());
    }

    #[test]
    fn wrong_enum_variant_is_rejected() {
        let cache = SchemaCache::global();
        let value = json!({
            "title": "Ship it",
            "status": "not-a-real-status",
            "priority": "medium",
            "description": "does the thing",
        });
        assert!(cache.validate(RecordType::Task, &value).is_err());
    }

    #[test]
    fn schema_cache_is_process_wide_singleton() {
        let a = SchemaCache::global() as *const SchemaCache;
        let b = SchemaCache::global() as *const SchemaCache;
        assert_eq!(a, b);
    }

    #[test]
    fn all_seven_record_types_have_compiled_validators() {
        let cache = SchemaCache::global();
        for rt in [
            RecordType::Actor,
            RecordType::Agent,
            RecordType::Cycle,
            RecordType::Task,
            RecordType::Execution,
            RecordType::Feedback,
            RecordType::Changelog,
        ] {
            let _ = cache.validator_for(rt);
        }
    }
}
