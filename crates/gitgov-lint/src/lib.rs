// SPDX-License-Identifier: MIT OR Apache-2.0
#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]
#![warn(missing_docs)]

//! The lint pipeline: discovery, validation, and fix-mode for the
//! record set.

/// The fixability rule and property-removal mechanics.
pub mod fix;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Instant;

use chrono::{DateTime, Utc};
use jsonschema::Validator;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use gitgov_core::payload::RecordType;
use gitgov_error::GitGovError;
use gitgov_schema::SchemaCache;
use gitgov_store::unescape_id;

/// Severity of a single lint finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    /// Blocks a clean lint run.
    Error,
    /// Surfaced but does not affect exit status.
    Warning,
}

/// The entity a finding is about.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityRef {
    /// Wire-level record type (`"task"`, `"cycle"`, ...).
    #[serde(rename = "type")]
    pub entity_type: String,
    /// The entity's id (derived from its filename).
    pub id: String,
}

/// A single pipeline finding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LintFinding {
    /// Error or warning.
    pub level: Level,
    /// Path to the offending file, relative to the state root.
    #[serde(rename = "filePath")]
    pub file_path: PathBuf,
    /// Which pipeline stage produced this finding (`"schema"`,
    /// `"structure"`, `"checksum"`, `"signature"`, `"referential"`,
    /// `"bidirectional"`, `"naming"`, `"temporal"`, `"migration"`).
    pub validator: String,
    /// The entity this finding concerns.
    pub entity: EntityRef,
    /// Human-readable description.
    pub message: String,
    /// Whether `fix: true` can resolve this finding automatically.
    pub fixable: bool,
}

/// Run summary counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
    /// Number of files discovered and checked.
    #[serde(rename = "filesChecked")]
    pub files_checked: usize,
    /// Number of `Level::Error` findings, after `exclude_validators`.
    pub errors: usize,
    /// Number of `Level::Warning` findings, after `exclude_validators`.
    pub warnings: usize,
    /// Number of findings with `fixable: true`, after `exclude_validators`.
    pub fixable: usize,
    /// Wall-clock time the run took, in milliseconds.
    #[serde(rename = "executionTime")]
    pub execution_time_ms: u128,
}

/// Options controlling a lint run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LintOptions {
    /// Validator names whose findings are dropped from the report and
    /// from exit-status computation.
    #[serde(rename = "excludeValidators", default)]
    pub exclude_validators: Vec<String>,
    /// Detect legacy (pre-embedded-metadata) records without modifying
    /// anything.
    #[serde(rename = "checkMigrations", default)]
    pub check_migrations: bool,
    /// Apply fixes to every `fixable: true` finding, backing up each
    /// rewritten file first.
    #[serde(default)]
    pub fix: bool,
    /// When `fix` is set, restrict fixing to findings from these
    /// validator names. `None` fixes every fixable finding.
    #[serde(rename = "fixValidators", default)]
    pub fix_validators: Option<Vec<String>>,
}

/// Report metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// When this run started.
    pub timestamp: DateTime<Utc>,
    /// The options this run was invoked with.
    pub options: LintOptions,
    /// The pipeline's own version tag (tracks the crate version).
    pub version: String,
}

/// The full lint report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    /// Aggregate counts.
    pub summary: Summary,
    /// Every finding, in discovery order, after `exclude_validators`
    /// filtering.
    pub results: Vec<LintFinding>,
    /// Run metadata.
    pub metadata: ReportMetadata,
}

fn header_validator() -> &'static Validator {
    static V: OnceLock<Validator> = OnceLock::new();
    V.get_or_init(|| {
        let schema = serde_json::to_value(schemars::schema_for!(gitgov_core::Header)).expect("Header schema serializes");
        jsonschema::validator_for(&schema).expect("Header schema compiles")
    })
}

fn record_type_from_wire(s: &str) -> Option<RecordType> {
    [
        RecordType::Actor,
        RecordType::Agent,
        RecordType::Cycle,
        RecordType::Task,
        RecordType::Execution,
        RecordType::Feedback,
        RecordType::Changelog,
    ]
    .into_iter()
    .find(|rt| rt.as_str() == s)
}

struct DiscoveredFile {
    path: PathBuf,
    record_type: RecordType,
    id: String,
    raw: Value,
    is_legacy: bool,
}

fn discover(state_root: &Path) -> Vec<DiscoveredFile> {
    let categories = [
        RecordType::Actor,
        RecordType::Agent,
        RecordType::Cycle,
        RecordType::Task,
        RecordType::Execution,
        RecordType::Feedback,
        RecordType::Changelog,
    ];

    let mut files = Vec::new();
    for record_type in categories {
        let dir = state_root.join(record_type.directory());
        if !dir.is_dir() {
            continue;
        }
        let Ok(entries) = std::fs::read_dir(&dir) else { continue };
        let mut paths: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|e| e.path())
            .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("json"))
            .collect();
        paths.sort();

        for path in paths {
            let Ok(bytes) = std::fs::read(&path) else { continue };
            let Ok(raw) = serde_json::from_slice::<Value>(&bytes) else { continue };
            let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
            let id = unescape_id(stem);
            let is_legacy = raw.get("header").is_none() || raw.get("payload").is_none();
            files.push(DiscoveredFile {
                path,
                record_type,
                id,
                raw,
                is_legacy,
            });
        }
    }
    files
}

fn finding(level: Level, file: &DiscoveredFile, validator: &str, message: String, fixable: bool) -> LintFinding {
    LintFinding {
        level,
        file_path: file.path.clone(),
        validator: validator.to_string(),
        entity: EntityRef {
            entity_type: file.record_type.as_str().to_string(),
            id: file.id.clone(),
        },
        message,
        fixable,
    }
}

fn stage_schema(file: &DiscoveredFile) -> Vec<LintFinding> {
    let Some(payload) = file.raw.get("payload") else { return Vec::new() };
    let validator = SchemaCache::global().validator_for(file.record_type);
    gitgov_schema::filtered_error_messages(validator, payload)
        .into_iter()
        .map(|message| finding(Level::Error, file, "schema", message, false))
        .collect()
}

fn stage_structure(file: &DiscoveredFile) -> Vec<LintFinding> {
    let mut results = Vec::new();
    let header_errors: Vec<String> = header_validator()
        .iter_errors(&file.raw["header"])
        .map(|e| e.to_string())
        .filter(|m| fix::is_additional_properties_message(m))
        .collect();
    for message in header_errors {
        let properties = fix::unexpected_properties(&message);
        let fixable = !properties.is_empty() && fix::is_property_removal_fixable(header_validator(), &file.raw["header"], &properties);
        results.push(finding(Level::Error, file, "structure", format!("header: {message}"), fixable));
    }

    if let Some(payload) = file.raw.get("payload") {
        let validator = SchemaCache::global().validator_for(file.record_type);
        let payload_errors: Vec<String> = validator
            .iter_errors(payload)
            .map(|e| e.to_string())
            .filter(|m| fix::is_additional_properties_message(m))
            .collect();
        for message in payload_errors {
            let properties = fix::unexpected_properties(&message);
            let fixable = !properties.is_empty() && fix::is_property_removal_fixable(validator, payload, &properties);
            results.push(finding(Level::Error, file, "structure", format!("payload: {message}"), fixable));
        }
    }
    results
}

fn stage_checksum(file: &DiscoveredFile) -> Vec<LintFinding> {
    let Some(payload) = file.raw.get("payload") else { return Vec::new() };
    let Some(declared) = file.raw["header"].get("payloadChecksum").and_then(Value::as_str) else {
        return Vec::new();
    };
    let recomputed = gitgov_crypto::canon::sha256_hex(gitgov_crypto::canon::canonicalize(payload).as_bytes());
    if recomputed == declared {
        Vec::new()
    } else {
        vec![finding(
            Level::Error,
            file,
            "checksum",
            format!("declared payloadChecksum {declared} does not match recomputed {recomputed}"),
            false,
        )]
    }
}

fn stage_signature(file: &DiscoveredFile) -> Vec<LintFinding> {
    let mut results = Vec::new();
    let Some(signatures) = file.raw["header"].get("signatures").and_then(Value::as_array) else {
        return vec![finding(Level::Error, file, "signature", "header.signatures is missing or not an array".to_string(), false)];
    };
    if signatures.is_empty() {
        results.push(finding(Level::Error, file, "signature", "a record must carry at least one signature".to_string(), false));
    }
    for sig in signatures {
        let Some(key_id) = sig.get("keyId").and_then(Value::as_str) else {
            results.push(finding(Level::Error, file, "signature", "signature missing keyId".to_string(), false));
            continue;
        };
        if let Err(e) = gitgov_factory::invariants::validate_key_id(key_id) {
            results.push(finding(Level::Error, file, "signature", e.to_string(), false));
        }
        if let Some(role) = sig.get("role").and_then(Value::as_str) {
            if let Err(e) = gitgov_factory::invariants::validate_role(role) {
                results.push(finding(Level::Error, file, "signature", e.to_string(), false));
            }
        } else {
            results.push(finding(Level::Error, file, "signature", "signature missing role".to_string(), false));
        }
        if let Some(notes) = sig.get("notes").and_then(Value::as_str) {
            if let Err(e) = gitgov_factory::invariants::validate_notes(notes) {
                results.push(finding(Level::Error, file, "signature", e.to_string(), false));
            }
        } else {
            results.push(finding(Level::Error, file, "signature", "signature missing notes".to_string(), false));
        }
        if sig.get("signature").and_then(Value::as_str).is_none() {
            results.push(finding(Level::Error, file, "signature", "signature missing signature field".to_string(), false));
        }
    }
    results
}

fn stage_referential(file: &DiscoveredFile, by_category: &HashMap<RecordType, HashMap<String, &Value>>) -> Vec<LintFinding> {
    let mut results = Vec::new();
    let Some(payload) = file.raw.get("payload") else { return results };

    let mut check = |kind: &str, target_type: RecordType, target_id: &str| {
        let exists = by_category.get(&target_type).is_some_and(|ids| ids.contains_key(target_id));
        if !exists {
            results.push(finding(
                Level::Error,
                file,
                "referential",
                format!("{kind} {target_id:?} does not resolve to an existing {}", target_type.as_str()),
                false,
            ));
        }
    };

    match file.record_type {
        RecordType::Execution => {
            if let Some(task_id) = payload.get("taskId").and_then(Value::as_str) {
                check("taskId", RecordType::Task, task_id);
            }
        }
        RecordType::Feedback => {
            if let (Some(entity_type), Some(entity_id)) = (
                payload.get("entityType").and_then(Value::as_str),
                payload.get("entityId").and_then(Value::as_str),
            ) {
                if let Some(target_type) = record_type_from_wire(entity_type) {
                    check("entityId", target_type, entity_id);
                }
            }
            if let Some(resolves) = payload.get("resolvesFeedbackId").and_then(Value::as_str) {
                check("resolvesFeedbackId", RecordType::Feedback, resolves);
            }
        }
        RecordType::Changelog => {
            if let Some(related) = payload.get("relatedTasks").and_then(Value::as_array) {
                for task_id in related.iter().filter_map(Value::as_str) {
                    check("relatedTasks", RecordType::Task, task_id);
                }
            }
        }
        _ => {}
    }
    results
}

fn stage_bidirectional(file: &DiscoveredFile, by_category: &HashMap<RecordType, HashMap<String, &Value>>) -> Vec<LintFinding> {
    let mut results = Vec::new();
    let Some(payload) = file.raw.get("payload") else { return results };

    match file.record_type {
        RecordType::Task => {
            if let Some(cycle_ids) = payload.get("cycleIds").and_then(Value::as_array) {
                for cycle_id in cycle_ids.iter().filter_map(Value::as_str) {
                    let back_linked = by_category
                        .get(&RecordType::Cycle)
                        .and_then(|m| m.get(cycle_id))
                        .and_then(|c| c.get("payload"))
                        .and_then(|p| p.get("taskIds"))
                        .and_then(Value::as_array)
                        .is_some_and(|ids| ids.iter().filter_map(Value::as_str).any(|id| id == file.id));
                    if !back_linked {
                        results.push(finding(
                            Level::Error,
                            file,
                            "bidirectional",
                            format!("task {:?} lists cycle {cycle_id:?} but that cycle does not list the task back", file.id),
                            false,
                        ));
                    }
                }
            }
        }
        RecordType::Cycle => {
            if let Some(task_ids) = payload.get("taskIds").and_then(Value::as_array) {
                for task_id in task_ids.iter().filter_map(Value::as_str) {
                    let back_linked = by_category
                        .get(&RecordType::Task)
                        .and_then(|m| m.get(task_id))
                        .and_then(|t| t.get("payload"))
                        .and_then(|p| p.get("cycleIds"))
                        .and_then(Value::as_array)
                        .is_some_and(|ids| ids.iter().filter_map(Value::as_str).any(|id| id == file.id));
                    if !back_linked {
                        results.push(finding(
                            Level::Error,
                            file,
                            "bidirectional",
                            format!("cycle {:?} lists task {task_id:?} but that task does not list the cycle back", file.id),
                            false,
                        ));
                    }
                }
            }
        }
        _ => {}
    }
    results
}

fn stage_naming(file: &DiscoveredFile) -> Vec<LintFinding> {
    if gitgov_factory::invariants::validate_id_pattern(file.record_type, &file.id).is_ok() {
        Vec::new()
    } else {
        vec![finding(
            Level::Error,
            file,
            "naming",
            format!("filename-derived id {:?} does not match the {} id pattern", file.id, file.record_type.as_str()),
            false,
        )]
    }
}

fn stage_temporal(file: &DiscoveredFile) -> Vec<LintFinding> {
    let Some(signatures) = file.raw["header"].get("signatures").and_then(Value::as_array) else {
        return Vec::new();
    };
    let timestamps: Vec<i64> = signatures.iter().filter_map(|s| s.get("timestamp").and_then(Value::as_i64)).collect();
    let mut results = Vec::new();
    for window in timestamps.windows(2) {
        if window[1] < window[0] {
            results.push(finding(
                Level::Error,
                file,
                "temporal",
                format!("signature timestamps are not non-decreasing: {} followed by {}", window[0], window[1]),
                false,
            ));
        }
    }
    results
}

fn stage_migration(file: &DiscoveredFile) -> Vec<LintFinding> {
    if file.is_legacy {
        vec![finding(
            Level::Warning,
            file,
            "migration",
            "record predates the embedded header/payload wrapper and needs migrating".to_string(),
            false,
        )]
    } else {
        Vec::new()
    }
}

fn run_pipeline(files: &[DiscoveredFile], options: &LintOptions) -> Vec<LintFinding> {
    let mut by_category: HashMap<RecordType, HashMap<String, &Value>> = HashMap::new();
    for file in files {
        by_category.entry(file.record_type).or_default().insert(file.id.clone(), &file.raw);
    }

    let mut results = Vec::new();
    for file in files {
        if options.check_migrations {
            results.extend(stage_migration(file));
        }
        if file.is_legacy {
            continue;
        }
        results.extend(stage_schema(file));
        results.extend(stage_structure(file));
        results.extend(stage_checksum(file));
        results.extend(stage_signature(file));
        results.extend(stage_referential(file, &by_category));
        results.extend(stage_bidirectional(file, &by_category));
        results.extend(stage_naming(file));
        results.extend(stage_temporal(file));
    }
    results
}

/// Apply every `fixable: true` finding in `findings` by stripping the
/// named unexpected properties from each offending file, writing
/// `<file>.backup-<unix-seconds>.json` beforehand. Returns the number of
/// files actually rewritten.
///
/// # Errors
///
/// Returns [`GitGovError::IoError`] if a backup or rewrite fails.
fn apply_fixes(findings: &[LintFinding], fix_validators: Option<&[String]>, now: DateTime<Utc>) -> Result<usize, GitGovError> {
    let mut by_file: HashMap<&PathBuf, Vec<&LintFinding>> = HashMap::new();
    for f in findings
        .iter()
        .filter(|f| f.fixable)
        .filter(|f| fix_validators.is_none_or(|names| names.iter().any(|v| v == &f.validator)))
    {
        by_file.entry(&f.file_path).or_default().push(f);
    }

    let mut fixed = 0;
    for (path, file_findings) in by_file {
        let bytes = std::fs::read(path).map_err(|e| GitGovError::io("read file for fix", e))?;
        let mut raw: Value = serde_json::from_slice(&bytes).map_err(|e| GitGovError::io("parse file for fix", e))?;

        let mut changed = false;
        for f in file_findings {
            let properties = fix::unexpected_properties(&f.message);
            if f.message.starts_with("header:") {
                if let Some(header) = raw.get_mut("header") {
                    changed |= fix::apply_property_removal(header, &properties);
                }
            } else if let Some(payload) = raw.get_mut("payload") {
                changed |= fix::apply_property_removal(payload, &properties);
            }
        }

        if changed {
            let backup_path = path.with_extension(format!("backup-{}.json", now.timestamp()));
            std::fs::write(&backup_path, &bytes).map_err(|e| GitGovError::io("write lint fix backup", e))?;
            let mut json = serde_json::to_string_pretty(&raw).map_err(|e| GitGovError::io("serialize fixed record", e))?;
            json.push('\n');
            std::fs::write(path, json).map_err(|e| GitGovError::io("write fixed record", e))?;
            fixed += 1;
        }
    }
    Ok(fixed)
}

/// Run the full nine-stage lint pipeline over `.gitgov/<category>/*.json`
/// files under `state_root`, optionally applying fixes.
///
/// # Errors
///
/// Returns [`GitGovError::IoError`] if fix mode cannot write a backup or
/// rewritten file.
pub fn lint(state_root: &Path, options: &LintOptions, now: DateTime<Utc>) -> Result<Report, GitGovError> {
    let start = Instant::now();
    let files = discover(state_root);
    let files_checked = files.len();
    let mut results = run_pipeline(&files, options);

    if options.fix {
        let fixed = apply_fixes(&results, options.fix_validators.as_deref(), now)?;
        if fixed > 0 {
            let refreshed_files = discover(state_root);
            results = run_pipeline(&refreshed_files, options);
        }
    }

    results.retain(|r| !options.exclude_validators.iter().any(|v| v == &r.validator));

    let errors = results.iter().filter(|r| r.level == Level::Error).count();
    let warnings = results.iter().filter(|r| r.level == Level::Warning).count();
    let fixable = results.iter().filter(|r| r.fixable).count();

    Ok(Report {
        summary: Summary {
            files_checked,
            errors,
            warnings,
            fixable,
            execution_time_ms: start.elapsed().as_millis(),
        },
        results,
        metadata: ReportMetadata {
            timestamp: now,
            options: options.clone(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_record(dir: &Path, category: &str, filename: &str, contents: &Value) {
        let category_dir = dir.join(category);
        fs::create_dir_all(&category_dir).unwrap();
        fs::write(category_dir.join(filename), serde_json::to_vec_pretty(contents).unwrap()).unwrap();
    }

    fn valid_task_record(title: &str) -> Value {
        let payload = serde_json::json!({
            "title": title,
            "status": "draft",
            "priority": "medium",
            "description": "does the thing",
        });
        let checksum = gitgov_crypto::canon::sha256_hex(gitgov_crypto::canon::canonicalize(&payload).as_bytes());
        serde_json::json!({
            "header": {
                "version": "1.0",
                "type": "task",
                "payloadChecksum": checksum,
                "signatures": [{
                    "keyId": "human:alice",
                    "role": "author",
                    "notes": "initial draft",
                    "signature": "A".repeat(86) + "==",
                    "timestamp": 1_700_000_000,
                }],
            },
            "payload": payload,
        })
    }

    #[test]
    fn clean_record_produces_no_findings() {
        let dir = tempfile::tempdir().unwrap();
        write_record(dir.path(), "tasks", "1700000000-task-example.json", &valid_task_record("Ship it"));
        let report = lint(dir.path(), &LintOptions::default(), Utc::now()).unwrap();
        assert_eq!(report.summary.errors, 0);
        assert_eq!(report.summary.files_checked, 1);
    }

    #[test]
    fn checksum_drift_is_detected() {
        let dir = tempfile::tempdir().unwrap();
        let mut record = valid_task_record("Ship it");
        record["header"]["payloadChecksum"] = serde_json::json!("0".repeat(64));
        write_record(dir.path(), "tasks", "1700000000-task-example.json", &record);
        let report = lint(dir.path(), &LintOptions::default(), Utc::now()).unwrap();
        assert!(report.results.iter().any(|r| r.validator == "checksum"));
    }

    #[test]
    fn wrong_directory_surfaces_as_schema_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        // A task record filed under cycles/ is read back as a CyclePayload
        // and fails schema validation.
        write_record(dir.path(), "cycles", "1700000000-cycle-example.json", &valid_task_record("Ship it"));
        let report = lint(dir.path(), &LintOptions::default(), Utc::now()).unwrap();
        assert!(report.results.iter().any(|r| r.validator == "schema"));
    }

    #[test]
    fn additional_property_is_fixable_and_fix_mode_removes_it() {
        let dir = tempfile::tempdir().unwrap();
        let mut record = valid_task_record("Ship it");
        record["payload"]["bogusField"] = serde_json::json!("nope");
        write_record(dir.path(), "tasks", "1700000000-task-example.json", &record);

        let report = lint(dir.path(), &LintOptions::default(), Utc::now()).unwrap();
        assert!(report.results.iter().any(|r| r.validator == "structure" && r.fixable));

        let fix_options = LintOptions {
            fix: true,
            ..Default::default()
        };
        let fixed_report = lint(dir.path(), &fix_options, Utc::now()).unwrap();
        assert!(!fixed_report.results.iter().any(|r| r.validator == "structure"));

        let backups: Vec<_> = fs::read_dir(dir.path().join("tasks"))
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().contains("backup-"))
            .collect();
        assert_eq!(backups.len(), 1);
    }

    #[test]
    fn exclude_validators_drops_matching_findings() {
        let dir = tempfile::tempdir().unwrap();
        let mut record = valid_task_record("Ship it");
        record["header"]["payloadChecksum"] = serde_json::json!("0".repeat(64));
        write_record(dir.path(), "tasks", "1700000000-task-example.json", &record);

        let options = LintOptions {
            exclude_validators: vec!["checksum".to_string()],
            ..Default::default()
        };
        let report = lint(dir.path(), &options, Utc::now()).unwrap();
        assert_eq!(report.summary.errors, 0);
    }

    #[test]
    fn bidirectional_mismatch_is_detected() {
        let dir = tempfile::tempdir().unwrap();
        let mut task = valid_task_record("Ship it");
        task["payload"]["cycleIds"] = serde_json::json!(["1700000000-cycle-sprint"]);
        // recompute checksum since payload changed
        let checksum = gitgov_crypto::canon::sha256_hex(gitgov_crypto::canon::canonicalize(&task["payload"]).as_bytes());
        task["header"]["payloadChecksum"] = serde_json::json!(checksum);
        write_record(dir.path(), "tasks", "1700000000-task-example.json", &task);

        let cycle_payload = serde_json::json!({"title": "Sprint 1", "status": "planning"});
        let cycle_checksum = gitgov_crypto::canon::sha256_hex(gitgov_crypto::canon::canonicalize(&cycle_payload).as_bytes());
        let cycle = serde_json::json!({
            "header": {
                "version": "1.0",
                "type": "cycle",
                "payloadChecksum": cycle_checksum,
                "signatures": [{
                    "keyId": "human:alice", "role": "author", "notes": "n",
                    "signature": "A".repeat(86) + "==", "timestamp": 1_700_000_000,
                }],
            },
            "payload": cycle_payload,
        });
        write_record(dir.path(), "cycles", "1700000000-cycle-sprint.json", &cycle);

        let report = lint(dir.path(), &LintOptions::default(), Utc::now()).unwrap();
        assert!(report.results.iter().any(|r| r.validator == "bidirectional"));
    }

    #[test]
    fn temporal_regression_is_detected() {
        let dir = tempfile::tempdir().unwrap();
        let mut record = valid_task_record("Ship it");
        record["header"]["signatures"]
            .as_array_mut()
            .unwrap()
            .push(serde_json::json!({
                "keyId": "human:bob", "role": "reviewer", "notes": "n",
                "signature": "B".repeat(86) + "==", "timestamp": 1_699_999_000,
            }));
        write_record(dir.path(), "tasks", "1700000000-task-example.json", &record);
        let report = lint(dir.path(), &LintOptions::default(), Utc::now()).unwrap();
        assert!(report.results.iter().any(|r| r.validator == "temporal"));
    }

    #[test]
    fn check_migrations_flags_legacy_records_without_changing_them() {
        let dir = tempfile::tempdir().unwrap();
        let legacy = serde_json::json!({"title": "old-style record", "status": "draft"});
        write_record(dir.path(), "tasks", "1700000000-task-legacy.json", &legacy);
        let options = LintOptions {
            check_migrations: true,
            ..Default::default()
        };
        let report = lint(dir.path(), &options, Utc::now()).unwrap();
        assert!(report.results.iter().any(|r| r.validator == "migration"));
        let on_disk: Value = serde_json::from_slice(&fs::read(dir.path().join("tasks/1700000000-task-legacy.json")).unwrap()).unwrap();
        assert_eq!(on_disk, legacy);
    }
}
