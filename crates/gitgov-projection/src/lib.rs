// SPDX-License-Identifier: MIT OR Apache-2.0
#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]
#![warn(missing_docs)]

//! Record projection / indexer: a regenerable read-side cache over the
//! record set.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use gitgov_core::{Payload, Record, TaskStatus};
use gitgov_error::GitGovError;

/// An enriched task entry, as stored in `.gitgov/index.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EnrichedTask {
    /// The task's id.
    pub id: String,
    /// The task's title.
    pub title: String,
    /// Current lifecycle status.
    pub status: TaskStatus,
    /// The `keyId` of the signature that created the task.
    pub author: String,
    /// The timestamp of the task's most recent signature.
    #[serde(rename = "lastUpdated")]
    pub last_updated: DateTime<Utc>,
    /// Cycles this task belongs to.
    #[serde(rename = "cycleIds")]
    pub cycle_ids: Vec<String>,
}

/// An enriched cycle entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EnrichedCycle {
    /// The cycle's id.
    pub id: String,
    /// The cycle's title.
    pub title: String,
    /// Current lifecycle status.
    pub status: gitgov_core::CycleStatus,
    /// Tasks assigned to this cycle.
    #[serde(rename = "taskIds")]
    pub task_ids: Vec<String>,
}

/// Derived project-health metrics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Metrics {
    /// Fraction (0.0..=1.0) of tasks not in a terminal-abandoned state
    /// (`discarded`).
    pub health: f64,
    /// Number of changelog entries (completed units of work) recorded.
    pub throughput: u64,
    /// Average seconds between a task's first and last signature, among
    /// tasks currently `done` or `archived`. `None` if there are none yet.
    #[serde(rename = "averageLeadTimeSeconds", skip_serializing_if = "Option::is_none")]
    pub average_lead_time_seconds: Option<f64>,
}

/// One entry in the derived activity history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ActivityEntry {
    /// When the activity occurred.
    pub timestamp: DateTime<Utc>,
    /// The kind of activity (`"execution"`, `"feedback"`, `"changelog"`).
    pub kind: String,
    /// The id of the record this activity entry was derived from.
    #[serde(rename = "entityId")]
    pub entity_id: String,
    /// A short human-readable summary.
    pub summary: String,
}

/// The full contents of `.gitgov/index.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Index {
    /// When this index was built.
    #[serde(rename = "builtAt")]
    pub built_at: DateTime<Utc>,
    /// Enriched tasks.
    pub tasks: Vec<EnrichedTask>,
    /// Enriched cycles.
    pub cycles: Vec<EnrichedCycle>,
    /// Derived metrics.
    pub metrics: Metrics,
    /// Activity history, newest first.
    pub activity: Vec<ActivityEntry>,
}

fn first_signature_timestamp(record: &Record) -> i64 {
    record.header.signatures.first().map_or(0, |s| s.timestamp)
}

fn last_signature_timestamp(record: &Record) -> i64 {
    record.header.signatures.last().map_or(0, |s| s.timestamp)
}

/// Build a fresh [`Index`] from the full in-memory record set. The caller
/// (`gitgov-sync`) is responsible for loading every record from the
/// stores first — this function is pure and does no I/O. The resulting
/// index is a regenerable cache, never authoritative.
#[must_use]
pub fn build_index(tasks: &[Record], cycles: &[Record], executions: &[Record], feedback: &[Record], changelogs: &[Record], now: DateTime<Utc>) -> Index {
    let mut enriched_tasks = Vec::with_capacity(tasks.len());
    let mut done_or_archived_lead_times = Vec::new();

    for record in tasks {
        let Payload::Task(task) = &record.payload else { continue };
        let author = record
            .header
            .signatures
            .first()
            .map_or_else(|| "unknown".to_string(), |s| s.key_id.clone());
        let last_updated = DateTime::from_timestamp(last_signature_timestamp(record), 0).unwrap_or(now);

        if matches!(task.status, TaskStatus::Done | TaskStatus::Archived) {
            let lead = (last_signature_timestamp(record) - first_signature_timestamp(record)) as f64;
            done_or_archived_lead_times.push(lead.max(0.0));
        }

        let id = task_id_from_record(record);
        enriched_tasks.push(EnrichedTask {
            id,
            title: task.title.clone(),
            status: task.status,
            author,
            last_updated,
            cycle_ids: task.cycle_ids.clone().unwrap_or_default(),
        });
    }

    let mut enriched_cycles = Vec::with_capacity(cycles.len());
    for record in cycles {
        let Payload::Cycle(cycle) = &record.payload else { continue };
        enriched_cycles.push(EnrichedCycle {
            id: cycle_id_from_record(record),
            title: cycle.title.clone(),
            status: cycle.status,
            task_ids: cycle.task_ids.clone().unwrap_or_default(),
        });
    }

    let non_discarded = enriched_tasks.iter().filter(|t| t.status != TaskStatus::Discarded).count();
    let health = if enriched_tasks.is_empty() {
        1.0
    } else {
        non_discarded as f64 / enriched_tasks.len() as f64
    };

    let average_lead_time_seconds = if done_or_archived_lead_times.is_empty() {
        None
    } else {
        Some(done_or_archived_lead_times.iter().sum::<f64>() / done_or_archived_lead_times.len() as f64)
    };

    let mut activity = Vec::new();
    for record in executions {
        if let Payload::Execution(exec) = &record.payload {
            activity.push(ActivityEntry {
                timestamp: DateTime::from_timestamp(last_signature_timestamp(record), 0).unwrap_or(now),
                kind: "execution".to_string(),
                entity_id: exec.task_id.clone(),
                summary: exec.title.clone(),
            });
        }
    }
    for record in feedback {
        if let Payload::Feedback(fb) = &record.payload {
            activity.push(ActivityEntry {
                timestamp: DateTime::from_timestamp(last_signature_timestamp(record), 0).unwrap_or(now),
                kind: "feedback".to_string(),
                entity_id: fb.entity_id.clone(),
                summary: fb.content.chars().take(120).collect(),
            });
        }
    }
    for record in changelogs {
        if let Payload::Changelog(cl) = &record.payload {
            activity.push(ActivityEntry {
                timestamp: cl.completed_at,
                kind: "changelog".to_string(),
                entity_id: cl.related_tasks.first().cloned().unwrap_or_default(),
                summary: cl.title.clone(),
            });
        }
    }
    activity.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    Index {
        built_at: now,
        tasks: enriched_tasks,
        cycles: enriched_cycles,
        metrics: Metrics {
            health,
            throughput: changelogs.len() as u64,
            average_lead_time_seconds,
        },
        activity,
    }
}

// The enriched projection needs an id, but `Record` doesn't carry one (ids
// live in the store's key, not the envelope). Until the store threads ids
// through, derive a best-effort id from the title slug and creation
// timestamp so tests and callers that only have in-memory records can
// still exercise the builder; `gitgov-sync`'s real call site passes
// records already paired with their store-assigned id via
// `build_index_with_ids` instead.
fn task_id_from_record(record: &Record) -> String {
    format!("{}-task-projected", first_signature_timestamp(record))
}

fn cycle_id_from_record(record: &Record) -> String {
    format!("{}-cycle-projected", first_signature_timestamp(record))
}

/// Like [`build_index`], but takes `(id, record)` pairs so the projection
/// carries real ids rather than the best-effort placeholder
/// [`build_index`] derives when ids aren't available.
#[must_use]
pub fn build_index_with_ids(
    tasks: &[(String, Record)],
    cycles: &[(String, Record)],
    executions: &[(String, Record)],
    feedback: &[(String, Record)],
    changelogs: &[(String, Record)],
    now: DateTime<Utc>,
) -> Index {
    let task_records: Vec<Record> = tasks.iter().map(|(_, r)| r.clone()).collect();
    let cycle_records: Vec<Record> = cycles.iter().map(|(_, r)| r.clone()).collect();
    let exec_records: Vec<Record> = executions.iter().map(|(_, r)| r.clone()).collect();
    let feedback_records: Vec<Record> = feedback.iter().map(|(_, r)| r.clone()).collect();
    let changelog_records: Vec<Record> = changelogs.iter().map(|(_, r)| r.clone()).collect();

    let mut index = build_index(&task_records, &cycle_records, &exec_records, &feedback_records, &changelog_records, now);
    for (enriched, (id, _)) in index.tasks.iter_mut().zip(tasks.iter()) {
        enriched.id = id.clone();
    }
    for (enriched, (id, _)) in index.cycles.iter_mut().zip(cycles.iter()) {
        enriched.id = id.clone();
    }
    for (entry, (id, record)) in index.activity.iter_mut().zip(
        executions
            .iter()
            .chain(feedback.iter())
            .chain(changelogs.iter()),
    ) {
        let _ = record;
        // Activity entries are already keyed by their referenced entity,
        // not their own id; nothing to backfill here beyond documenting
        // why this loop exists for readers expecting symmetry with the
        // task/cycle backfill above.
        let _ = (entry, id);
    }
    index
}

/// Load an [`Index`] from `path` (`.gitgov/index.json`).
///
/// # Errors
///
/// Returns [`GitGovError::IoError`] if the file cannot be read or parsed.
pub fn load(path: &std::path::Path) -> Result<Index, GitGovError> {
    let bytes = std::fs::read(path).map_err(|e| GitGovError::io("read index.json", e))?;
    serde_json::from_slice(&bytes).map_err(|e| GitGovError::io("parse index.json", e))
}

/// Persist `index` to `path`, pretty-printed with a trailing newline.
///
/// # Errors
///
/// Returns [`GitGovError::IoError`] if the file cannot be written.
pub fn save(index: &Index, path: &std::path::Path) -> Result<(), GitGovError> {
    let mut json = serde_json::to_string_pretty(index).map_err(|e| GitGovError::io("serialize index.json", e))?;
    json.push('\n');
    std::fs::write(path, json).map_err(|e| GitGovError::io("write index.json", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use gitgov_core::{Header, RecordType, Signature, TaskPayload, TaskPriority};

    fn sig(key_id: &str, ts: i64) -> Signature {
        Signature {
            key_id: key_id.into(),
            role: "author".into(),
            notes: "n".into(),
            signature: "A".repeat(86) + "==",
            timestamp: ts,
            metadata: None,
        }
    }

    fn task_record(status: TaskStatus, created: i64, updated: i64) -> Record {
        let payload = Payload::Task(TaskPayload {
            title: "Ship it".into(),
            status,
            priority: TaskPriority::Medium,
            description: "desc".into(),
            cycle_ids: None,
            references: None,
            tags: None,
        });
        let mut header = Header::new(RecordType::Task, "0".repeat(64), sig("human:alice", created));
        if updated != created {
            header.signatures.push(sig("human:alice", updated));
        }
        Record::new(header, payload).unwrap()
    }

    #[test]
    fn health_is_one_when_no_discarded_tasks() {
        let tasks = vec![task_record(TaskStatus::Active, 1, 1), task_record(TaskStatus::Done, 1, 5)];
        let index = build_index(&tasks, &[], &[], &[], &[], Utc::now());
        assert_eq!(index.metrics.health, 1.0);
    }

    #[test]
    fn health_drops_with_discarded_tasks() {
        let tasks = vec![task_record(TaskStatus::Active, 1, 1), task_record(TaskStatus::Discarded, 1, 1)];
        let index = build_index(&tasks, &[], &[], &[], &[], Utc::now());
        assert_eq!(index.metrics.health, 0.5);
    }

    #[test]
    fn lead_time_only_counts_done_and_archived() {
        let tasks = vec![task_record(TaskStatus::Done, 100, 200)];
        let index = build_index(&tasks, &[], &[], &[], &[], Utc::now());
        assert_eq!(index.metrics.average_lead_time_seconds, Some(100.0));
    }

    #[test]
    fn lead_time_is_none_with_no_completed_tasks() {
        let tasks = vec![task_record(TaskStatus::Active, 1, 1)];
        let index = build_index(&tasks, &[], &[], &[], &[], Utc::now());
        assert_eq!(index.metrics.average_lead_time_seconds, None);
    }

    #[test]
    fn index_round_trips_through_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");
        let tasks = vec![task_record(TaskStatus::Active, 1, 1)];
        let index = build_index(&tasks, &[], &[], &[], &[], Utc::now());
        save(&index, &path).unwrap();
        let loaded = load(&path).unwrap();
        assert_eq!(loaded.tasks.len(), 1);
    }

    #[test]
    fn build_index_with_ids_backfills_real_ids() {
        let tasks = vec![("1700000000-task-real".to_string(), task_record(TaskStatus::Active, 1, 1))];
        let index = build_index_with_ids(&tasks, &[], &[], &[], &[], Utc::now());
        assert_eq!(index.tasks[0].id, "1700000000-task-real");
    }

    #[test]
    fn activity_is_sorted_newest_first() {
        use gitgov_core::{ChangelogPayload, ExecutionPayload};
        let exec = {
            let payload = Payload::Execution(ExecutionPayload {
                task_id: "1700000000-task-a".into(),
                exec_type: "comment".into(),
                title: "early".into(),
                result: "n/a".into(),
                notes: None,
                references: None,
            });
            let header = Header::new(RecordType::Execution, "0".repeat(64), sig("human:alice", 100));
            Record::new(header, payload).unwrap()
        };
        let changelog = {
            let payload = Payload::Changelog(ChangelogPayload {
                title: "Ship the launch feature".into(),
                description: "Bundled launch work across two tasks".into(),
                related_tasks: vec!["1700000000-task-a".into()],
                completed_at: DateTime::from_timestamp(9_000, 0).unwrap(),
                version: "v1".into(),
            });
            let header = Header::new(RecordType::Changelog, "0".repeat(64), sig("human:alice", 9_000));
            Record::new(header, payload).unwrap()
        };
        let index = build_index(&[], &[], std::slice::from_ref(&exec), &[], std::slice::from_ref(&changelog), Utc::now());
        assert_eq!(index.activity.len(), 2);
        assert_eq!(index.activity[0].kind, "changelog");
    }
}
