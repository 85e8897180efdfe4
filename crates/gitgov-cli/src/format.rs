// SPDX-License-Identifier: MIT OR Apache-2.0
//! Output formatting for the `gitgov` CLI.

use std::fmt;
use std::str::FromStr;

use gitgov_core::{Payload, Record};
use gitgov_error::ErrorEnvelope;
use gitgov_init::InitOutcome;
use gitgov_lint::Report;
use gitgov_projection::Index;

use crate::commands::TaskContext;

/// Supported output formats for CLI display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputFormat {
    /// Compact JSON (single line).
    Json,
    /// Pretty-printed JSON.
    JsonPretty,
    /// Human-readable multi-line text.
    Text,
    /// Single-line summary.
    Compact,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Json => "json",
            Self::JsonPretty => "json-pretty",
            Self::Text => "text",
            Self::Compact => "compact",
        };
        f.write_str(s)
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "json-pretty" | "json_pretty" | "jsonpretty" => Ok(Self::JsonPretty),
            "text" => Ok(Self::Text),
            "compact" => Ok(Self::Compact),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}

/// Formats GitGovernance domain types for CLI output.
#[derive(Debug, Clone)]
pub struct Formatter {
    format: OutputFormat,
}

impl Formatter {
    /// Create a new formatter with the given output format.
    #[must_use]
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Format a record's id together with its payload.
    #[must_use]
    pub fn format_record(&self, id: &str, record: &Record) -> String {
        match &self.format {
            OutputFormat::Json => serde_json::to_string(&envelope(id, record)).unwrap_or_default(),
            OutputFormat::JsonPretty => serde_json::to_string_pretty(&envelope(id, record)).unwrap_or_default(),
            OutputFormat::Text => format_record_text(id, record),
            OutputFormat::Compact => format_record_compact(id, record),
        }
    }

    /// Format an [`InitOutcome`].
    #[must_use]
    pub fn format_init_outcome(&self, outcome: &InitOutcome) -> String {
        match &self.format {
            OutputFormat::Json => serde_json::to_string(&init_outcome_json(outcome)).unwrap_or_default(),
            OutputFormat::JsonPretty => serde_json::to_string_pretty(&init_outcome_json(outcome)).unwrap_or_default(),
            OutputFormat::Text | OutputFormat::Compact => format!(
                "worktree: {}\nproject: {}\nroot cycle: {}\n{}",
                outcome.worktree_path.display(),
                outcome.config.project_name,
                outcome.config.root_cycle,
                if outcome.already_initialized { "(already initialized)" } else { "(newly initialized)" },
            ),
        }
    }

    /// Format a lint [`Report`].
    #[must_use]
    pub fn format_report(&self, report: &Report) -> String {
        match &self.format {
            OutputFormat::Json => serde_json::to_string(report).unwrap_or_default(),
            OutputFormat::JsonPretty => serde_json::to_string_pretty(report).unwrap_or_default(),
            OutputFormat::Text => format_report_text(report),
            OutputFormat::Compact => format!(
                "[lint] files={} errors={} warnings={} fixable={}",
                report.summary.files_checked, report.summary.errors, report.summary.warnings, report.summary.fixable,
            ),
        }
    }

    /// Format a projection [`Index`].
    #[must_use]
    pub fn format_index(&self, index: &Index) -> String {
        match &self.format {
            OutputFormat::Json => serde_json::to_string(index).unwrap_or_default(),
            OutputFormat::JsonPretty => serde_json::to_string_pretty(index).unwrap_or_default(),
            OutputFormat::Text => format_index_text(index),
            OutputFormat::Compact => format!(
                "[status] tasks={} cycles={} health={:.0}% throughput={}",
                index.tasks.len(),
                index.cycles.len(),
                index.metrics.health * 100.0,
                index.metrics.throughput,
            ),
        }
    }

    /// Format a [`TaskContext`].
    #[must_use]
    pub fn format_task_context(&self, ctx: &TaskContext) -> String {
        match &self.format {
            OutputFormat::Json => serde_json::to_string(ctx).unwrap_or_default(),
            OutputFormat::JsonPretty => serde_json::to_string_pretty(ctx).unwrap_or_default(),
            OutputFormat::Text => format_task_context_text(ctx),
            OutputFormat::Compact => format!("[{}] {} ({:?}) activity={}", ctx.task.id, ctx.task.title, ctx.task.status, ctx.activity.len()),
        }
    }

    /// Format an [`ErrorEnvelope`].
    #[must_use]
    pub fn format_error(&self, envelope: &ErrorEnvelope) -> String {
        match &self.format {
            OutputFormat::Json => serde_json::to_string(envelope).unwrap_or_default(),
            OutputFormat::JsonPretty => serde_json::to_string_pretty(envelope).unwrap_or_default(),
            OutputFormat::Text => format!("error ({}): {}", envelope.error.kind, envelope.error.message),
            OutputFormat::Compact => format!("[error:{}] {}", envelope.error.kind, envelope.error.message),
        }
    }
}

fn envelope(id: &str, record: &Record) -> serde_json::Value {
    serde_json::json!({ "id": id, "record": record })
}

fn payload_kind(record: &Record) -> &'static str {
    match &record.payload {
        Payload::Actor(_) => "actor",
        Payload::Agent(_) => "agent",
        Payload::Cycle(_) => "cycle",
        Payload::Task(_) => "task",
        Payload::Execution(_) => "execution",
        Payload::Feedback(_) => "feedback",
        Payload::Changelog(_) => "changelog",
    }
}

fn payload_title(record: &Record) -> String {
    match &record.payload {
        Payload::Actor(a) => a.display_name.clone(),
        Payload::Agent(_) => "(agent manifest)".to_string(),
        Payload::Cycle(c) => c.title.clone(),
        Payload::Task(t) => t.title.clone(),
        Payload::Execution(e) => e.title.clone(),
        Payload::Feedback(f) => f.content.clone(),
        Payload::Changelog(c) => c.title.clone(),
    }
}

fn format_record_text(id: &str, record: &Record) -> String {
    format!(
        "id: {id}\ntype: {}\ntitle: {}\nsignatures: {}",
        payload_kind(record),
        payload_title(record),
        record.header.signatures.len(),
    )
}

fn format_record_compact(id: &str, record: &Record) -> String {
    format!("[{}] {id} {}", payload_kind(record), payload_title(record))
}

fn format_report_text(report: &Report) -> String {
    let mut lines = vec![format!(
        "files checked: {}  errors: {}  warnings: {}  fixable: {}  ({}ms)",
        report.summary.files_checked, report.summary.errors, report.summary.warnings, report.summary.fixable, report.summary.execution_time_ms,
    )];
    for finding in &report.results {
        lines.push(format!(
            "  [{:?}] {} {}/{}: {}",
            finding.level,
            finding.validator,
            finding.entity.entity_type,
            finding.entity.id,
            finding.message,
        ));
    }
    lines.join("\n")
}

fn format_index_text(index: &Index) -> String {
    let mut lines = vec![format!(
        "tasks: {}  cycles: {}  health: {:.0}%  throughput: {}",
        index.tasks.len(),
        index.cycles.len(),
        index.metrics.health * 100.0,
        index.metrics.throughput,
    )];
    for task in &index.tasks {
        lines.push(format!("  {:<28} {:<10?} {}", task.id, task.status, task.title));
    }
    lines.join("\n")
}

fn format_task_context_text(ctx: &TaskContext) -> String {
    let mut lines = vec![format!("{} [{:?}] {}", ctx.task.id, ctx.task.status, ctx.task.title)];
    lines.push(format!("author: {}  cycles: {}", ctx.task.author, ctx.task.cycle_ids.join(", ")));
    for entry in &ctx.activity {
        lines.push(format!("  {} {}: {}", entry.timestamp.format("%Y-%m-%d %H:%M:%S"), entry.kind, entry.summary));
    }
    lines.join("\n")
}

fn init_outcome_json(outcome: &InitOutcome) -> serde_json::Value {
    serde_json::json!({
        "worktreePath": outcome.worktree_path,
        "alreadyInitialized": outcome.already_initialized,
        "bootstrapActorId": outcome.bootstrap_actor_id,
        "config": outcome.config,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_format_display_roundtrips() {
        for fmt in &[OutputFormat::Json, OutputFormat::JsonPretty, OutputFormat::Text, OutputFormat::Compact] {
            let s = fmt.to_string();
            let parsed: OutputFormat = s.parse().unwrap();
            assert_eq!(&parsed, fmt);
        }
    }

    #[test]
    fn output_format_from_str_rejects_unknown() {
        assert!("nope".parse::<OutputFormat>().is_err());
    }
}
