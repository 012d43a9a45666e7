use std::fmt::Write as _;

use callflow_saga::{SagaAuditLog, SagaContext, SagaSnapshot, SagaStatus};
use clap::ValueEnum;
use serde::Serialize;

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub(crate) enum OutputFormat {
    #[default]
    Plain,
    Json,
}

#[derive(Serialize)]
struct AuditEntry<'a> {
    index: usize,
    name: &'a str,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
}

#[derive(Serialize)]
struct Report<'a> {
    snapshot: &'a SagaSnapshot,
    context: &'a SagaContext,
    audit: Vec<AuditEntry<'a>>,
}

pub(crate) fn render(
    format: OutputFormat,
    snapshot: &SagaSnapshot,
    context: &SagaContext,
    audit: &SagaAuditLog,
) -> Result<String> {
    match format {
        OutputFormat::Plain => Ok(render_plain(snapshot, context, audit)),
        OutputFormat::Json => render_json(snapshot, context, audit),
    }
}

fn render_json(
    snapshot: &SagaSnapshot,
    context: &SagaContext,
    audit: &SagaAuditLog,
) -> Result<String> {
    let report = Report {
        snapshot,
        context,
        audit: audit
            .records()
            .iter()
            .map(|record| AuditEntry {
                index: record.index,
                name: &record.name,
                status: record.status.as_str(),
                error: record.error.as_deref(),
            })
            .collect(),
    };
    Ok(serde_json::to_string_pretty(&report)?)
}

fn render_plain(snapshot: &SagaSnapshot, context: &SagaContext, audit: &SagaAuditLog) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "saga {}: {}", snapshot.id, snapshot.status);
    let _ = writeln!(
        out,
        "steps: {}/{}",
        snapshot.current_step.min(snapshot.total_steps),
        snapshot.total_steps
    );
    if snapshot.status == SagaStatus::Failed {
        if let Some(error) = &snapshot.error {
            let _ = writeln!(out, "error: {error}");
        }
        let compensated: Vec<String> = snapshot
            .compensated_steps
            .iter()
            .map(ToString::to_string)
            .collect();
        let _ = writeln!(out, "compensated steps: [{}]", compensated.join(", "));
        for failure in &snapshot.compensation_failures {
            let _ = writeln!(
                out,
                "compensation failed: {} ({}): {}",
                failure.step, failure.description, failure.message
            );
        }
    }
    let _ = writeln!(out, "duration: {}ms", snapshot.duration.as_millis());

    if !audit.records().is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", audit.summary());
    }

    if !context.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "context:");
        for (key, value) in context {
            let _ = writeln!(out, "  {key} = {value}");
        }
    }
    out.trim_end().to_string()
}
