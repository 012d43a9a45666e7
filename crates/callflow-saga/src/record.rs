use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use tokio::time::Instant;

use crate::audit::SagaAuditLog;
use crate::context::SagaContext;
use crate::status::SagaStatus;

/// A compensation that returned an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompensationFailure {
    /// Position of the step in the saga definition.
    pub step_index: usize,
    /// Name of the step whose compensation failed.
    pub step: String,
    /// Description of what the compensation was trying to do.
    pub description: String,
    /// Rendered error returned by the compensation.
    pub message: String,
}

/// Mutable state of one saga execution, owned by the registry.
///
/// Only the orchestrator run identified by `execution` mutates a record.
#[derive(Debug, Clone)]
pub(crate) struct SagaRecord {
    pub(crate) id: String,
    pub(crate) execution: u64,
    pub(crate) status: SagaStatus,
    pub(crate) step_names: Vec<String>,
    pub(crate) cursor: usize,
    pub(crate) context: SagaContext,
    pub(crate) compensated_steps: Vec<usize>,
    pub(crate) failed_step: Option<usize>,
    pub(crate) error: Option<String>,
    pub(crate) compensation_failures: Vec<CompensationFailure>,
    pub(crate) audit: SagaAuditLog,
    pub(crate) start_time: Instant,
    pub(crate) started_at: DateTime<Utc>,
}

impl SagaRecord {
    pub(crate) fn new(
        id: String,
        execution: u64,
        step_names: Vec<String>,
        context: SagaContext,
    ) -> Self {
        Self {
            id,
            execution,
            status: SagaStatus::Pending,
            step_names,
            cursor: 0,
            context,
            compensated_steps: Vec::new(),
            failed_step: None,
            error: None,
            compensation_failures: Vec::new(),
            audit: SagaAuditLog::new(),
            start_time: Instant::now(),
            started_at: Utc::now(),
        }
    }

    fn transition(&mut self, next: SagaStatus) {
        debug_assert!(
            self.status.can_transition_to(next),
            "invalid saga transition {} -> {next}",
            self.status
        );
        self.status = next;
    }

    pub(crate) fn start_step(&mut self, index: usize) {
        if self.status == SagaStatus::Pending {
            self.transition(SagaStatus::Running);
        }
        self.cursor = index;
        if let Some(name) = self.step_names.get(index) {
            self.audit.record_start(index, name);
        }
    }

    pub(crate) fn finish_step(
        &mut self,
        index: usize,
        context: &SagaContext,
        compensation_description: String,
    ) {
        self.context.clone_from(context);
        self.audit.record_success(index, compensation_description);
    }

    /// Records the forward failure and enters compensation.
    pub(crate) fn fail_step(
        &mut self,
        index: usize,
        compensation_description: String,
        error: String,
    ) {
        self.failed_step = Some(index);
        self.audit
            .record_failure(index, compensation_description, error.clone());
        self.error = Some(error);
        self.transition(SagaStatus::Compensating);
    }

    pub(crate) fn record_compensated(&mut self, index: usize) {
        debug_assert_eq!(self.status, SagaStatus::Compensating);
        self.compensated_steps.push(index);
        self.audit.record_compensated(index);
    }

    pub(crate) fn record_compensation_failed(&mut self, failure: CompensationFailure) {
        self.audit
            .record_compensation_failed(failure.step_index, failure.message.clone());
        self.compensation_failures.push(failure);
    }

    pub(crate) fn finish_failed(&mut self) {
        self.transition(SagaStatus::Failed);
    }

    pub(crate) fn finish_completed(&mut self) {
        self.cursor = self.step_names.len();
        self.transition(SagaStatus::Completed);
    }

    pub(crate) fn is_evictable(&self, max_age: Duration) -> bool {
        self.status.is_terminal() && self.start_time.elapsed() > max_age
    }

    pub(crate) fn snapshot(&self) -> SagaSnapshot {
        SagaSnapshot {
            id: self.id.clone(),
            status: self.status,
            current_step: self.cursor,
            total_steps: self.step_names.len(),
            compensated_steps: self.compensated_steps.clone(),
            failed_step: self.failed_step,
            error: self.error.clone(),
            compensation_failures: self.compensation_failures.clone(),
            start_time: self.start_time,
            started_at: self.started_at,
            duration: self.start_time.elapsed(),
        }
    }
}

/// Point-in-time view of a saga, as returned by status queries.
#[derive(Debug, Clone, Serialize)]
pub struct SagaSnapshot {
    pub id: String,
    pub status: SagaStatus,
    /// Index of the step executing or last attempted; equals `total_steps`
    /// once the saga completed.
    pub current_step: usize,
    pub total_steps: usize,
    /// Indices whose compensation succeeded, in the order they ran.
    pub compensated_steps: Vec<usize>,
    pub failed_step: Option<usize>,
    /// Rendered forward error of the failed step.
    pub error: Option<String>,
    pub compensation_failures: Vec<CompensationFailure>,
    #[serde(skip)]
    pub start_time: Instant,
    pub started_at: DateTime<Utc>,
    #[serde(rename = "duration_ms", serialize_with = "serialize_millis")]
    pub duration: Duration,
}

impl SagaSnapshot {
    /// Whether every compensation that ran succeeded.
    #[must_use]
    pub fn is_cleanly_compensated(&self) -> bool {
        self.status == SagaStatus::Failed && self.compensation_failures.is_empty()
    }
}

fn serialize_millis<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(steps: &[&str]) -> SagaRecord {
        SagaRecord::new(
            "call-1".to_string(),
            1,
            steps.iter().map(ToString::to_string).collect(),
            SagaContext::new().with("call_id", "call-1"),
        )
    }

    #[test]
    fn new_record_is_pending_at_cursor_zero() {
        let record = record(&["a", "b"]);

        let snapshot = record.snapshot();
        assert_eq!(snapshot.status, SagaStatus::Pending);
        assert_eq!(snapshot.current_step, 0);
        assert_eq!(snapshot.total_steps, 2);
    }

    #[test]
    fn first_step_moves_to_running() {
        let mut record = record(&["a", "b"]);

        record.start_step(0);

        assert_eq!(record.status, SagaStatus::Running);
        assert_eq!(record.audit.records().len(), 1);
    }

    #[test]
    fn completion_moves_cursor_past_last_step() {
        let mut record = record(&["a", "b"]);
        record.start_step(0);
        record.start_step(1);

        record.finish_completed();

        assert_eq!(record.cursor, 2);
        assert_eq!(record.status, SagaStatus::Completed);
    }

    #[test]
    fn failure_path_records_error_and_compensations() {
        let mut record = record(&["a", "b"]);
        record.start_step(0);
        record.finish_step(0, &SagaContext::new(), "undo a".to_string());
        record.start_step(1);
        record.fail_step(1, "undo b".to_string(), "boom".to_string());
        record.record_compensated(1);
        record.record_compensation_failed(CompensationFailure {
            step_index: 0,
            step: "a".to_string(),
            description: "undo a".to_string(),
            message: "still locked".to_string(),
        });
        record.finish_failed();

        let snapshot = record.snapshot();
        assert_eq!(snapshot.status, SagaStatus::Failed);
        assert_eq!(snapshot.current_step, 1);
        assert_eq!(snapshot.failed_step, Some(1));
        assert_eq!(snapshot.error.as_deref(), Some("boom"));
        assert_eq!(snapshot.compensated_steps, vec![1]);
        assert_eq!(snapshot.compensation_failures.len(), 1);
        assert!(!snapshot.is_cleanly_compensated());
    }

    #[test]
    fn non_terminal_record_is_never_evictable() {
        let mut record = record(&["a"]);
        record.start_step(0);

        assert!(!record.is_evictable(Duration::ZERO));
    }

    #[test]
    fn snapshot_serializes_duration_in_millis() {
        let value = serde_json::to_value(record(&["a"]).snapshot()).expect("serialize snapshot");

        assert!(value.get("duration_ms").is_some());
        assert!(value.get("start_time").is_none());
        assert_eq!(value["status"], "pending");
    }
}
