use tokio::time::Instant;

/// Status of a step in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum StepStatus {
    /// Forward action is in progress.
    Running,
    /// Forward action succeeded.
    Executed,
    /// Forward action failed.
    Failed,
    /// Compensation succeeded.
    Compensated,
    /// Compensation failed.
    CompensationFailed,
}

impl StepStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Executed => "executed",
            Self::Failed => "failed",
            Self::Compensated => "compensated",
            Self::CompensationFailed => "compensation_failed",
        }
    }
}

/// Record of one step's progress through a saga.
#[derive(Debug, Clone)]
pub struct StepRecord {
    /// Position of the step in the saga definition.
    pub index: usize,
    /// Name of the step.
    pub name: String,
    /// Current status.
    pub status: StepStatus,
    /// When the forward action started.
    pub started_at: Instant,
    /// When the step last changed state (execution or compensation).
    pub completed_at: Option<Instant>,
    /// Description of compensation, set once the forward action has run.
    pub compensation_description: Option<String>,
    /// Error message from the forward action or compensation, if any.
    pub error: Option<String>,
}

/// Audit log tracking every step execution and compensation of one saga.
#[derive(Debug, Clone, Default)]
pub struct SagaAuditLog {
    records: Vec<StepRecord>,
}

impl SagaAuditLog {
    /// Create a new empty audit log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_start(&mut self, index: usize, name: &str) {
        self.records.push(StepRecord {
            index,
            name: name.to_string(),
            status: StepStatus::Running,
            started_at: Instant::now(),
            completed_at: None,
            compensation_description: None,
            error: None,
        });
    }

    pub(crate) fn record_success(&mut self, index: usize, compensation_description: String) {
        if let Some(record) = self.find_mut(index) {
            record.status = StepStatus::Executed;
            record.completed_at = Some(Instant::now());
            record.compensation_description = Some(compensation_description);
        }
    }

    /// The failing step is still offered compensation, so it gets a
    /// description too.
    pub(crate) fn record_failure(
        &mut self,
        index: usize,
        compensation_description: String,
        error: String,
    ) {
        if let Some(record) = self.find_mut(index) {
            record.status = StepStatus::Failed;
            record.completed_at = Some(Instant::now());
            record.compensation_description = Some(compensation_description);
            record.error = Some(error);
        }
    }

    pub(crate) fn record_compensated(&mut self, index: usize) {
        if let Some(record) = self.find_mut(index) {
            record.status = StepStatus::Compensated;
            record.completed_at = Some(Instant::now());
        }
    }

    pub(crate) fn record_compensation_failed(&mut self, index: usize, error: String) {
        if let Some(record) = self.find_mut(index) {
            record.status = StepStatus::CompensationFailed;
            record.completed_at = Some(Instant::now());
            record.error = Some(error);
        }
    }

    fn find_mut(&mut self, index: usize) -> Option<&mut StepRecord> {
        self.records.iter_mut().find(|record| record.index == index)
    }

    /// Get all records in the audit log, in execution order.
    #[must_use]
    pub fn records(&self) -> &[StepRecord] {
        &self.records
    }

    /// Get a summary of the saga execution for display.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut lines = Vec::new();
        for record in &self.records {
            let status = match record.status {
                StepStatus::Running => "…",
                StepStatus::Executed => "✓",
                StepStatus::Failed => "✗",
                StepStatus::Compensated => "↩",
                StepStatus::CompensationFailed => "⚠",
            };
            match &record.error {
                Some(error) => lines.push(format!("{status} {} ({error})", record.name)),
                None => lines.push(format!("{status} {}", record.name)),
            }
        }
        lines.join("\n")
    }
}
