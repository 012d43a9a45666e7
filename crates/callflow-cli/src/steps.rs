use std::time::Duration;

use async_trait::async_trait;
use callflow_saga::{SagaContext, SagaStep};
use thiserror::Error;
use tracing::debug;

use crate::plan::PlannedStep;

/// Error reported by a simulated service call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{step}: {message}")]
pub struct StepFailure {
    pub step: String,
    pub message: String,
}

/// Stands in for a call to one of the analysis services. Waits for the
/// configured delay, then succeeds with the planned output or fails with
/// the planned message.
pub(crate) struct SimulatedStep {
    planned: PlannedStep,
}

impl SimulatedStep {
    pub(crate) fn new(planned: PlannedStep) -> Self {
        Self { planned }
    }

    async fn simulate_latency(&self) {
        if self.planned.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.planned.delay_ms)).await;
        }
    }

    fn failure(&self, message: &str) -> StepFailure {
        StepFailure {
            step: self.planned.name.clone(),
            message: message.to_string(),
        }
    }
}

#[async_trait]
impl SagaStep for SimulatedStep {
    type Error = StepFailure;

    fn name(&self) -> &str {
        &self.planned.name
    }

    async fn forward(&self, context: &SagaContext) -> Result<SagaContext, StepFailure> {
        debug!(step = %self.planned.name, context_keys = context.len(), "calling service");
        self.simulate_latency().await;
        match &self.planned.fail {
            Some(message) => Err(self.failure(message)),
            None => Ok(self.planned.output.clone()),
        }
    }

    async fn compensate(&self, _context: &SagaContext) -> Result<(), StepFailure> {
        self.simulate_latency().await;
        match &self.planned.compensation_fail {
            Some(message) => Err(self.failure(message)),
            None => Ok(()),
        }
    }

    fn compensation_description(&self) -> String {
        format!("roll back {}", self.planned.name)
    }
}
