use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use callflow_saga::{SagaContext, SagaDefinition, StepHandle};
use serde::Deserialize;

use crate::error::{CliError, Result};
use crate::steps::{SimulatedStep, StepFailure};

/// A saga described in TOML: an id, an initial context and the simulated
/// service calls to make.
///
/// ```toml
/// id = "call-0001"
///
/// [context]
/// call_id = "0001"
///
/// [[steps]]
/// name = "preprocess_audio"
/// delay_ms = 20
/// output = { audio_path = "/data/0001.wav" }
///
/// [[steps]]
/// name = "transcribe"
/// fail = "speech recognition unavailable"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct SagaPlan {
    pub(crate) id: String,
    #[serde(default)]
    pub(crate) context: SagaContext,
    #[serde(default)]
    pub(crate) steps: Vec<PlannedStep>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct PlannedStep {
    pub(crate) name: String,
    /// Keys merged into the saga context when the step succeeds.
    #[serde(default)]
    pub(crate) output: SagaContext,
    #[serde(default)]
    pub(crate) delay_ms: u64,
    /// Makes the forward action fail with this message.
    #[serde(default)]
    pub(crate) fail: Option<String>,
    /// Makes the compensation fail with this message.
    #[serde(default)]
    pub(crate) compensation_fail: Option<String>,
}

impl SagaPlan {
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| CliError::ReadPlan {
            path: path.to_path_buf(),
            source,
        })?;
        let plan: Self = toml::from_str(&content).map_err(|source| CliError::ParsePlan {
            path: path.to_path_buf(),
            source,
        })?;
        plan.validate()?;
        Ok(plan)
    }

    fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(CliError::InvalidPlan("saga id must not be empty".to_string()));
        }
        for (index, step) in self.steps.iter().enumerate() {
            if step.name.trim().is_empty() {
                return Err(CliError::InvalidPlan(format!(
                    "step {} has an empty name",
                    index + 1
                )));
            }
        }
        Ok(())
    }

    /// Names used by more than one step. Legal, but usually a mistake.
    pub(crate) fn duplicate_step_names(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        let mut duplicates = Vec::new();
        for step in &self.steps {
            if !seen.insert(step.name.as_str()) && !duplicates.contains(&step.name.as_str()) {
                duplicates.push(step.name.as_str());
            }
        }
        duplicates
    }

    pub(crate) fn definition(&self) -> SagaDefinition<StepFailure> {
        self.steps
            .iter()
            .map(|step| Arc::new(SimulatedStep::new(step.clone())) as StepHandle<StepFailure>)
            .collect::<Vec<_>>()
            .into()
    }
}
