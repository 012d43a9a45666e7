use std::path::Path;

use callflow_saga::{OrchestratorConfig, SagaOrchestrator};
use tracing::info;

use crate::error::{CliError, Result};
use crate::output::{self, OutputFormat};
use crate::plan::SagaPlan;

pub(super) async fn run(
    path: &Path,
    format: OutputFormat,
    config: OrchestratorConfig,
) -> Result<()> {
    let plan = SagaPlan::load(path)?;
    let orchestrator = SagaOrchestrator::new(config);
    let definition = plan.definition();

    info!(saga_id = %plan.id, steps = definition.len(), "running plan");
    let result = orchestrator
        .execute_saga(plan.id.clone(), &definition, plan.context.clone())
        .await;

    let snapshot = orchestrator
        .get_saga_status(&plan.id)
        .ok_or_else(|| CliError::MissingSaga(plan.id.clone()))?;
    let context = match &result {
        Ok(context) => context.clone(),
        Err(_) => orchestrator.saga_context(&plan.id).unwrap_or_default(),
    };
    let audit = orchestrator.saga_audit(&plan.id).unwrap_or_default();

    println!("{}", output::render(format, &snapshot, &context, &audit)?);

    result.map(|_| ()).map_err(|source| CliError::SagaFailed {
        id: plan.id,
        source,
    })
}
