use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::audit::SagaAuditLog;
use crate::config::{OrchestratorConfig, hours_to_duration};
use crate::context::SagaContext;
use crate::definition::SagaDefinition;
use crate::error::ConfigError;
use crate::record::{CompensationFailure, SagaRecord, SagaSnapshot};
use crate::registry::SagaRegistry;

/// Executes sagas against a shared [`SagaRegistry`].
///
/// Cloning yields another handle to the same registry and configuration,
/// so one orchestrator can be shared by every task that submits or
/// inspects sagas.
#[derive(Debug, Clone, Default)]
pub struct SagaOrchestrator {
    registry: SagaRegistry,
    config: Arc<OrchestratorConfig>,
}

/// Identifies the record one execution is allowed to mutate.
struct Execution<'a> {
    id: &'a str,
    token: u64,
}

impl SagaOrchestrator {
    #[must_use]
    pub fn new(config: OrchestratorConfig) -> Self {
        Self::with_registry(SagaRegistry::new(), config)
    }

    /// Create an orchestrator over an existing registry.
    #[must_use]
    pub fn with_registry(registry: SagaRegistry, config: OrchestratorConfig) -> Self {
        Self {
            registry,
            config: Arc::new(config),
        }
    }

    #[must_use]
    pub fn registry(&self) -> &SagaRegistry {
        &self.registry
    }

    #[must_use]
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Execute a saga, returning the merged context on success.
    ///
    /// Steps run strictly in order; each step's output is merged into the
    /// context before the next step starts. When a forward action fails,
    /// compensations run in reverse order (see
    /// [`CompensationScope`](crate::CompensationScope)) and the original
    /// error is returned once they have all been attempted.
    ///
    /// Re-using the id of an existing saga replaces its record.
    ///
    /// # Errors
    ///
    /// Returns the error of the first forward action that failed, unchanged.
    pub async fn execute_saga<E>(
        &self,
        id: impl Into<String>,
        saga: &SagaDefinition<E>,
        initial_context: SagaContext,
    ) -> Result<SagaContext, E>
    where
        E: Display + Send + 'static,
    {
        let id = id.into();
        let span = info_span!("saga", saga_id = %id, total_steps = saga.len());
        self.run(&id, saga, initial_context).instrument(span).await
    }

    async fn run<E>(
        &self,
        id: &str,
        saga: &SagaDefinition<E>,
        initial_context: SagaContext,
    ) -> Result<SagaContext, E>
    where
        E: Display + Send + 'static,
    {
        let (token, replaced) = self
            .registry
            .create(id, saga.step_names(), initial_context.clone());
        if replaced {
            warn!("replaced existing saga record with the same id");
        }
        let execution = Execution { id, token };
        info!("saga started");

        let mut context = initial_context;

        for (index, step) in saga.steps().iter().enumerate() {
            self.record(&execution, |record| record.start_step(index));
            debug!(step = step.name(), index, "executing step");

            match step.forward(&context).await {
                Ok(patch) => {
                    debug!(step = step.name(), index, keys = patch.len(), "step completed");
                    context.merge(patch);
                    let description = step.compensation_description();
                    self.record(&execution, |record| {
                        record.finish_step(index, &context, description);
                    });
                }
                Err(err) => {
                    warn!(step = step.name(), index, error = %err, "step failed, compensating");
                    let description = step.compensation_description();
                    let message = err.to_string();
                    self.record(&execution, |record| {
                        record.fail_step(index, description, message);
                    });

                    self.compensate(&execution, saga, index, &context).await;

                    self.record(&execution, SagaRecord::finish_failed);
                    info!(failed_step = index, "saga failed");
                    return Err(err);
                }
            }
        }

        self.record(&execution, SagaRecord::finish_completed);
        info!("saga completed");
        Ok(context)
    }

    /// Best-effort rollback, newest step first. Never fails: compensation
    /// errors are logged and recorded, then the next step is compensated.
    async fn compensate<E>(
        &self,
        execution: &Execution<'_>,
        saga: &SagaDefinition<E>,
        failed_index: usize,
        context: &SagaContext,
    ) where
        E: Display + Send + 'static,
    {
        let Some(upper) = self.config.compensation_scope().upper_bound(failed_index) else {
            debug!("no steps to compensate");
            return;
        };

        for (index, step) in saga.steps()[..=upper].iter().enumerate().rev() {
            match step.compensate(context).await {
                Ok(()) => {
                    debug!(step = step.name(), index, "step compensated");
                    self.record(execution, |record| record.record_compensated(index));
                }
                Err(err) => {
                    let description = step.compensation_description();
                    error!(
                        step = step.name(),
                        index,
                        compensation = %description,
                        error = %err,
                        "compensation failed"
                    );
                    let failure = CompensationFailure {
                        step_index: index,
                        step: step.name().to_string(),
                        description,
                        message: err.to_string(),
                    };
                    self.record(execution, |record| record.record_compensation_failed(failure));
                }
            }
        }
    }

    fn record<F>(&self, execution: &Execution<'_>, f: F)
    where
        F: FnOnce(&mut SagaRecord),
    {
        if !self.registry.update(execution.id, execution.token, f) {
            debug!("saga record no longer owned by this execution");
        }
    }

    /// Snapshot of one saga, or `None` if the id is unknown.
    #[must_use]
    pub fn get_saga_status(&self, id: &str) -> Option<SagaSnapshot> {
        self.registry.snapshot(id)
    }

    /// Snapshots of every saga in the registry, in unspecified order.
    #[must_use]
    pub fn get_all_sagas(&self) -> Vec<SagaSnapshot> {
        self.registry.snapshots()
    }

    #[must_use]
    pub fn saga_audit(&self, id: &str) -> Option<SagaAuditLog> {
        self.registry.audit(id)
    }

    #[must_use]
    pub fn saga_context(&self, id: &str) -> Option<SagaContext> {
        self.registry.context(id)
    }

    /// Evict completed and failed sagas that started more than `max_age`
    /// ago. Returns the number of evicted sagas.
    pub fn cleanup_completed_sagas(&self, max_age: Duration) -> usize {
        let evicted = self.registry.evict_terminal_older_than(max_age);
        if !evicted.is_empty() {
            info!(count = evicted.len(), sagas = ?evicted, "evicted finished sagas");
        }
        evicted.len()
    }

    /// [`SagaOrchestrator::cleanup_completed_sagas`] with the age in hours.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidRetention` for negative or non-finite hours.
    pub fn cleanup_completed_sagas_hours(&self, max_age_hours: f64) -> Result<usize, ConfigError> {
        let max_age = hours_to_duration(max_age_hours)?;
        Ok(self.cleanup_completed_sagas(max_age))
    }
}
