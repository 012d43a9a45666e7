use std::sync::Arc;

use crate::step::{SagaStep, StepHandle};

/// An ordered list of steps ready to be executed by the orchestrator.
///
/// Definitions are cheap to clone: steps are shared handles, so the same
/// definition can back any number of saga executions.
pub struct SagaDefinition<E> {
    steps: Vec<StepHandle<E>>,
}

impl<E: Send> SagaDefinition<E> {
    #[must_use]
    pub fn builder() -> SagaBuilder<E> {
        SagaBuilder::new()
    }

    #[must_use]
    pub fn steps(&self) -> &[StepHandle<E>] {
        &self.steps
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    #[must_use]
    pub fn step_names(&self) -> Vec<String> {
        self.steps.iter().map(|step| step.name().to_string()).collect()
    }
}

impl<E> Clone for SagaDefinition<E> {
    fn clone(&self) -> Self {
        Self {
            steps: self.steps.clone(),
        }
    }
}

impl<E> Default for SagaDefinition<E> {
    fn default() -> Self {
        Self { steps: Vec::new() }
    }
}

impl<E> From<Vec<StepHandle<E>>> for SagaDefinition<E> {
    fn from(steps: Vec<StepHandle<E>>) -> Self {
        Self { steps }
    }
}

/// Builder for [`SagaDefinition`].
///
/// Steps run in the order they are added and are compensated in reverse.
pub struct SagaBuilder<E> {
    steps: Vec<StepHandle<E>>,
}

impl<E> SagaBuilder<E> {
    #[must_use]
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    /// Append a step.
    #[must_use]
    pub fn step<S>(mut self, step: S) -> Self
    where
        S: SagaStep<Error = E> + 'static,
    {
        self.steps.push(Arc::new(step));
        self
    }

    /// Append a step that is already shared with other definitions.
    #[must_use]
    pub fn step_handle(mut self, step: StepHandle<E>) -> Self {
        self.steps.push(step);
        self
    }

    #[must_use]
    pub fn build(self) -> SagaDefinition<E> {
        SagaDefinition { steps: self.steps }
    }
}

impl<E> Default for SagaBuilder<E> {
    fn default() -> Self {
        Self::new()
    }
}
