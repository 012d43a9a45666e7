use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;

use crate::context::SagaContext;

/// A step in a saga that can be executed and compensated.
///
/// The forward action reads the accumulated context and returns a partial
/// context to merge into it. It must not touch shared state outside the
/// returned mapping; the orchestrator never retries it.
///
/// Compensation is offered to steps whose forward action ran for the same
/// saga instance. It receives the context as of the failure point. A failed
/// compensation is logged and recorded but never stops the rollback of
/// earlier steps.
#[async_trait]
pub trait SagaStep: Send + Sync {
    /// Error type for forward and compensation failures.
    type Error: Send;

    /// Human-readable name for logging and status reporting.
    fn name(&self) -> &str;

    /// Execute the step, producing new or updated context keys.
    ///
    /// # Errors
    ///
    /// Returns an error if the step fails. The error is handed back unchanged
    /// to the caller of the saga once compensation has finished.
    async fn forward(&self, context: &SagaContext) -> Result<SagaContext, Self::Error>;

    /// Compensate (undo) the step's effects.
    ///
    /// The default implementation is a no-op, suitable for read-only steps.
    ///
    /// # Errors
    ///
    /// Returns an error if compensation fails.
    async fn compensate(&self, context: &SagaContext) -> Result<(), Self::Error> {
        let _ = context;
        Ok(())
    }

    /// Human-readable description of what compensation will do.
    fn compensation_description(&self) -> String {
        format!("undo {}", self.name())
    }
}

/// Shared handle to a step. Steps belong to the saga definition that the
/// caller supplies, never to the registry.
pub type StepHandle<E> = Arc<dyn SagaStep<Error = E>>;

type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;
type ForwardFn<E> = Box<dyn Fn(SagaContext) -> BoxFuture<Result<SagaContext, E>> + Send + Sync>;
type CompensateFn<E> = Box<dyn Fn(SagaContext) -> BoxFuture<Result<(), E>> + Send + Sync>;

/// A step assembled from closures.
///
/// ```
/// use callflow_saga::{FnStep, SagaContext};
///
/// let step = FnStep::<std::io::Error>::new("transcribe", |ctx: SagaContext| async move {
///     let call = ctx.get("call_id").cloned().unwrap_or_default();
///     Ok(SagaContext::new().with("transcript_for", call))
/// })
/// .with_compensation(|_ctx| async { Ok(()) });
/// # let _ = step;
/// ```
pub struct FnStep<E> {
    name: String,
    forward: ForwardFn<E>,
    compensate: Option<CompensateFn<E>>,
}

impl<E: 'static> FnStep<E> {
    pub fn new<F, Fut>(name: impl Into<String>, forward: F) -> Self
    where
        F: Fn(SagaContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<SagaContext, E>> + Send + 'static,
    {
        Self {
            name: name.into(),
            forward: Box::new(move |ctx| Box::pin(forward(ctx))),
            compensate: None,
        }
    }

    #[must_use]
    pub fn with_compensation<F, Fut>(mut self, compensate: F) -> Self
    where
        F: Fn(SagaContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
    {
        self.compensate = Some(Box::new(move |ctx| Box::pin(compensate(ctx))));
        self
    }
}

#[async_trait]
impl<E: Send + 'static> SagaStep for FnStep<E> {
    type Error = E;

    fn name(&self) -> &str {
        &self.name
    }

    async fn forward(&self, context: &SagaContext) -> Result<SagaContext, E> {
        (self.forward)(context.clone()).await
    }

    async fn compensate(&self, context: &SagaContext) -> Result<(), E> {
        match &self.compensate {
            Some(compensate) => compensate(context.clone()).await,
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[derive(Debug, PartialEq)]
    struct TestError(String);

    struct ReadOnlyStep;

    #[async_trait]
    impl SagaStep for ReadOnlyStep {
        type Error = TestError;

        fn name(&self) -> &str {
            "read_only"
        }

        async fn forward(&self, _context: &SagaContext) -> Result<SagaContext, TestError> {
            Ok(SagaContext::new())
        }
    }

    #[tokio::test]
    async fn default_compensation_is_noop() {
        let step = ReadOnlyStep;

        assert_eq!(step.compensate(&SagaContext::new()).await, Ok(()));
        assert_eq!(step.compensation_description(), "undo read_only");
    }

    #[tokio::test]
    async fn fn_step_forward_sees_context() {
        let step = FnStep::<TestError>::new("double", |ctx: SagaContext| async move {
            let n = ctx.get("n").and_then(serde_json::Value::as_i64).unwrap_or(0);
            Ok(SagaContext::new().with("n", n * 2))
        });

        let out = step
            .forward(&SagaContext::new().with("n", 21))
            .await
            .expect("forward should succeed");

        assert_eq!(step.name(), "double");
        assert_eq!(out.get("n"), Some(&json!(42)));
    }

    #[tokio::test]
    async fn fn_step_without_compensation_succeeds() {
        let step = FnStep::<TestError>::new("noop", |_ctx| async { Ok(SagaContext::new()) });

        assert_eq!(step.compensate(&SagaContext::new()).await, Ok(()));
    }

    #[tokio::test]
    async fn fn_step_propagates_compensation_error() {
        let step = FnStep::new("flaky", |_ctx| async { Ok(SagaContext::new()) })
            .with_compensation(|_ctx| async { Err(TestError("rollback refused".to_string())) });

        let result = step.compensate(&SagaContext::new()).await;

        assert_eq!(result, Err(TestError("rollback refused".to_string())));
    }
}
