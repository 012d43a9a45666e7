//! Integration tests for evicting finished sagas from the registry.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use callflow_saga::{
    OrchestratorConfig, SagaContext, SagaDefinition, SagaOrchestrator, SagaStatus, SagaStep,
    spawn_reaper,
};
use tokio::sync::Notify;

const HOUR: Duration = Duration::from_secs(3600);

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct TestError(String);

struct Outcome(bool);

#[async_trait]
impl SagaStep for Outcome {
    type Error = TestError;

    fn name(&self) -> &str {
        "outcome"
    }

    async fn forward(&self, _context: &SagaContext) -> Result<SagaContext, TestError> {
        if self.0 {
            Ok(SagaContext::new())
        } else {
            Err(TestError("rejected".to_string()))
        }
    }
}

/// Never finishes until released, keeping its saga non-terminal.
struct Stuck(Arc<Notify>);

#[async_trait]
impl SagaStep for Stuck {
    type Error = TestError;

    fn name(&self) -> &str {
        "stuck"
    }

    async fn forward(&self, _context: &SagaContext) -> Result<SagaContext, TestError> {
        self.0.notified().await;
        Ok(SagaContext::new())
    }
}

async fn run(orchestrator: &SagaOrchestrator, id: &str, succeed: bool) {
    let saga = SagaDefinition::builder().step(Outcome(succeed)).build();
    let _ = orchestrator.execute_saga(id, &saga, SagaContext::new()).await;
}

#[tokio::test(start_paused = true)]
async fn evicts_old_terminal_sagas_only() {
    let orchestrator = SagaOrchestrator::default();
    let release = Arc::new(Notify::new());

    run(&orchestrator, "old-completed", true).await;
    run(&orchestrator, "old-failed", false).await;
    let stuck = tokio::spawn({
        let orchestrator = orchestrator.clone();
        let saga = SagaDefinition::builder()
            .step(Stuck(Arc::clone(&release)))
            .build();
        async move {
            orchestrator
                .execute_saga("old-running", &saga, SagaContext::new())
                .await
        }
    });
    tokio::task::yield_now().await;

    tokio::time::advance(3 * HOUR).await;
    run(&orchestrator, "fresh-completed", true).await;

    let evicted = orchestrator.cleanup_completed_sagas(2 * HOUR);

    assert_eq!(evicted, 2);
    assert!(orchestrator.get_saga_status("old-completed").is_none());
    assert!(orchestrator.get_saga_status("old-failed").is_none());
    assert_eq!(
        orchestrator
            .get_saga_status("old-running")
            .map(|s| s.status),
        Some(SagaStatus::Running)
    );
    assert!(orchestrator.get_saga_status("fresh-completed").is_some());

    release.notify_one();
    let _ = stuck.await;
}

#[tokio::test(start_paused = true)]
async fn age_equal_to_limit_is_kept() {
    let orchestrator = SagaOrchestrator::default();
    run(&orchestrator, "boundary", true).await;

    tokio::time::advance(HOUR).await;

    assert_eq!(orchestrator.cleanup_completed_sagas(HOUR), 0);
    assert!(orchestrator.get_saga_status("boundary").is_some());

    tokio::time::advance(Duration::from_millis(1)).await;

    assert_eq!(orchestrator.cleanup_completed_sagas(HOUR), 1);
}

#[tokio::test(start_paused = true)]
async fn cleanup_in_hours_converts_units() -> anyhow::Result<()> {
    let orchestrator = SagaOrchestrator::default();
    run(&orchestrator, "half-hour", false).await;

    tokio::time::advance(Duration::from_secs(45 * 60)).await;

    assert_eq!(orchestrator.cleanup_completed_sagas_hours(1.0)?, 0);
    assert_eq!(orchestrator.cleanup_completed_sagas_hours(0.5)?, 1);
    assert!(orchestrator.get_all_sagas().is_empty());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn cleanup_with_huge_age_evicts_nothing() -> anyhow::Result<()> {
    let orchestrator = SagaOrchestrator::default();
    run(&orchestrator, "kept", true).await;

    tokio::time::advance(24 * HOUR).await;

    assert_eq!(orchestrator.cleanup_completed_sagas_hours(1e20)?, 0);
    assert!(orchestrator.get_saga_status("kept").is_some());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn background_reaper_uses_configured_retention() {
    let config = OrchestratorConfig::default()
        .with_retention(HOUR)
        .with_reaper_interval(Duration::from_secs(600));
    let orchestrator = SagaOrchestrator::new(config);
    run(&orchestrator, "done", true).await;

    let reaper = spawn_reaper(
        orchestrator.clone(),
        orchestrator.config().reaper_interval(),
        orchestrator.config().retention(),
    )
    .expect("configured interval is non-zero");

    tokio::time::sleep(Duration::from_secs(30 * 60)).await;
    assert!(orchestrator.get_saga_status("done").is_some());

    tokio::time::sleep(Duration::from_secs(45 * 60)).await;
    assert!(orchestrator.get_saga_status("done").is_none());

    reaper.shutdown();
}

#[tokio::test(start_paused = true)]
async fn background_reaper_rejects_zero_interval() {
    let config = OrchestratorConfig::default().with_reaper_interval(Duration::ZERO);
    let orchestrator = SagaOrchestrator::new(config);
    run(&orchestrator, "done", true).await;

    let result = spawn_reaper(
        orchestrator.clone(),
        orchestrator.config().reaper_interval(),
        Duration::ZERO,
    );

    assert!(matches!(
        result,
        Err(callflow_saga::ConfigError::InvalidInterval)
    ));
    assert!(orchestrator.get_saga_status("done").is_some());
}
