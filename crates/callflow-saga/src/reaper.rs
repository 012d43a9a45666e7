use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{Instrument, debug, info_span};

use crate::error::ConfigError;
use crate::orchestrator::SagaOrchestrator;

/// Handle to a background reaper task. Dropping it stops the task.
#[derive(Debug)]
pub struct ReaperHandle {
    task: JoinHandle<()>,
}

impl ReaperHandle {
    /// Stop the reaper.
    pub fn shutdown(self) {
        drop(self);
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for ReaperHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Periodically evict finished sagas older than `max_age`.
///
/// The first sweep happens one full `period` after spawning. Must be called
/// from within a tokio runtime.
///
/// # Errors
///
/// Returns `ConfigError::InvalidInterval` if `period` is zero.
pub fn spawn_reaper(
    orchestrator: SagaOrchestrator,
    period: Duration,
    max_age: Duration,
) -> Result<ReaperHandle, ConfigError> {
    if period.is_zero() {
        return Err(ConfigError::InvalidInterval);
    }
    let task = tokio::spawn(
        async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let evicted = orchestrator.cleanup_completed_sagas(max_age);
                debug!(evicted, remaining = orchestrator.registry().len(), "reaper sweep");
            }
        }
        .instrument(info_span!("saga_reaper")),
    );
    Ok(ReaperHandle { task })
}
