//! In-memory saga orchestrator for multi-step call analysis pipelines.
//!
//! A saga is an ordered list of steps sharing one key/value context. Each
//! step's forward action returns a partial context that is merged into the
//! running context before the next step starts. When a forward action fails,
//! the orchestrator unwinds the saga by invoking compensations in reverse
//! order, then hands the original error back to the caller.
//!
//! All sagas live in a [`SagaRegistry`] that can be queried while executions
//! are in flight and reaped once they reach a terminal status.

mod audit;
mod config;
mod context;
mod definition;
mod error;
mod orchestrator;
mod reaper;
mod record;
mod registry;
mod status;
mod step;

pub use audit::{SagaAuditLog, StepRecord, StepStatus};
pub use config::{CompensationScope, OrchestratorConfig};
pub use context::SagaContext;
pub use definition::{SagaBuilder, SagaDefinition};
pub use error::ConfigError;
pub use orchestrator::SagaOrchestrator;
pub use reaper::{ReaperHandle, spawn_reaper};
pub use record::{CompensationFailure, SagaSnapshot};
pub use registry::SagaRegistry;
pub use status::SagaStatus;
pub use step::{FnStep, SagaStep, StepHandle};
