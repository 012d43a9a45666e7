use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle status of a saga.
///
/// ```text
/// Pending -> Running -> Completed
///               |
///               +-> Compensating -> Failed
/// ```
///
/// A saga without steps goes straight from `Pending` to `Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SagaStatus {
    /// Created, no step has started yet.
    Pending,
    /// Forward actions are executing.
    Running,
    /// A forward action failed and compensations are executing.
    Compensating,
    /// Every forward action succeeded.
    Completed,
    /// A forward action failed and compensation has finished.
    Failed,
}

impl SagaStatus {
    /// Whether the saga will never execute again.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Running | Self::Completed)
                | (Self::Running, Self::Completed | Self::Compensating)
                | (Self::Compensating, Self::Failed)
        )
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Compensating => "compensating",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for SagaStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
