use std::path::PathBuf;

use thiserror::Error;

use crate::steps::StepFailure;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("configuration error")]
    Config(#[from] callflow_saga::ConfigError),

    #[error("failed to read plan '{}'", path.display())]
    ReadPlan {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse plan '{}'", path.display())]
    ParsePlan {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid plan: {0}")]
    InvalidPlan(String),

    #[error("failed to render output")]
    Render(#[from] serde_json::Error),

    #[error("saga '{id}' failed")]
    SagaFailed {
        id: String,
        #[source]
        source: StepFailure,
    },

    #[error("internal error: saga '{0}' missing from registry after execution")]
    MissingSaga(String),
}

pub type Result<T> = std::result::Result<T, CliError>;
