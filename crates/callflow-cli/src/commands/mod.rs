mod run;
mod validate;

use std::path::PathBuf;

use callflow_saga::OrchestratorConfig;
use clap::Subcommand;

use crate::error::Result;
use crate::output::OutputFormat;

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Execute a saga plan and report the outcome
    Run {
        /// Path to the plan file
        plan: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Plain)]
        format: OutputFormat,
    },
    /// Check a saga plan without running it
    Validate {
        /// Path to the plan file
        plan: PathBuf,
    },
}

impl Commands {
    pub(crate) async fn execute(self, config: OrchestratorConfig) -> Result<()> {
        match self {
            Self::Run { plan, format } => run::run(&plan, format, config).await,
            Self::Validate { plan } => validate::run(&plan),
        }
    }
}
