use std::path::PathBuf;

use thiserror::Error;

/// Error from loading or validating orchestrator configuration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration file '{}'", path.display())]
    Io {
        /// Path that was being read.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration is not valid TOML or has unexpected fields.
    #[error("failed to parse orchestrator configuration")]
    Parse(#[from] toml::de::Error),

    /// Retention must be a finite, non-negative number of hours.
    #[error("retention must be a finite, non-negative number of hours, got {0}")]
    InvalidRetention(f64),

    /// The reaper interval must be at least one second.
    #[error("reaper interval must be greater than zero")]
    InvalidInterval,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_mentions_path_and_keeps_source() {
        let err = ConfigError::Io {
            path: PathBuf::from("/etc/callflow/saga.toml"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        };

        assert!(err.to_string().contains("/etc/callflow/saga.toml"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn invalid_retention_includes_value() {
        let err = ConfigError::InvalidRetention(-2.5);

        assert!(err.to_string().contains("-2.5"));
    }
}
