use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

const SECONDS_PER_HOUR: f64 = 3600.0;

/// Which steps are offered compensation when a forward action fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CompensationScope {
    /// Compensate the failing step itself, then every earlier step.
    ///
    /// Lets a step clean up partial side effects it made before failing.
    #[default]
    IncludeFailedStep,
    /// Compensate only steps whose forward action completed.
    CompletedOnly,
}

impl CompensationScope {
    /// Highest step index to compensate after a failure at `failed_index`.
    #[must_use]
    pub fn upper_bound(self, failed_index: usize) -> Option<usize> {
        match self {
            Self::IncludeFailedStep => Some(failed_index),
            Self::CompletedOnly => failed_index.checked_sub(1),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    compensation_scope: CompensationScope,
    #[serde(default = "default_retention_hours")]
    retention_hours: f64,
    #[serde(default = "default_reaper_interval_secs")]
    reaper_interval_secs: u64,
}

fn default_retention_hours() -> f64 {
    24.0
}

fn default_reaper_interval_secs() -> u64 {
    300
}

fn default_retention() -> Duration {
    Duration::from_secs_f64(default_retention_hours() * SECONDS_PER_HOUR)
}

/// Orchestrator settings.
///
/// ```toml
/// compensation_scope = "completed-only"
/// retention_hours = 6
/// reaper_interval_secs = 60
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorConfig {
    compensation_scope: CompensationScope,
    retention: Duration,
    reaper_interval: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            compensation_scope: CompensationScope::default(),
            retention: default_retention(),
            reaper_interval: Duration::from_secs(default_reaper_interval_secs()),
        }
    }
}

impl OrchestratorConfig {
    /// Parse configuration from TOML text. Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` for malformed TOML or unknown keys, and
    /// a validation error for a negative retention or a zero reaper interval.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(content)?;
        if raw.reaper_interval_secs == 0 {
            return Err(ConfigError::InvalidInterval);
        }
        Ok(Self {
            compensation_scope: raw.compensation_scope,
            retention: hours_to_duration(raw.retention_hours)?,
            reaper_interval: Duration::from_secs(raw.reaper_interval_secs),
        })
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Io` if the file cannot be read, otherwise see
    /// [`OrchestratorConfig::from_toml_str`].
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    #[must_use]
    pub fn compensation_scope(&self) -> CompensationScope {
        self.compensation_scope
    }

    /// How long terminal sagas are kept before the reaper may evict them.
    #[must_use]
    pub fn retention(&self) -> Duration {
        self.retention
    }

    #[must_use]
    pub fn reaper_interval(&self) -> Duration {
        self.reaper_interval
    }

    #[must_use]
    pub fn with_compensation_scope(mut self, scope: CompensationScope) -> Self {
        self.compensation_scope = scope;
        self
    }

    #[must_use]
    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    /// A zero interval is accepted here but rejected by
    /// [`spawn_reaper`](crate::spawn_reaper).
    #[must_use]
    pub fn with_reaper_interval(mut self, interval: Duration) -> Self {
        self.reaper_interval = interval;
        self
    }
}

/// Convert a number of hours into a `Duration`.
///
/// # Errors
///
/// Returns `ConfigError::InvalidRetention` for negative, NaN or infinite input.
/// Ages too large for a `Duration` saturate to `Duration::MAX`.
pub(crate) fn hours_to_duration(hours: f64) -> Result<Duration, ConfigError> {
    if !hours.is_finite() || hours < 0.0 {
        return Err(ConfigError::InvalidRetention(hours));
    }
    Ok(Duration::try_from_secs_f64(hours * SECONDS_PER_HOUR).unwrap_or(Duration::MAX))
}
