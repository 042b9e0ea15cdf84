//! Scheduler timing configuration and the named profiles used by each
//! editing surface.

use classdraft_common::DocumentKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("debounce must be greater than zero")]
    ZeroDebounce,

    #[error("min interval ({min_interval_ms} ms) must be at least the debounce ({debounce_ms} ms)")]
    MinIntervalBelowDebounce { debounce_ms: u64, min_interval_ms: u64 },

    #[error("unknown save profile: {0}")]
    UnknownProfile(String),
}

/// Debounce and throttle timings for one save scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerConfig {
    /// Quiet period before an edit is considered settled
    pub debounce_ms: u64,

    /// Minimum spacing between two save calls for the same document
    pub min_interval_ms: u64,
}

impl SchedulerConfig {
    /// Create a validated config
    pub fn new(debounce_ms: u64, min_interval_ms: u64) -> Result<Self, ConfigError> {
        let config = Self {
            debounce_ms,
            min_interval_ms,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.debounce_ms == 0 {
            return Err(ConfigError::ZeroDebounce);
        }
        if self.min_interval_ms < self.debounce_ms {
            return Err(ConfigError::MinIntervalBelowDebounce {
                debounce_ms: self.debounce_ms,
                min_interval_ms: self.min_interval_ms,
            });
        }
        Ok(())
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        SaveProfile::Response.config()
    }
}

/// Named scheduler configuration for one editing surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveProfile {
    /// Student assignment response editor
    Response,
    /// Teacher assignment instructions editor
    Instructions,
}

impl SaveProfile {
    pub fn config(self) -> SchedulerConfig {
        match self {
            SaveProfile::Response => SchedulerConfig {
                debounce_ms: 3_000,
                min_interval_ms: 10_000,
            },
            SaveProfile::Instructions => SchedulerConfig {
                debounce_ms: 5_000,
                min_interval_ms: 15_000,
            },
        }
    }

    pub fn for_kind(kind: DocumentKind) -> Self {
        match kind {
            DocumentKind::AssignmentResponse => SaveProfile::Response,
            DocumentKind::AssignmentInstructions => SaveProfile::Instructions,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SaveProfile::Response => "response",
            SaveProfile::Instructions => "instructions",
        }
    }

    pub fn all() -> [SaveProfile; 2] {
        [SaveProfile::Response, SaveProfile::Instructions]
    }
}

impl fmt::Display for SaveProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for SaveProfile {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "response" => Ok(SaveProfile::Response),
            "instructions" => Ok(SaveProfile::Instructions),
            other => Err(ConfigError::UnknownProfile(other.to_string())),
        }
    }
}
